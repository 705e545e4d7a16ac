//! Generate an HTML/SVG picture of the panel with the joystick button
//! number of every control, for binding buttons in games.

use buttonbox_core::{ButtonRole, Declaration, Direction};

enum Shape {
    /// Square button; `x`/`y` is the top-left corner.
    Key,
    /// Rotary encoder; `x`/`y` is the centre.
    Knob,
}

struct Control {
    x: f64,
    y: f64,
    shape: Shape,
    label: String,
    numbers: String,
    class: &'static str,
}

/// Button size in SVG pixels.
const U: f64 = 54.0;
const GAP: f64 = 6.0;
const S: f64 = U + GAP;
const R: f64 = 4.0;
const KNOB_R: f64 = 30.0;
const KNOB_STEP: f64 = 2.0 * KNOB_R + 3.0 * GAP;
/// Height of the encoder row above the matrix.
const KNOB_BAND: f64 = 2.0 * KNOB_R + 4.0 * GAP;
/// Space between the matrix and the dedicated buttons.
const SIDE_GAP: f64 = 30.0;
const MARGIN: f64 = 20.0;

/// Lay out every declared control: encoders along the top, the matrix
/// below them, dedicated buttons to the right of the matrix.
fn build_controls(declaration: &Declaration) -> Vec<Control> {
    let mut controls = Vec::new();

    for (index, role) in declaration.roles().enumerate() {
        let number = index + 1;
        match role {
            ButtonRole::Matrix { row, col } => controls.push(Control {
                x: col as f64 * S,
                y: KNOB_BAND + row as f64 * S,
                shape: Shape::Key,
                label: format!("r{row}c{col}"),
                numbers: number.to_string(),
                class: "key",
            }),
            ButtonRole::Dedicated(name) => {
                let slot = index - declaration.dedicated_offset();
                controls.push(Control {
                    x: declaration.cols as f64 * S + SIDE_GAP,
                    y: KNOB_BAND + slot as f64 * S,
                    shape: Shape::Key,
                    label: name.to_string(),
                    numbers: number.to_string(),
                    class: "key dedicated",
                });
            }
            // One knob per encoder, labelled with both of its buttons.
            ButtonRole::Encoder {
                encoder,
                direction: Direction::CounterClockwise,
            } => controls.push(Control {
                x: KNOB_R + encoder as f64 * KNOB_STEP,
                y: KNOB_R,
                shape: Shape::Knob,
                label: format!("enc {}", encoder + 1),
                numbers: format!("{} / {}", number, number + 1),
                class: "knob",
            }),
            ButtonRole::Encoder {
                direction: Direction::Clockwise,
                ..
            } => {}
        }
    }

    controls
}

/// Bottom-right corner of the drawing.
fn bbox(controls: &[Control]) -> (f64, f64) {
    controls.iter().fold((0.0f64, 0.0f64), |(w, h), c| {
        let (right, bottom) = match c.shape {
            Shape::Key => (c.x + U, c.y + U),
            Shape::Knob => (c.x + KNOB_R, c.y + KNOB_R),
        };
        (w.max(right), h.max(bottom))
    })
}

fn render_control(control: &Control) -> String {
    let (shape, cx, cy) = match control.shape {
        Shape::Key => (
            format!(
                r#"<rect x="{}" y="{}" width="{U}" height="{U}" rx="{R}" class="{}"/>"#,
                control.x, control.y, control.class
            ),
            control.x + U / 2.0,
            control.y + U / 2.0,
        ),
        Shape::Knob => (
            format!(
                r#"<circle cx="{}" cy="{}" r="{KNOB_R}" class="{}"/>"#,
                control.x, control.y, control.class
            ),
            control.x,
            control.y,
        ),
    };

    format!(
        r#"{shape}<text x="{cx}" y="{}" class="number">{}</text><text x="{cx}" y="{}" class="label">{}</text>"#,
        cy - 6.0,
        html_escape(&control.numbers),
        cy + 12.0,
        html_escape(&control.label),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Generate the complete HTML document with inline SVG.
pub fn generate_html(title: &str, declaration: &Declaration) -> String {
    let controls = build_controls(declaration);
    let (content_w, content_h) = bbox(&controls);
    let total_width = content_w + 2.0 * MARGIN;
    let total_height = content_h + 2.0 * MARGIN;

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body {{
    background: #1a1a2e;
    color: #eee;
    font-family: system-ui, -apple-system, sans-serif;
    display: flex;
    justify-content: center;
    padding: 2em;
  }}
  .key {{
    fill: #16213e;
    stroke: #0f3460;
    stroke-width: 1.5;
  }}
  .key.dedicated {{
    fill: #4e1b2d;
    stroke: #e94560;
    stroke-width: 2;
  }}
  .knob {{
    fill: #1b2e4e;
    stroke: #53a8b6;
    stroke-width: 2;
  }}
  .number {{
    fill: #eee;
    font-family: "JetBrains Mono", "Fira Code", monospace;
    font-size: 14px;
    font-weight: bold;
    text-anchor: middle;
    dominant-baseline: middle;
  }}
  .label {{
    fill: #8a8fa8;
    font-size: 10px;
    text-anchor: middle;
    dominant-baseline: middle;
  }}
</style>
</head>
<body>
<svg width="{total_width}" height="{total_height}" xmlns="http://www.w3.org/2000/svg">
<g transform="translate({MARGIN}, {MARGIN})">
"#,
        title = html_escape(title),
    );

    for control in &controls {
        html.push_str(&render_control(control));
        html.push('\n');
    }

    html.push_str("</g>\n</svg>\n</body>\n</html>\n");
    html
}
