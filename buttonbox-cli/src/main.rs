mod device;
mod layout;
mod monitor;

use anyhow::{Context, Result};
use buttonbox_core::layout as panel;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "buttonbox-cli")]
#[command(about = "Button Box joystick tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a button box (or a Teensy bootloader) is connected
    Detect,
    /// Show the buttons the host sees, live
    Monitor,
    /// Reboot the button box into the Teensy bootloader for reflashing
    Bootloader,
    /// Write an HTML/SVG panel map with each control's button number
    Layout {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Detect => {
            if let Some(device) = device::button_box()? {
                println!(
                    "{} detected on bus {} address {}.",
                    panel::PRODUCT,
                    device.bus_number(),
                    device.address()
                );
            } else if device::bootloader_present()? {
                println!("Teensy bootloader detected (HalfKay mode).");
            } else {
                println!("{} not detected.", panel::PRODUCT);
            }
        }
        Command::Monitor => {
            let mut handle = device::open()?;
            device::claim(&mut handle)?;
            println!(
                "Monitoring {} ({} buttons). Press Ctrl-C to stop.",
                panel::PRODUCT,
                panel::DECLARATION.button_count()
            );
            monitor::run(&handle)?;
        }
        Command::Bootloader => {
            let handle = device::open()?;
            device::reboot_to_bootloader(&handle)?;
            println!("Rebooting {} into bootloader...", panel::PRODUCT);
            if device::wait_for_bootloader(Duration::from_secs(5))? {
                println!("Teensy bootloader detected (HalfKay mode).");
            } else {
                eprintln!("Teensy bootloader not detected after reboot.");
                eprintln!("Press the reset button on the Teensy and try again.");
                std::process::exit(1);
            }
        }
        Command::Layout { output } => {
            let html = layout::generate_html(panel::PRODUCT, &panel::DECLARATION);
            match output {
                Some(path) => {
                    fs::write(&path, html)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", html),
            }
        }
    }

    Ok(())
}
