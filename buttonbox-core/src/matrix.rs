//! Button matrix scanning.
//!
//! Rows are outputs idling high; columns are inputs with pull-ups. Driving a
//! row low pulls every column with a closed switch on that row low. Rows are
//! scanned in order, columns in order within a row, so the resulting grid
//! always has the same row-major layout.
//!
//! Without isolation diodes, three closed switches in a rectangle make the
//! fourth corner read as closed too. That is a wiring concern; the scanner
//! reports what it reads.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::debounce::Debouncer;
use crate::error::Error;
use crate::{Duration, Instant};

/// Debounced matrix state: `true` = switch closed.
pub type Grid<const ROWS: usize, const COLS: usize> = [[bool; COLS]; ROWS];

pub struct Matrix<R, C, const ROWS: usize, const COLS: usize> {
    rows: [R; ROWS],
    cols: [C; COLS],
    debouncers: [[Debouncer; COLS]; ROWS],
    row_settle_us: u32,
}

impl<R, C, E, const ROWS: usize, const COLS: usize> Matrix<R, C, ROWS, COLS>
where
    R: OutputPin<Error = E>,
    C: InputPin<Error = E>,
{
    /// Take the row and column pins and drive every row inactive.
    ///
    /// Columns must already be configured as pulled-up inputs.
    pub fn new(
        mut rows: [R; ROWS],
        cols: [C; COLS],
        debounce: Duration,
        row_settle_us: u32,
    ) -> Result<Self, Error<E>> {
        for (row, pin) in rows.iter_mut().enumerate() {
            pin.set_high()
                .map_err(|source| Error::RowDrive { row, source })?;
        }

        Ok(Self {
            rows,
            cols,
            debouncers: [[Debouncer::new(debounce); COLS]; ROWS],
            row_settle_us,
        })
    }

    /// Scan every intersection once and return the debounced grid.
    pub fn scan(
        &mut self,
        now: Instant,
        delay: &mut impl DelayNs,
    ) -> Result<Grid<ROWS, COLS>, Error<E>> {
        let mut grid = [[false; COLS]; ROWS];
        let rows = self.rows.iter_mut().zip(&mut self.debouncers);

        for (row, (pin, debouncers)) in rows.enumerate() {
            pin.set_low()
                .map_err(|source| Error::RowDrive { row, source })?;
            delay.delay_us(self.row_settle_us);

            let cols = self.cols.iter_mut().zip(debouncers.iter_mut());
            for (col, (input, debouncer)) in cols.enumerate() {
                let closed = input
                    .is_low()
                    .map_err(|source| Error::ColumnRead { row, col, source })?;
                grid[row][col] = debouncer.sample(closed, now);
            }

            pin.set_high()
                .map_err(|source| Error::RowDrive { row, source })?;
        }

        Ok(grid)
    }
}
