//! The module for the application modes and their display logic.

use std::io::BufRead;
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use log::{debug, info, warn};
use thiserror::Error;
use time::OffsetDateTime;
use lcdbang_gpio::lcd::hd44780::display::Display;
use lcdbang_gpio::lcd::hd44780::driver::HD44780Driver;
use lcdbang_gpio::lcd::hd44780::LcdResult;
use crate::config::Config;
use crate::utils::truncate_to;

/// What the app shows.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// Host name and version, then exit.
    #[default]
    Banner,
    /// Lines from stdin, one row each.
    Echo,
    /// Local date and time.
    Clock,
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown mode `{0}`, expected banner, echo or clock")]
pub struct UnknownModeError(String);

impl FromStr for Mode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "banner" => Ok(Mode::Banner),
            "echo" => Ok(Mode::Echo),
            "clock" => Ok(Mode::Clock),
            _ => Err(UnknownModeError(s.to_string())),
        }
    }
}

/// Line written by [App::echo] to perform a backspace instead.
pub const BACKSPACE_LINE: &str = "\\b";

/// The main app state struct.
pub struct App<'a, T: HD44780Driver> {
    /// The configuration for the app.
    config: &'a Config,
    /// The display session the app writes to.
    display: &'a mut Display<T>,
}

impl<'a, T: HD44780Driver> App<'a, T> {
    pub fn new(config: &'a Config, display: &'a mut Display<T>) -> Self {
        App { config, display }
    }

    /// Shows the host name on the first row and the version right-aligned on the last one.
    pub fn banner(&mut self, host_name: &str) -> LcdResult<()> {
        let geometry = self.display.geometry();
        let version = concat!("v", env!("CARGO_PKG_VERSION"));
        let version = truncate_to(version, geometry.columns());

        self.display.clear_screen()?;
        self.display.set_cursor(0, 0)?;
        self.display.write_str(truncate_to(host_name, geometry.columns()))?;

        let last_row = geometry.rows() - 1;
        self.display.set_cursor(last_row, geometry.columns() - version.len() as u8)?;
        self.display.write_str(version)?;

        info!("Banner shown for {}", host_name);
        Ok(())
    }

    /// Writes every input line to the next row, wrapping to the top after the last one.
    ///
    /// A line consisting of [BACKSPACE_LINE] erases the character before the cursor instead. After
    /// each line the cursor is left behind its last character, or on the last column if the line
    /// filled the row.
    ///
    /// Returns the amount of lines handled.
    pub fn echo<R: BufRead>(&mut self, input: R) -> eyre::Result<usize> {
        let geometry = self.display.geometry();
        let columns = geometry.columns();
        let mut row = 0;
        let mut handled = 0;

        for line in input.lines() {
            let line = line?;
            handled += 1;

            if line == BACKSPACE_LINE {
                debug!("Backspace at {:?}", self.display.cursor());
                self.display.backspace()?;
                continue;
            }

            let text = truncate_to(&line, columns);
            if text.len() < line.len() {
                warn!("Line truncated to {} columns: {}", columns, line);
            }

            self.display.clear_section(row, 0, columns - 1)?;
            self.display.write_str(text)?;
            let length = text.chars().count() as u8;
            self.display.set_cursor(row, length.min(columns - 1))?;

            row = (row + 1) % geometry.rows();
        }

        Ok(handled)
    }

    /// Shows the date and time, refreshing every `clock_interval_ms`.
    ///
    /// Runs forever unless `ticks` limits the amount of refreshes.
    pub fn clock(&mut self, ticks: Option<u64>) -> LcdResult<()> {
        let interval = Duration::from_millis(self.config.clock_interval_ms);
        let geometry = self.display.geometry();
        let mut refreshes = 0;

        self.display.clear_screen()?;
        loop {
            let now = OffsetDateTime::now_local().unwrap_or_else(|err| {
                warn!("Local offset unavailable ({}), using UTC", err);
                OffsetDateTime::now_utc()
            });
            let (date, time) = clock_lines(now);

            if geometry.rows() > 1 {
                self.write_row(0, &date)?;
                self.write_row(1, &time)?;
            } else {
                self.write_row(0, &time)?;
            }

            refreshes += 1;
            if ticks.is_some_and(|ticks| refreshes >= ticks) {
                return Ok(());
            }
            thread::sleep(interval);
        }
    }

    /// Overwrites a whole row, padding with spaces.
    fn write_row(&mut self, row: u8, text: &str) -> LcdResult<()> {
        let columns = self.display.geometry().columns() as usize;
        let text = truncate_to(text, columns as u8);
        self.display.set_cursor(row, 0)?;
        self.display.write_str(&format!("{:<columns$}", text))
    }
}

/// Formats `YYYY-MM-DD` and `hh:mm:ss`.
pub fn clock_lines(now: OffsetDateTime) -> (String, String) {
    let date = format!("{:04}-{:02}-{:02}", now.year(), u8::from(now.month()), now.day());
    let time = format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second());
    (date, time)
}
