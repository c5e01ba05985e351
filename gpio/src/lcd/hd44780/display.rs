//! Text-oriented session on top of an [HD44780Driver].
//!
//! # Cursor cache
//!
//! [Display] remembers where it last put the cursor, but only [Display::set_cursor] (directly, or
//! through the clearing helpers and [Display::backspace]) updates that position. The controller
//! advances its own address after every character and moves it on the shift instructions, and
//! none of that is mirrored here. After [Display::write_char] or [Display::shift_cursor_right] the
//! cached [Display::cursor] and the real cursor on the panel can differ. Callers relying on the
//! cached position should move the cursor explicitly first.
use crate::lcd::hd44780::driver::{BusWidth, CursorDirection, HD44780Driver};
use crate::lcd::hd44780::geometry::Geometry;
use crate::lcd::hd44780::{LcdError, LcdResult};
use crate::GpioError;
use log::{debug, warn};

/// Settings applied by [Display::configure].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DisplaySettings {
    pub two_lines: bool,
    pub large_font: bool,
    pub display_on: bool,
    pub cursor_visible: bool,
    pub cursor_blink: bool,
    pub direction: CursorDirection,
    pub display_shift: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            two_lines: true,
            large_font: false,
            display_on: true,
            cursor_visible: false,
            cursor_blink: false,
            direction: CursorDirection::Right,
            display_shift: false,
        }
    }
}

#[derive(Debug)]
pub struct Display<T: HD44780Driver> {
    driver: T,
    geometry: Geometry,
    row: u8,
    column: u8,
}

impl<T: HD44780Driver> Display<T> {
    /// Brings the controller into a known state and clears the screen.
    ///
    /// Runs the reset handshake, switches to the 4-line bus if the driver uses one, then clears the
    /// screen. Nothing else is sent before the clear.
    pub fn init(mut driver: T, geometry: Geometry) -> LcdResult<Self> {
        debug!("Initializing {:?} display on {:?}", geometry, driver);

        driver.reset()?;
        if driver.bus_width() == BusWidth::Four {
            driver.enable_four_bit_mode()?;
        }

        let mut display = Display {
            driver,
            geometry,
            row: 0,
            column: 0,
        };
        display.clear_screen()?;
        Ok(display)
    }

    /// Applies line count, font, display control and entry mode. Optional, meant to follow
    /// [Display::init] directly.
    pub fn configure(&mut self, settings: &DisplaySettings) -> LcdResult<()> {
        debug!("Configuring display: {:?}", settings);
        self.driver.function_set(settings.two_lines, settings.large_font)?;
        self.driver.set_display_control(
            settings.display_on,
            settings.cursor_visible,
            settings.cursor_blink,
        )?;
        self.driver.set_entry_mode(settings.direction, settings.display_shift)
    }

    /// Gets the cached cursor position as `(row, column)`.
    pub fn cursor(&self) -> (u8, u8) {
        (self.row, self.column)
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn bus_width(&self) -> BusWidth {
        self.driver.bus_width()
    }

    pub fn driver(&self) -> &T {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut T {
        &mut self.driver
    }

    pub fn into_driver(self) -> T {
        self.driver
    }

    /// Moves the cursor to `(row, column)` and caches the position.
    ///
    /// # Errors
    /// - `LcdError::InvalidCoordinate` if the position is outside of the panel. Nothing is sent then.
    pub fn set_cursor(&mut self, row: u8, column: u8) -> LcdResult<()> {
        let address = self.geometry.ddram_address(row, column)?;
        self.row = row;
        self.column = column;
        self.driver.set_ddram_address(address)
    }

    /// Writes a character code at the controller's current address.
    pub fn write_char(&mut self, c: u8) -> LcdResult<()> {
        self.driver.send_data(c)
    }

    /// Writes character codes in order.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> LcdResult<()> {
        for &c in bytes {
            self.write_char(c)?;
        }
        Ok(())
    }

    /// Writes a string. Characters outside of ASCII are written as `?`.
    pub fn write_str(&mut self, s: &str) -> LcdResult<()> {
        for c in s.chars() {
            if c.is_ascii() {
                self.write_char(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.write_char(b'?')?;
            }
        }
        Ok(())
    }

    /// Clears the whole screen. The controller also returns its address to 0, the cached cursor is
    /// left alone.
    pub fn clear_screen(&mut self) -> LcdResult<()> {
        self.driver.clear_display()
    }

    /// Blanks a single character and leaves the cursor on it.
    pub fn clear_char(&mut self, row: u8, column: u8) -> LcdResult<()> {
        self.set_cursor(row, column)?;
        self.write_char(b' ')?;
        self.set_cursor(row, column)
    }

    /// Blanks a row and leaves the cursor at its start.
    ///
    /// Writes one space less than the row is wide, so the last column keeps its character.
    pub fn clear_row(&mut self, row: u8) -> LcdResult<()> {
        self.set_cursor(row, 0)?;
        for _ in 1..self.geometry.columns() {
            self.write_char(b' ')?;
        }
        self.set_cursor(row, 0)
    }

    /// Blanks columns `begin..=end` of a row and leaves the cursor at `begin`.
    ///
    /// # Errors
    /// - `LcdError::InvalidCoordinate` naming `begin` if `begin > end`, or naming `end` if it is
    ///   outside of the panel.
    pub fn clear_section(&mut self, row: u8, begin: u8, end: u8) -> LcdResult<()> {
        if begin > end {
            return Err(LcdError::InvalidCoordinate { row, column: begin });
        }
        if !self.geometry.contains(row, end) {
            return Err(LcdError::InvalidCoordinate { row, column: end });
        }
        self.set_cursor(row, begin)?;
        for _ in begin..=end {
            self.write_char(b' ')?;
        }
        self.set_cursor(row, begin)
    }

    /// Moves the cached cursor one column left, blanking as it goes. Does nothing at column 0, it
    /// never wraps to the previous row.
    ///
    /// The space goes to wherever the controller's address points when this is called, and the
    /// cursor is then set to the new column.
    pub fn backspace(&mut self) -> LcdResult<()> {
        if self.column == 0 {
            return Ok(());
        }
        self.column -= 1;
        self.write_char(b' ')?;
        self.set_cursor(self.row, self.column)
    }

    /// Moves the cursor on the panel one position right. The cached cursor doesn't follow.
    pub fn shift_cursor_right(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(false, CursorDirection::Right)
    }

    /// Moves the cursor on the panel one position left. The cached cursor doesn't follow.
    pub fn shift_cursor_left(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(false, CursorDirection::Left)
    }

    /// Scrolls the whole display one position right.
    pub fn shift_display_right(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(true, CursorDirection::Right)
    }

    /// Scrolls the whole display one position left.
    pub fn shift_display_left(&mut self) -> LcdResult<()> {
        self.driver.cursor_shift(true, CursorDirection::Left)
    }

    /// Shows a blinking cursor.
    pub fn enable_cursor(&mut self) -> LcdResult<()> {
        self.driver.set_display_control(true, true, true)
    }

    /// Hides the cursor, the display stays on.
    pub fn disable_cursor(&mut self) -> LcdResult<()> {
        self.driver.set_display_control(true, false, false)
    }

    /// Returns the cursor on the panel to the top left and undoes display shifts. The cached cursor
    /// is left alone, same as with [Display::clear_screen].
    pub fn return_home(&mut self) -> LcdResult<()> {
        self.driver.return_home()
    }

    /// Stores a custom 5x8 glyph in one of the 8 CGRAM slots. Writing the slot number as a
    /// character code shows it.
    ///
    /// CGRAM writes move the controller's address away from the screen, so the cursor is set back to
    /// the cached position afterwards.
    pub fn define_glyph(&mut self, slot: u8, rows: [u8; 8]) -> LcdResult<()> {
        if slot >= 8 {
            return Err(GpioError::InvalidArgument.into());
        }
        self.driver.set_cgram_address(slot * 8)?;
        for row in rows {
            self.write_char(row & 0b11111)?;
        }
        self.set_cursor(self.row, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::hd44780::driver::RegisterSelect::{Data, Instruction};
    use crate::lcd::hd44780::testing::{Recorded, RecordingDriver};

    fn display(width: BusWidth) -> Display<RecordingDriver> {
        let mut display = Display::init(RecordingDriver::new(width), Geometry::LCD1602).unwrap();
        display.driver_mut().log.clear();
        display
    }

    fn spaces(count: usize) -> Vec<(crate::lcd::hd44780::driver::RegisterSelect, u8)> {
        vec![(Data, b' '); count]
    }

    #[test]
    fn init_order_four_bit() {
        let display = Display::init(RecordingDriver::new(BusWidth::Four), Geometry::LCD1602).unwrap();
        assert_eq!(
            display.driver().log,
            vec![Recorded::Reset, Recorded::FourBitMode, Recorded::Command(Instruction, 0x01)]
        );
        assert_eq!(display.cursor(), (0, 0));
    }

    #[test]
    fn init_order_eight_bit() {
        let display = Display::init(RecordingDriver::new(BusWidth::Eight), Geometry::LCD1602).unwrap();
        assert_eq!(
            display.driver().log,
            vec![Recorded::Reset, Recorded::Command(Instruction, 0x01)]
        );
    }

    #[test]
    fn set_cursor_caches_every_position() {
        let mut display = display(BusWidth::Four);
        for row in 0..2u8 {
            for column in 0..16u8 {
                display.set_cursor(row, column).unwrap();
                assert_eq!(display.cursor(), (row, column));
                let expected = if row == 0 { 0x80 | column } else { 0x80 | (0x40 + column) };
                assert_eq!(display.driver().instructions().last(), Some(&expected));
            }
        }
    }

    #[test]
    fn set_cursor_out_of_range_sends_nothing() {
        let mut display = display(BusWidth::Four);
        display.set_cursor(1, 3).unwrap();
        display.driver_mut().log.clear();

        assert_eq!(
            display.set_cursor(2, 0),
            Err(LcdError::InvalidCoordinate { row: 2, column: 0 })
        );
        assert_eq!(
            display.set_cursor(0, 16),
            Err(LcdError::InvalidCoordinate { row: 0, column: 16 })
        );
        assert!(display.driver().log.is_empty());
        assert_eq!(display.cursor(), (1, 3));
    }

    #[test]
    fn writing_does_not_move_cached_cursor() {
        let mut display = display(BusWidth::Four);
        display.set_cursor(0, 2).unwrap();
        display.write_bytes(b"abc").unwrap();
        display.shift_cursor_right().unwrap();
        assert_eq!(display.cursor(), (0, 2));
    }

    #[test]
    fn write_string_in_order() {
        let mut display = display(BusWidth::Four);
        display.write_str("Hi!").unwrap();
        display.write_str("").unwrap();
        assert_eq!(display.driver().commands(), vec![(Data, b'H'), (Data, b'i'), (Data, b'!')]);
    }

    #[test]
    fn non_ascii_becomes_question_mark() {
        let mut display = display(BusWidth::Four);
        display.write_str("°C").unwrap();
        assert_eq!(display.driver().commands(), vec![(Data, b'?'), (Data, b'C')]);
    }

    #[test]
    fn clear_char_blanks_and_stays() {
        let mut display = display(BusWidth::Four);
        display.clear_char(1, 5).unwrap();
        assert_eq!(
            display.driver().commands(),
            vec![(Instruction, 0xC5), (Data, b' '), (Instruction, 0xC5)]
        );
        assert_eq!(display.cursor(), (1, 5));
    }

    #[test]
    fn clear_row_is_repeatable() {
        let mut display = display(BusWidth::Four);
        display.set_cursor(1, 9).unwrap();
        display.driver_mut().log.clear();

        for _ in 0..2 {
            display.clear_row(1).unwrap();
            let mut expected = vec![(Instruction, 0xC0)];
            expected.extend(spaces(15));
            expected.push((Instruction, 0xC0));
            assert_eq!(display.driver().commands(), expected);
            assert_eq!(display.cursor(), (1, 0));
            display.driver_mut().log.clear();
        }
    }

    #[test]
    fn clear_section_is_inclusive() {
        let mut display = display(BusWidth::Four);
        display.clear_section(0, 3, 7).unwrap();

        let mut expected = vec![(Instruction, 0x83)];
        expected.extend(spaces(5));
        expected.push((Instruction, 0x83));
        assert_eq!(display.driver().commands(), expected);
        assert_eq!(display.cursor(), (0, 3));
    }

    #[test]
    fn clear_section_single_column() {
        let mut display = display(BusWidth::Eight);
        display.clear_section(1, 15, 15).unwrap();
        assert_eq!(display.driver().commands().len(), 3);
        assert_eq!(display.cursor(), (1, 15));
    }

    #[test]
    fn clear_section_rejects_bad_ranges() {
        let mut display = display(BusWidth::Four);
        assert_eq!(
            display.clear_section(0, 7, 3),
            Err(LcdError::InvalidCoordinate { row: 0, column: 7 })
        );
        assert_eq!(
            display.clear_section(0, 9, 2),
            Err(LcdError::InvalidCoordinate { row: 0, column: 9 })
        );
        assert_eq!(
            display.clear_section(0, 3, 16),
            Err(LcdError::InvalidCoordinate { row: 0, column: 16 })
        );
        assert!(display.driver().log.is_empty());
    }

    #[test]
    fn backspace_at_column_zero_is_a_no_op() {
        let mut display = display(BusWidth::Four);
        display.set_cursor(1, 0).unwrap();
        display.driver_mut().log.clear();

        display.backspace().unwrap();
        assert!(display.driver().log.is_empty());
        assert_eq!(display.cursor(), (1, 0));
    }

    #[test]
    fn backspace_blanks_then_moves_left() {
        let mut display = display(BusWidth::Four);
        display.set_cursor(0, 5).unwrap();
        display.driver_mut().log.clear();

        display.backspace().unwrap();
        assert_eq!(display.cursor(), (0, 4));
        assert_eq!(display.driver().commands(), vec![(Data, b' '), (Instruction, 0x84)]);
    }

    #[test]
    fn cursor_visibility_and_shifts() {
        let mut display = display(BusWidth::Four);
        display.enable_cursor().unwrap();
        display.disable_cursor().unwrap();
        display.shift_cursor_right().unwrap();
        display.shift_cursor_left().unwrap();
        display.shift_display_right().unwrap();
        display.shift_display_left().unwrap();
        display.return_home().unwrap();
        assert_eq!(
            display.driver().instructions(),
            vec![0x0F, 0x0C, 0x14, 0x10, 0x1C, 0x18, 0x02]
        );
        assert_eq!(display.cursor(), (0, 0));
    }

    #[test]
    fn configure_sends_function_set_control_and_entry_mode() {
        let mut display = display(BusWidth::Four);
        display.configure(&DisplaySettings::default()).unwrap();
        assert_eq!(display.driver().instructions(), vec![0x28, 0x0C, 0x06]);
    }

    #[test]
    fn define_glyph_restores_cursor() {
        let mut display = display(BusWidth::Four);
        display.set_cursor(1, 2).unwrap();
        display.driver_mut().log.clear();

        display.define_glyph(1, [0xFF, 0, 0, 0, 0, 0, 0, 0x11]).unwrap();

        let commands = display.driver().commands();
        assert_eq!(commands.first(), Some(&(Instruction, 0x48)));
        assert_eq!(commands[1], (Data, 0x1F));
        assert_eq!(commands[8], (Data, 0x11));
        assert_eq!(commands.last(), Some(&(Instruction, 0xC2)));
        assert_eq!(commands.len(), 10);

        assert_eq!(
            display.define_glyph(8, [0; 8]),
            Err(LcdError::Gpio(GpioError::InvalidArgument))
        );
    }

    #[test]
    fn larger_panels_use_their_row_offsets() {
        let mut display = Display::init(RecordingDriver::new(BusWidth::Four), Geometry::LCD2004).unwrap();
        display.set_cursor(3, 0).unwrap();
        assert_eq!(display.driver().instructions().last(), Some(&0xD4));

        display.driver_mut().log.clear();
        display.clear_row(2).unwrap();
        assert_eq!(display.driver().commands().len(), 21);
    }
}
