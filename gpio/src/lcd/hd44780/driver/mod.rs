mod bus;
mod gpio;

use crate::lcd::hd44780::LcdResult;
use crate::GpioError;
pub use bus::*;
pub use gpio::*;
use std::fmt::Debug;

/// Value of the register-select (RS) line for a transaction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegisterSelect {
    /// RS = 0, the byte is an instruction.
    Instruction,
    /// RS = 1, the byte is character data.
    Data,
}

/// Value of the read/write (RW) line for a transaction.
///
/// Nothing is ever read back from the controller, so every operation of this crate uses
/// [ReadWrite::Write].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReadWrite {
    /// RW = 0.
    Write,
    /// RW = 1.
    Read,
}

/// Low-level protocol of an HD44780 controller: the mode lines, the power-on handshake, and the
/// instruction set on top of them.
///
/// Everything is write-only. The busy flag is never polled, the implementation waits a fixed settle
/// period after every transaction instead.
pub trait HD44780Driver: Debug {
    /// Gets the width of the data bus, fixed for the lifetime of the driver.
    fn bus_width(&self) -> BusWidth;

    /// Sets the RS and RW lines, then transmits the byte over the data bus.
    fn send_command(&mut self, rs: RegisterSelect, rw: ReadWrite, byte: u8) -> LcdResult<()>;

    /// Runs the power-on reset handshake: RS low, D7..D4 = `0011`, three raw enable pulses.
    ///
    /// The controller's bus width is unknown at this point, so this never goes through the nibble
    /// splitting of [HD44780Driver::send_command].
    fn reset(&mut self) -> LcdResult<()>;

    /// Switches the controller to the 4-line bus: RS low, D7..D4 = `0010`, one raw enable pulse.
    ///
    /// # Errors
    /// - `LcdError::ProtocolSequenceViolation` if the bus has 8 lines, or if anything but
    ///   [HD44780Driver::reset] happened since the last reset.
    fn enable_four_bit_mode(&mut self) -> LcdResult<()>;

    /// Sends an instruction (RS = 0).
    fn send_instruction(&mut self, instruction: u8) -> LcdResult<()> {
        self.send_command(RegisterSelect::Instruction, ReadWrite::Write, instruction)
    }

    /// Sends character data (RS = 1).
    fn send_data(&mut self, data: u8) -> LcdResult<()> {
        self.send_command(RegisterSelect::Data, ReadWrite::Write, data)
    }

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> LcdResult<()> {
        self.send_instruction(0b00000001)
    }

    /// Sets the cursor to the home position.
    fn return_home(&mut self) -> LcdResult<()> {
        self.send_instruction(0b00000010)
    }

    /// Sets the display to the specified entry mode.
    fn set_entry_mode(&mut self, cursor_direction: CursorDirection, shift: bool) -> LcdResult<()> {
        let mut command = 0b00000100;
        if cursor_direction == CursorDirection::Right {
            command |= 0b00000010;
        }
        if shift {
            command |= 0b00000001;
        }
        self.send_instruction(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> LcdResult<()> {
        let mut command = 0b00001000;
        if display_on {
            command |= 0b00000100;
        }
        if cursor_on {
            command |= 0b00000010;
        }
        if blink_on {
            command |= 0b00000001;
        }
        self.send_instruction(command)
    }

    /// Moves the cursor or shifts the display.
    fn cursor_shift(&mut self, display_shift: bool, direction: CursorDirection) -> LcdResult<()> {
        let mut command = 0b00010000;
        if display_shift {
            command |= 0b00001000;
        }
        if direction == CursorDirection::Right {
            command |= 0b00000100;
        }
        self.send_instruction(command)
    }

    /// Sets the function set. The data length bit follows [HD44780Driver::bus_width].
    fn function_set(&mut self, two_lines: bool, large_font: bool) -> LcdResult<()> {
        let mut command = 0b00100000;
        if self.bus_width() == BusWidth::Eight {
            command |= 0b00010000;
        }
        if two_lines {
            command |= 0b00001000;
        }
        if large_font {
            command |= 0b00000100;
        }
        self.send_instruction(command)
    }

    /// Sets the CGRAM address.
    fn set_cgram_address(&mut self, address: u8) -> LcdResult<()> {
        if address > 0b00111111 {
            return Err(GpioError::InvalidArgument.into());
        }
        self.send_instruction(0b01000000 | address)
    }

    /// Sets the DDRAM address.
    fn set_ddram_address(&mut self, address: u8) -> LcdResult<()> {
        if address > 0b01111111 {
            return Err(GpioError::InvalidArgument.into());
        }
        self.send_instruction(0b10000000 | address)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    #[default]
    Right,
}
