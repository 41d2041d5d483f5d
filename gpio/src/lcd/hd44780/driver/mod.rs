//! HD44780 driver interface.
//!
//! See [HD44780Driver] for the operations and [GpioHD44780Driver] for the implementation over
//! plain GPIO pins.

mod gpio;

use crate::lcd::hd44780::instruction;
use crate::{GpioError, GpioResult};
use log::warn;
use std::fmt::Debug;
pub use crate::lcd::hd44780::CursorDirection;
pub use gpio::*;

/// Number of character cells per line in DDRAM when the controller runs in two-line mode.
pub const LINE_LENGTH: usize = 40;
/// DDRAM address of the first cell of each line.
pub const LINE_ADDRESSES: [u8; 2] = [0x00, 0x40];

pub trait HD44780Driver: Debug {
    /// Runs the power-on synchronization and leaves the controller in 4-bit, two-line, 5x8 font
    /// mode with the display on, cursor and blink off, and auto-increment without shift.
    ///
    /// Has to be run before any other operation, and again whenever the display might have lost
    /// sync (e.g. after a power glitch). All other operations fail with
    /// [GpioError::NotInitialized] until this succeeds.
    fn init(&mut self) -> GpioResult<()>;

    /// Whether [Self::init] has completed.
    fn is_initialized(&self) -> bool;

    /// Clears the display and sets the cursor to the home position.
    ///
    /// Returns only after the controller is done clearing.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(instruction::CLEAR_DISPLAY)
    }

    /// Sets the cursor to the home position.
    fn return_home(&mut self) -> GpioResult<()> {
        self.send_command(instruction::RETURN_HOME)
    }

    /// Sets the display to the specified entry mode.
    fn set_entry_mode(&mut self, cursor_direction: CursorDirection, shift: bool) -> GpioResult<()> {
        self.send_command(instruction::entry_mode(cursor_direction, shift))
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> GpioResult<()> {
        self.send_command(instruction::display_control(display_on, cursor_on, blink_on))
    }

    /// Moves the cursor or shifts the display.
    fn cursor_shift(&mut self, display_shift: bool, direction: CursorDirection) -> GpioResult<()> {
        self.send_command(instruction::cursor_shift(display_shift, direction))
    }

    /// Sets the DDRAM address.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        if address > instruction::DDRAM_ADDRESS_MAX {
            return Err(GpioError::InvalidArgument);
        }
        self.send_command(instruction::set_ddram_address(address))
    }

    /// Moves the cursor to `col` on line `row`.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if `row` isn't 0 or 1, or `col` is past the end of the
    ///   DDRAM line. Nothing is sent in that case.
    fn set_cursor(&mut self, row: usize, col: usize) -> GpioResult<()> {
        let Some(&line_address) = LINE_ADDRESSES.get(row) else {
            return Err(GpioError::InvalidArgument);
        };
        if col >= LINE_LENGTH {
            return Err(GpioError::InvalidArgument);
        }
        self.set_ddram_address(line_address + col as u8)
    }

    /// Writes `s` at the cursor.
    ///
    /// There is no wrapping: characters past the visible width keep going into DDRAM the way
    /// the controller's address counter moves. Characters outside printable ASCII are written
    /// as `?`, since control codes select CGRAM glyphs. `~` is sent as is and shows as an arrow
    /// on the A00 character ROM.
    fn print(&mut self, s: &str) -> GpioResult<()> {
        for c in s.chars() {
            if c.is_ascii() && !c.is_ascii_control() {
                self.send_data(c as u8)?;
            } else {
                warn!("Unprintable character: {:?}", c);
                self.send_data(b'?')?
            }
        }
        Ok(())
    }

    // Low-level commands
    // These raw commands are used by the high-level functions above.

    /// Sends a command to the HD44780 controller.
    /// Sets the RS pin to 0 (command).
    fn send_command(&mut self, command: u8) -> GpioResult<()>;

    /// Sends data to the HD44780 controller.
    /// Sets the RS pin to 1 (data).
    fn send_data(&mut self, data: u8) -> GpioResult<()>;
}
