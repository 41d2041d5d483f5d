//! Encoding of the HD44780 instruction set.
//!
//! Every instruction is identified by its highest set bit; the bits below it are flags.

use super::CursorDirection;

/// Clears the DDRAM and sets the address counter to 0. Long execution time.
pub const CLEAR_DISPLAY: u8 = 0b0000_0001;
/// Sets the address counter to 0 and undoes any display shift. Long execution time.
pub const RETURN_HOME: u8 = 0b0000_0010;

const ENTRY_MODE: u8 = 0b0000_0100;
const DISPLAY_CONTROL: u8 = 0b0000_1000;
const CURSOR_SHIFT: u8 = 0b0001_0000;
const FUNCTION_SET: u8 = 0b0010_0000;
const SET_CGRAM_ADDRESS: u8 = 0b0100_0000;
const SET_DDRAM_ADDRESS: u8 = 0b1000_0000;

/// Raw nibble forcing the controller into 8-bit mode, whatever state it is in.
pub const SYNC_NIBBLE: u8 = 0b0011;
/// Raw nibble switching an 8-bit controller into 4-bit mode.
pub const FOUR_BIT_NIBBLE: u8 = 0b0010;

/// The highest valid DDRAM address.
pub const DDRAM_ADDRESS_MAX: u8 = 0b0111_1111;

/// Entry mode set: the direction the address counter moves after each character, and whether
/// the whole display shifts along.
pub const fn entry_mode(direction: CursorDirection, shift: bool) -> u8 {
    let mut command = ENTRY_MODE;
    if matches!(direction, CursorDirection::Right) {
        command |= 0b0000_0010;
    }
    if shift {
        command |= 0b0000_0001;
    }
    command
}

/// Display on/off control.
pub const fn display_control(display_on: bool, cursor_on: bool, blink_on: bool) -> u8 {
    let mut command = DISPLAY_CONTROL;
    if display_on {
        command |= 0b0000_0100;
    }
    if cursor_on {
        command |= 0b0000_0010;
    }
    if blink_on {
        command |= 0b0000_0001;
    }
    command
}

/// Cursor or display shift without touching DDRAM.
pub const fn cursor_shift(display_shift: bool, direction: CursorDirection) -> u8 {
    let mut command = CURSOR_SHIFT;
    if display_shift {
        command |= 0b0000_1000;
    }
    if matches!(direction, CursorDirection::Right) {
        command |= 0b0000_0100;
    }
    command
}

/// Function set for a 4-bit bus. The data length bit is always cleared.
pub const fn function_set(two_lines: bool, font_5x10: bool) -> u8 {
    let mut command = FUNCTION_SET;
    if two_lines {
        command |= 0b0000_1000;
    }
    if font_5x10 {
        command |= 0b0000_0100;
    }
    command
}

/// Set DDRAM address. Only the low 7 bits of `address` are used.
pub const fn set_ddram_address(address: u8) -> u8 {
    SET_DDRAM_ADDRESS | (address & DDRAM_ADDRESS_MAX)
}

/// The kind of an instruction byte, decoded from its highest set bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InstructionKind {
    /// `0x00`, which the controller treats as a no-op.
    None,
    ClearDisplay,
    ReturnHome,
    EntryMode,
    DisplayControl,
    CursorShift,
    FunctionSet,
    SetCgramAddress,
    SetDdramAddress,
}

impl InstructionKind {
    pub const fn of(instruction: u8) -> Self {
        match instruction.leading_zeros() {
            0 => InstructionKind::SetDdramAddress,
            1 => InstructionKind::SetCgramAddress,
            2 => InstructionKind::FunctionSet,
            3 => InstructionKind::CursorShift,
            4 => InstructionKind::DisplayControl,
            5 => InstructionKind::EntryMode,
            6 => InstructionKind::ReturnHome,
            7 => InstructionKind::ClearDisplay,
            _ => InstructionKind::None,
        }
    }

    /// Whether the controller needs the long (~1.52 ms) execution time for this instruction.
    pub const fn is_slow(self) -> bool {
        matches!(self, InstructionKind::ClearDisplay | InstructionKind::ReturnHome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_instructions_match_the_datasheet() {
        assert_eq!(function_set(true, false), 0x28);
        assert_eq!(display_control(true, false, false), 0x0C);
        assert_eq!(entry_mode(CursorDirection::Right, false), 0x06);
    }

    #[test]
    fn ddram_address_is_masked_to_seven_bits() {
        assert_eq!(set_ddram_address(0x00), 0x80);
        assert_eq!(set_ddram_address(0x40), 0xC0);
        assert_eq!(set_ddram_address(0xFF), 0xFF);
    }

    #[test]
    fn kind_follows_the_highest_set_bit() {
        assert_eq!(InstructionKind::of(0x00), InstructionKind::None);
        assert_eq!(InstructionKind::of(CLEAR_DISPLAY), InstructionKind::ClearDisplay);
        assert_eq!(InstructionKind::of(0x03), InstructionKind::ReturnHome);
        assert_eq!(InstructionKind::of(0x06), InstructionKind::EntryMode);
        assert_eq!(InstructionKind::of(0x0C), InstructionKind::DisplayControl);
        assert_eq!(InstructionKind::of(0x1C), InstructionKind::CursorShift);
        assert_eq!(InstructionKind::of(0x28), InstructionKind::FunctionSet);
        assert_eq!(InstructionKind::of(0x40), InstructionKind::SetCgramAddress);
        assert_eq!(InstructionKind::of(0xC5), InstructionKind::SetDdramAddress);
    }

    #[test]
    fn only_clear_and_home_are_slow() {
        assert!(InstructionKind::of(0x01).is_slow());
        assert!(InstructionKind::of(0x02).is_slow());
        assert!(!InstructionKind::of(0x28).is_slow());
        assert!(!InstructionKind::of(0x80).is_slow());
    }
}
