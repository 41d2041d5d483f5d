use super::instruction::InstructionKind;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    #[default]
    Right,
}

/// The controller mode as last asserted by the driver.
///
/// The controller can't be asked for its mode, so the driver mirrors every mode-changing
/// instruction it sends. [Default] is the state the controller's internal reset leaves it in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DisplayMode {
    pub two_lines: bool,
    pub font_5x10: bool,
    pub display_on: bool,
    pub cursor_on: bool,
    pub blink_on: bool,
    pub direction: CursorDirection,
    pub display_shift: bool,
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode {
            two_lines: false,
            font_5x10: false,
            display_on: false,
            cursor_on: false,
            blink_on: false,
            direction: CursorDirection::Right,
            display_shift: false,
        }
    }
}

impl DisplayMode {
    /// The mode [init](super::driver::HD44780Driver::init) leaves the controller in.
    pub const INITIALIZED: DisplayMode = DisplayMode {
        two_lines: true,
        font_5x10: false,
        display_on: true,
        cursor_on: false,
        blink_on: false,
        direction: CursorDirection::Right,
        display_shift: false,
    };

    /// Updates the mirrored mode after `instruction` was sent.
    pub fn apply(&mut self, instruction: u8) {
        let bit = |n: u8| instruction & (1 << n) != 0;

        match InstructionKind::of(instruction) {
            InstructionKind::FunctionSet => {
                self.two_lines = bit(3);
                self.font_5x10 = bit(2);
            }
            InstructionKind::DisplayControl => {
                self.display_on = bit(2);
                self.cursor_on = bit(1);
                self.blink_on = bit(0);
            }
            InstructionKind::EntryMode => {
                self.direction = if bit(1) { CursorDirection::Right } else { CursorDirection::Left };
                self.display_shift = bit(0);
            }
            // Clear display also forces the increment direction
            InstructionKind::ClearDisplay => {
                self.direction = CursorDirection::Right;
            }
            _ => {}
        }
    }
}
