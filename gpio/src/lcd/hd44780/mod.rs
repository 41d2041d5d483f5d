//! HD44780 LCD module.
//!
//! Only the 4-bit, write-only wiring is supported: RS, E and D4–D7, with R/W tied to ground.
//! Since the busy flag can't be read back, every instruction is followed by a fixed wait
//! configured through [HD44780Timing].

pub mod driver;
pub mod instruction;
mod mode;
mod timing;

pub use mode::*;
pub use timing::*;
