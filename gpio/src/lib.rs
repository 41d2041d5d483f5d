//! GPIO plumbing and a protocol driver for HD44780 character LCDs on a 4-bit bus.
//!
//! The crate is split in two halves:
//! - the pin abstraction ([GpioDriver], [GpioPin], [GpioOutput]) with host backends
//!   ([raw], [gpiod], [recording]),
//! - the [HD44780 driver](lcd::hd44780), which only ever sees [GpioOutput] handles and a
//!   [Delay](delay::Delay).
pub mod delay;
pub mod gpiod;
pub mod lcd;
pub mod raw;
pub mod recording;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("required pin {0} was not provided")]
    MissingPin(&'static str),
    #[error("display is not initialized")]
    NotInitialized,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Gets the GPIO pin at the given index.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the pin was already handed out and not dropped yet.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;
}

pub trait GpioPin: Debug {
    /// Sets the GPIO pin function to output, allowing writing its state.
    ///
    /// The line starts out low.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO pin. `true` drives the line high.
    fn write(&self, value: bool) -> GpioResult<()>;
}
