use crate::delay::{Delay, ThreadDelay};
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::lcd::hd44780::instruction::{self, InstructionKind};
use crate::lcd::hd44780::{CursorDirection, DisplayMode, HD44780Timing};
use crate::{GpioError, GpioOutput, GpioResult};
use log::{debug, trace};
use std::time::Duration;

/// The six lines of a write-only 4-bit HD44780 bus.
#[derive(Debug, Copy, Clone)]
pub struct HD44780Pins<'a> {
    /// Register select: low for instructions, high for characters.
    pub rs: &'a dyn GpioOutput,
    /// Enable: the controller latches D4–D7 on its falling edge.
    pub e: &'a dyn GpioOutput,
    /// D4, D5, D6, D7, in that order. D4 carries the least significant bit of each nibble.
    pub data: [&'a dyn GpioOutput; 4],
}

impl<'a> HD44780Pins<'a> {
    pub fn builder() -> HD44780PinsBuilder<'a> {
        HD44780PinsBuilder::default()
    }

    fn all(&self) -> [&'a dyn GpioOutput; 6] {
        let [d4, d5, d6, d7] = self.data;
        [self.rs, self.e, d4, d5, d6, d7]
    }
}

/// Collects the pins one by one, for when they are resolved individually by the host.
#[derive(Debug, Default)]
pub struct HD44780PinsBuilder<'a> {
    rs: Option<&'a dyn GpioOutput>,
    e: Option<&'a dyn GpioOutput>,
    data: [Option<&'a dyn GpioOutput>; 4],
}

impl<'a> HD44780PinsBuilder<'a> {
    pub fn rs(mut self, pin: &'a dyn GpioOutput) -> Self {
        self.rs = Some(pin);
        self
    }

    pub fn e(mut self, pin: &'a dyn GpioOutput) -> Self {
        self.e = Some(pin);
        self
    }

    pub fn d4(mut self, pin: &'a dyn GpioOutput) -> Self {
        self.data[0] = Some(pin);
        self
    }

    pub fn d5(mut self, pin: &'a dyn GpioOutput) -> Self {
        self.data[1] = Some(pin);
        self
    }

    pub fn d6(mut self, pin: &'a dyn GpioOutput) -> Self {
        self.data[2] = Some(pin);
        self
    }

    pub fn d7(mut self, pin: &'a dyn GpioOutput) -> Self {
        self.data[3] = Some(pin);
        self
    }

    /// # Errors
    /// - `GpioError::MissingPin` naming the first pin that wasn't set.
    pub fn build(self) -> GpioResult<HD44780Pins<'a>> {
        const DATA_NAMES: [&str; 4] = ["D4", "D5", "D6", "D7"];

        let rs = self.rs.ok_or(GpioError::MissingPin("RS"))?;
        let e = self.e.ok_or(GpioError::MissingPin("E"))?;
        let mut data: [&'a dyn GpioOutput; 4] = [rs; 4];
        for (i, pin) in self.data.into_iter().enumerate() {
            data[i] = pin.ok_or(GpioError::MissingPin(DATA_NAMES[i]))?;
        }

        Ok(HD44780Pins { rs, e, data })
    }
}

/// HD44780 driver over six GPIO output pins.
///
/// Each nibble is presented on D4–D7, then E is held high for
/// [enable_pulse_width](HD44780Timing::enable_pulse_width) and followed by
/// [enable_settle](HD44780Timing::enable_settle) of quiet time. Clear and home additionally wait
/// [clear_execution](HD44780Timing::clear_execution).
///
/// The driver holds no lock; sharing one display between threads needs external
/// synchronization around the whole driver.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a, D: Delay = ThreadDelay> {
    pins: HD44780Pins<'a>,
    timing: HD44780Timing,
    delay: D,
    mode: DisplayMode,
    initialized: bool,
}

impl<'a> GpioHD44780Driver<'a> {
    /// Creates a driver that blocks the current thread for its delays.
    pub fn new(pins: HD44780Pins<'a>, timing: HD44780Timing) -> Self {
        Self::with_delay(pins, timing, ThreadDelay)
    }
}

impl<'a, D: Delay> GpioHD44780Driver<'a, D> {
    pub fn with_delay(pins: HD44780Pins<'a>, timing: HD44780Timing, delay: D) -> Self {
        GpioHD44780Driver {
            pins,
            timing,
            delay,
            mode: DisplayMode::default(),
            initialized: false,
        }
    }

    pub fn timing(&self) -> &HD44780Timing {
        &self.timing
    }

    /// The controller mode as asserted by the instructions sent so far.
    pub fn display_mode(&self) -> DisplayMode {
        self.mode
    }

    fn wait(&self, duration: Duration) {
        self.delay.delay(duration);
    }

    fn pulse_enable(&self) -> GpioResult<()> {
        self.pins.e.write(true)?;
        self.wait(self.timing.enable_pulse_width);
        self.pins.e.write(false)?;
        self.wait(self.timing.enable_settle);
        Ok(())
    }

    /// Presents the low 4 bits of `nibble` on D4–D7 and pulses E. RS is left as is.
    pub fn send_nibble(&self, nibble: u8) -> GpioResult<()> {
        trace!("Writing nibble: {:04b}", nibble & 0x0F);
        for (bit, pin) in self.pins.data.iter().enumerate() {
            pin.write(nibble & (1 << bit) != 0)?;
        }
        self.pulse_enable()
    }

    fn send(&mut self, data: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        self.pins.rs.write(rs)?;
        self.send_nibble(data >> 4)?;
        self.send_nibble(data & 0x0F)?;

        Ok(())
    }

    fn command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, false)?;
        self.mode.apply(command);

        let kind = InstructionKind::of(command);
        if kind.is_slow() {
            self.wait(self.timing.clear_execution);
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> GpioResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(GpioError::NotInitialized)
        }
    }
}

impl<D: Delay> HD44780Driver for GpioHD44780Driver<'_, D> {
    fn init(&mut self) -> GpioResult<()> {
        debug!("Initializing HD44780 on a 4-bit bus");
        self.initialized = false;
        self.mode = DisplayMode::default();

        // Every line low; RS stays low through the raw nibbles below
        for pin in self.pins.all() {
            pin.write(false)?;
        }
        self.wait(self.timing.power_on_delay);

        // Synchronize: the controller may be in 8-bit mode or halfway through a 4-bit transfer.
        // Three 8-bit function sets get it into a known 8-bit state from either.
        self.send_nibble(instruction::SYNC_NIBBLE)?;
        self.wait(self.timing.init_first_wait);
        self.send_nibble(instruction::SYNC_NIBBLE)?;
        self.wait(self.timing.init_second_wait);
        self.send_nibble(instruction::SYNC_NIBBLE)?;
        self.wait(self.timing.init_third_wait);
        self.send_nibble(instruction::FOUR_BIT_NIBBLE)?;
        debug!("Switched to 4-bit mode");

        self.command(instruction::function_set(true, false))?;
        self.command(instruction::display_control(true, false, false))?;
        self.command(instruction::CLEAR_DISPLAY)?;
        self.command(instruction::entry_mode(CursorDirection::Right, false))?;

        self.initialized = true;
        debug!("HD44780 initialized: {:?}", self.mode);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.ensure_initialized()?;
        self.command(command)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.ensure_initialized()?;
        self.send(data, true)
    }
}
