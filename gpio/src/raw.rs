//! Memory-mapped access to the BCM283x/BCM2711 GPIO register block.
//!
//! This is the fastest backend available on a Raspberry Pi: a pin write is a single volatile
//! store to `GPSETn`/`GPCLRn`, so sub-microsecond enable pulses are actually achievable.
use crate::{GpioDriver, GpioError, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

/// Function select values for the `GPFSELn` registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum PinFunction {
    Input = 0b000,
    Output = 0b001,
}

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    /// Physical base of the GPIO block on BCM2836/BCM2837 (Raspberry Pi 2 and 3).
    pub const BCM2837_GPIO_BASE: u64 = 0x3F20_0000;
    /// Physical base of the GPIO block on BCM2711 (Raspberry Pi 4).
    pub const BCM2711_GPIO_BASE: u64 = 0xFE20_0000;

    const PIN_COUNT: usize = 58;
    const BLOCK_LEN: usize = 4096;

    // Register offsets, in 32-bit words
    const GPFSEL: usize = 0x00 / 4;
    const GPSET: usize = 0x1C / 4;
    const GPCLR: usize = 0x28 / 4;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(Self::BLOCK_LEN)
            .map_raw(&file)?;

        debug!("Mapped GPIO registers from {} at offset {:#x}", path, offset);

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// Maps `/dev/gpiomem`, which exposes only the GPIO block and needs no root.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    /// Maps the GPIO block out of `/dev/mem`. Requires root.
    ///
    /// `base` is the physical address of the GPIO block, e.g. [Self::BCM2711_GPIO_BASE].
    pub fn new_mem(base: u64) -> GpioResult<Self> {
        Self::create("/dev/mem", base)
    }

    fn register(&self, word: usize) -> *mut u32 {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        debug_assert!(word < Self::BLOCK_LEN / 4);
        // SAFETY: every register offset used here lies within the mapped 4 KiB block.
        unsafe { mmap.add(word) }
    }

    pub fn raw_set_pin_function(&self, pin_index: usize, function: PinFunction) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let register_ptr = self.register(Self::GPFSEL + pin_index / 10);
        let shift = (pin_index % 10) * 3;

        // SAFETY: the pointer targets a mapped, aligned device register.
        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift);
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    pub(crate) fn raw_set_pin_output(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let bank = if high { Self::GPSET } else { Self::GPCLR };
        let register_ptr = self.register(bank + pin_index / 32);
        let shift = pin_index % 32;

        // SAFETY: GPSET/GPCLR are write-only; writing a single bit only affects this pin.
        unsafe { register_ptr.write_volatile(1 << shift) };

        Ok(())
    }

    fn release(&self, pin_index: usize) {
        if let Err(err) = self.raw_set_pin_function(pin_index, PinFunction::Input) {
            debug!("Failed to release GPIO{}: {}", pin_index, err);
        }
        self.used_pins.set_aliased(pin_index, false);
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);

        Ok(Box::new(RawGpioPin {
            driver: self,
            pin_index: index,
        }))
    }
}

struct RawGpioPin<'a> {
    driver: &'a RawGpioDriver,
    pin_index: usize,
}

impl Debug for RawGpioPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.pin_index)
    }
}

impl GpioPin for RawGpioPin<'_> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        // Latch low before switching the function so the line never glitches high
        self.driver.raw_set_pin_output(self.pin_index, false)?;
        self.driver.raw_set_pin_function(self.pin_index, PinFunction::Output)?;
        Ok(Box::new(RawGpioOutput { pin: self }))
    }
}

impl Drop for RawGpioPin<'_> {
    fn drop(&mut self) {
        self.driver.release(self.pin_index);
    }
}

struct RawGpioOutput<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.pin)
    }
}

impl GpioOutput for RawGpioOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.pin.driver.raw_set_pin_output(self.pin.pin_index, value)
    }
}
