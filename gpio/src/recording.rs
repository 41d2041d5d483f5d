//! An in-memory GPIO backend that journals every pin write and delay.
//!
//! Besides being a [GpioDriver], [RecordingGpio] is also a [Delay], so a driver wired to it
//! records its timing alongside the pin transitions without actually sleeping. The journal can
//! be decoded into the nibbles an HD44780 would latch ([decode]) and replayed into a software
//! model of the controller ([Hd44780Model]).
use crate::delay::Delay;
use crate::lcd::hd44780::driver::LINE_ADDRESSES;
use crate::lcd::hd44780::instruction::{self, InstructionKind};
use crate::{GpioDriver, GpioError, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::mem;
use std::sync::atomic::AtomicU8;
use std::time::Duration;

/// One journal entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Event {
    Write { pin: usize, value: bool },
    Delay(Duration),
}

pub struct RecordingGpio {
    lines: usize,
    journal: RefCell<Vec<Event>>,
    used_pins: BitVec<AtomicU8>,
}

impl RecordingGpio {
    pub fn new(lines: usize) -> Self {
        RecordingGpio {
            lines,
            journal: RefCell::new(Vec::new()),
            used_pins: BitVec::repeat(false, lines),
        }
    }

    /// An output for line `index`, bypassing pin bookkeeping.
    pub fn output(&self, index: usize) -> RecordingOutput<'_> {
        RecordingOutput { gpio: self, index }
    }

    /// A copy of the journal so far.
    pub fn journal(&self) -> Vec<Event> {
        self.journal.borrow().clone()
    }

    /// Takes the journal, leaving it empty.
    pub fn drain(&self) -> Vec<Event> {
        mem::take(&mut *self.journal.borrow_mut())
    }

    /// Decodes the journal so far as seen by a controller wired per `wiring`.
    pub fn activity(&self, wiring: &BusWiring) -> Vec<BusActivity> {
        decode(&self.journal.borrow(), wiring)
    }

    fn record(&self, event: Event) {
        self.journal.borrow_mut().push(event);
    }
}

impl Debug for RecordingGpio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordingGpio({})", self.lines)
    }
}

impl Delay for RecordingGpio {
    fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            self.record(Event::Delay(duration));
        }
    }
}

impl GpioDriver for RecordingGpio {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.lines)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);

        Ok(Box::new(RecordingPin { gpio: self, index }))
    }
}

struct RecordingPin<'a> {
    gpio: &'a RecordingGpio,
    index: usize,
}

impl Debug for RecordingPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.gpio, self.index)
    }
}

impl GpioPin for RecordingPin<'_> {
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        let output = self.gpio.output(self.index);
        output.write(false)?;
        Ok(Box::new(output))
    }
}

impl Drop for RecordingPin<'_> {
    fn drop(&mut self) {
        self.gpio.used_pins.set_aliased(self.index, false);
    }
}

pub struct RecordingOutput<'a> {
    gpio: &'a RecordingGpio,
    index: usize,
}

impl Debug for RecordingOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.gpio, self.index)
    }
}

impl GpioOutput for RecordingOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.gpio.record(Event::Write { pin: self.index, value });
        Ok(())
    }
}

/// Which recorded line is connected to which controller input.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BusWiring {
    pub rs: usize,
    pub e: usize,
    /// D4, D5, D6, D7.
    pub data: [usize; 4],
}

impl Default for BusWiring {
    fn default() -> Self {
        BusWiring {
            rs: 0,
            e: 1,
            data: [2, 3, 4, 5],
        }
    }
}

/// What the controller observes on its side of the bus.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusActivity {
    /// D4–D7 as latched on a falling edge of E, with RS as it was at that moment.
    Nibble { rs: bool, value: u8 },
    /// Quiet time while E is low.
    Delay(Duration),
}

/// Decodes a journal into latched nibbles and the delays between them.
///
/// Delays while E is high are part of the enable pulse and not reported.
pub fn decode(events: &[Event], wiring: &BusWiring) -> Vec<BusActivity> {
    let mut levels: HashMap<usize, bool> = HashMap::new();
    let level = |levels: &HashMap<usize, bool>, pin: usize| levels.get(&pin).copied().unwrap_or(false);
    let mut activity = Vec::new();

    for event in events {
        match *event {
            Event::Write { pin, value } => {
                let falling_edge = pin == wiring.e && level(&levels, pin) && !value;
                levels.insert(pin, value);

                if falling_edge {
                    let mut nibble = 0u8;
                    for (bit, &data_pin) in wiring.data.iter().enumerate() {
                        if level(&levels, data_pin) {
                            nibble |= 1 << bit;
                        }
                    }
                    activity.push(BusActivity::Nibble {
                        rs: level(&levels, wiring.rs),
                        value: nibble,
                    });
                }
            }
            Event::Delay(duration) => {
                if !level(&levels, wiring.e) {
                    activity.push(BusActivity::Delay(duration));
                }
            }
        }
    }

    activity
}

/// What the controller model made of the nibbles it received.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ModelEvent {
    /// A single nibble received while still in 8-bit mode.
    RawNibble(u8),
    Instruction(u8),
    Data(u8),
    /// The two halves of a byte were sent with different RS levels.
    Desync,
}

/// A minimal HD44780 simulation: interface width, address counter and DDRAM.
///
/// Timing isn't checked; feed it decoded [BusActivity] to verify what ends up on screen.
#[derive(Debug, Clone)]
pub struct Hd44780Model {
    four_bit: bool,
    two_lines: bool,
    increment: bool,
    pending: Option<(bool, u8)>,
    address: u8,
    ddram: [u8; 128],
    events: Vec<ModelEvent>,
}

impl Default for Hd44780Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Hd44780Model {
    /// A controller right after power-on: 8-bit interface, one line, DDRAM blank.
    pub fn new() -> Self {
        Hd44780Model {
            four_bit: false,
            two_lines: false,
            increment: true,
            pending: None,
            address: 0,
            ddram: [b' '; 128],
            events: Vec::new(),
        }
    }

    pub fn replay(&mut self, activity: &[BusActivity]) {
        for item in activity {
            self.feed(item);
        }
    }

    pub fn feed(&mut self, activity: &BusActivity) {
        let BusActivity::Nibble { rs, value } = *activity else {
            return;
        };

        if !self.four_bit {
            // Only D7..D4 are wired, so the nibble is the high half of an 8-bit transfer
            let byte = value << 4;
            if rs {
                self.events.push(ModelEvent::Data(byte));
                self.write_data(byte);
            } else {
                self.events.push(ModelEvent::RawNibble(value));
                self.execute(byte);
            }
            return;
        }

        match self.pending.take() {
            None => self.pending = Some((rs, value)),
            Some((first_rs, high)) => {
                if first_rs != rs {
                    self.events.push(ModelEvent::Desync);
                }
                let byte = (high << 4) | (value & 0x0F);
                if first_rs {
                    self.events.push(ModelEvent::Data(byte));
                    self.write_data(byte);
                } else {
                    self.events.push(ModelEvent::Instruction(byte));
                    self.execute(byte);
                }
            }
        }
    }

    fn execute(&mut self, command: u8) {
        trace!("Model executing {:08b}", command);
        match InstructionKind::of(command) {
            InstructionKind::ClearDisplay => {
                self.ddram = [b' '; 128];
                self.address = 0;
                self.increment = true;
            }
            InstructionKind::ReturnHome => self.address = 0,
            InstructionKind::EntryMode => self.increment = command & 0b10 != 0,
            InstructionKind::FunctionSet => {
                self.four_bit = command & 0b1_0000 == 0;
                self.two_lines = command & 0b1000 != 0;
                self.pending = None;
            }
            InstructionKind::SetDdramAddress => {
                self.address = command & instruction::DDRAM_ADDRESS_MAX;
            }
            _ => {}
        }
    }

    fn write_data(&mut self, data: u8) {
        self.ddram[self.address as usize] = data;
        self.address = self.next_address();
    }

    fn next_address(&self) -> u8 {
        let a = self.address;
        match (self.two_lines, self.increment) {
            (true, true) => match a {
                0x27 => 0x40,
                0x67 => 0x00,
                // 0x68..=0x7F aren't mapped to any cell in two-line mode
                _ => (a + 1) & instruction::DDRAM_ADDRESS_MAX,
            },
            (true, false) => match a {
                0x00 => 0x67,
                0x40 => 0x27,
                _ => a - 1,
            },
            (false, true) => if a >= 0x4F { 0x00 } else { a + 1 },
            (false, false) => if a == 0x00 { 0x4F } else { a - 1 },
        }
    }

    /// Events observed so far.
    pub fn events(&self) -> &[ModelEvent] {
        &self.events
    }

    /// Takes the events observed so far, leaving the list empty.
    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        mem::take(&mut self.events)
    }

    /// The address counter.
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn is_four_bit(&self) -> bool {
        self.four_bit
    }

    /// The character code at a DDRAM address.
    pub fn ddram(&self, address: u8) -> u8 {
        self.ddram[(address & instruction::DDRAM_ADDRESS_MAX) as usize]
    }

    /// The first `width` cells of line `row` (0 or 1) as text.
    pub fn line(&self, row: usize, width: usize) -> String {
        let start = LINE_ADDRESSES[row.min(1)] as usize;
        self.ddram[start..start + width.min(40)]
            .iter()
            .map(|&c| c as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nibble(rs: bool, value: u8) -> BusActivity {
        BusActivity::Nibble { rs, value }
    }

    #[test]
    fn pins_are_exclusive_until_dropped() {
        let gpio = RecordingGpio::new(4);
        let pin = gpio.get_pin(2).unwrap();
        assert_eq!(gpio.get_pin(2).unwrap_err(), GpioError::AlreadyInUse);
        drop(pin);
        assert!(gpio.get_pin(2).is_ok());
        assert_eq!(gpio.get_pin(4).unwrap_err(), GpioError::InvalidArgument);
    }

    #[test]
    fn output_starts_low() {
        let gpio = RecordingGpio::new(1);
        let mut pin = gpio.get_pin(0).unwrap();
        let _output = pin.as_output().unwrap();
        assert_eq!(gpio.journal(), vec![Event::Write { pin: 0, value: false }]);
    }

    #[test]
    fn decode_latches_on_falling_edge_only() {
        let events = [
            Event::Write { pin: 2, value: true },
            Event::Write { pin: 5, value: true },
            Event::Write { pin: 1, value: true },
            Event::Delay(Duration::from_micros(1)),
            // Data changing while E is high is what gets latched
            Event::Write { pin: 5, value: false },
            Event::Write { pin: 1, value: false },
            Event::Delay(Duration::from_micros(50)),
            // E low -> low is not an edge
            Event::Write { pin: 1, value: false },
        ];

        assert_eq!(
            decode(&events, &BusWiring::default()),
            vec![nibble(false, 0b0001), BusActivity::Delay(Duration::from_micros(50))]
        );
    }

    #[test]
    fn model_switches_to_four_bit_and_writes_ddram() {
        let mut model = Hd44780Model::new();
        model.replay(&[
            nibble(false, 0x3),
            nibble(false, 0x3),
            nibble(false, 0x3),
            nibble(false, 0x2),
            nibble(false, 0x2),
            nibble(false, 0x8),
            nibble(true, 0x4),
            nibble(true, 0x8),
        ]);

        assert!(model.is_four_bit());
        assert_eq!(model.ddram(0x00), b'H');
        assert_eq!(model.address(), 0x01);
        assert_eq!(
            model.events(),
            &[
                ModelEvent::RawNibble(0x3),
                ModelEvent::RawNibble(0x3),
                ModelEvent::RawNibble(0x3),
                ModelEvent::RawNibble(0x2),
                ModelEvent::Instruction(0x28),
                ModelEvent::Data(b'H'),
            ]
        );
    }

    #[test]
    fn model_flags_rs_changing_mid_byte() {
        let mut model = Hd44780Model::new();
        model.replay(&[nibble(false, 0x2), nibble(false, 0x0), nibble(true, 0x1)]);
        assert!(model.events().contains(&ModelEvent::Desync));
    }

    #[test]
    fn two_line_address_counter_wraps_between_lines() {
        let mut model = Hd44780Model::new();
        model.replay(&[nibble(false, 0x2), nibble(false, 0x2), nibble(false, 0x8)]);
        model.replay(&[nibble(false, 0xA), nibble(false, 0x7)]);
        assert_eq!(model.address(), 0x27);

        model.replay(&[nibble(true, 0x4), nibble(true, 0x1)]);
        assert_eq!(model.ddram(0x27), b'A');
        assert_eq!(model.address(), 0x40);
    }

    #[test]
    fn address_counter_wraps_past_the_last_ddram_address() {
        let mut model = Hd44780Model::new();
        model.replay(&[nibble(false, 0x2), nibble(false, 0x2), nibble(false, 0x8)]);
        model.replay(&[nibble(false, 0xF), nibble(false, 0xF)]);
        assert_eq!(model.address(), 0x7F);

        model.replay(&[nibble(true, 0x6), nibble(true, 0x1), nibble(true, 0x6), nibble(true, 0x2)]);
        assert_eq!(model.ddram(0x7F), b'a');
        assert_eq!(model.ddram(0x00), b'b');
        assert_eq!(model.address(), 0x01);
    }
}
