use lcdclock_gpio::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Driver, HD44780Pins};
use lcdclock_gpio::lcd::hd44780::HD44780Timing;
use lcdclock_gpio::recording::{BusWiring, Hd44780Model, ModelEvent, RecordingGpio, RecordingOutput};
use lcdclock_gpio::{GpioDriver, GpioError, GpioOutput};
use pretty_assertions::assert_eq;

// BCM numbers of the usual wiring
const WIRING: BusWiring = BusWiring {
    rs: 27,
    e: 17,
    data: [25, 24, 23, 22],
};

fn outputs(gpio: &RecordingGpio) -> Vec<RecordingOutput<'_>> {
    [WIRING.rs, WIRING.e, WIRING.data[0], WIRING.data[1], WIRING.data[2], WIRING.data[3]]
        .into_iter()
        .map(|index| gpio.output(index))
        .collect()
}

fn pins<'a>(outputs: &'a [RecordingOutput<'a>]) -> HD44780Pins<'a> {
    HD44780Pins::builder()
        .rs(&outputs[0])
        .e(&outputs[1])
        .d4(&outputs[2])
        .d5(&outputs[3])
        .d6(&outputs[4])
        .d7(&outputs[5])
        .build()
        .unwrap()
}

#[test]
fn text_lands_on_both_lines() {
    let gpio = RecordingGpio::new(28);
    let outputs = outputs(&gpio);
    let mut lcd = GpioHD44780Driver::with_delay(pins(&outputs), HD44780Timing::ZERO, &gpio);

    lcd.init().unwrap();
    let init_len = gpio.activity(&WIRING).len();

    lcd.print("Hi").unwrap();
    lcd.set_cursor(1, 0).unwrap();
    lcd.print("Bye").unwrap();

    let activity = gpio.activity(&WIRING);
    let mut model = Hd44780Model::new();
    model.replay(&activity[..init_len]);
    model.take_events();
    model.replay(&activity[init_len..]);

    assert_eq!(model.line(0, 16), "Hi              ");
    assert_eq!(model.line(1, 16), "Bye             ");
    assert_eq!(model.ddram(0x00), b'H');
    assert_eq!(model.ddram(0x01), b'i');
    assert_eq!(model.ddram(0x40), b'B');
    assert_eq!(model.ddram(0x42), b'e');
    assert_eq!(
        model.events(),
        &[
            ModelEvent::Data(b'H'),
            ModelEvent::Data(b'i'),
            ModelEvent::Instruction(0xC0),
            ModelEvent::Data(b'B'),
            ModelEvent::Data(b'y'),
            ModelEvent::Data(b'e'),
        ]
    );
}

#[test]
fn clearing_twice_is_clearing_once() {
    let gpio = RecordingGpio::new(28);
    let outputs = outputs(&gpio);
    let mut lcd = GpioHD44780Driver::with_delay(pins(&outputs), HD44780Timing::ZERO, &gpio);
    lcd.init().unwrap();
    lcd.print("Hello").unwrap();
    lcd.set_cursor(1, 4).unwrap();
    lcd.print("world").unwrap();

    let mut once = Hd44780Model::new();
    let mut twice = Hd44780Model::new();
    let before = gpio.activity(&WIRING);
    once.replay(&before);
    twice.replay(&before);

    gpio.drain();
    lcd.clear_display().unwrap();
    let clear = gpio.activity(&WIRING);
    once.replay(&clear);
    twice.replay(&clear);
    twice.replay(&clear);

    assert_eq!(once.address(), 0x00);
    assert_eq!(twice.address(), 0x00);
    assert_eq!(once.line(0, 40), twice.line(0, 40));
    assert_eq!(once.line(1, 40), twice.line(1, 40));
    assert_eq!(once.line(0, 40).trim(), "");
}

#[test]
fn reinit_recovers_from_a_lost_nibble() {
    let gpio = RecordingGpio::new(28);
    let outputs = outputs(&gpio);
    let mut lcd = GpioHD44780Driver::with_delay(pins(&outputs), HD44780Timing::ZERO, &gpio);
    lcd.init().unwrap();

    // A stray enable pulse leaves the controller halfway through a byte
    outputs[1].write(true).unwrap();
    outputs[1].write(false).unwrap();

    lcd.init().unwrap();
    lcd.print("ok").unwrap();

    let mut model = Hd44780Model::new();
    model.replay(&gpio.activity(&WIRING));
    assert_eq!(model.line(0, 2), "ok");
}

#[test]
fn mapping_two_roles_to_one_gpio_fails() {
    let gpio = RecordingGpio::new(28);
    let mut rs = gpio.get_pin(WIRING.rs).unwrap();
    let _rs_out = rs.as_output().unwrap();
    assert_eq!(gpio.get_pin(WIRING.rs).unwrap_err(), GpioError::AlreadyInUse);
}
