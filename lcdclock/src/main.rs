mod clock;
mod config;

use std::thread;
use dotenv::dotenv;
use log::{debug, info, trace, warn};
use lcdclock_gpio::GpioDriver;
use lcdclock_gpio::gpiod::GpiodDriver;
use lcdclock_gpio::lcd::hd44780::HD44780Timing;
use lcdclock_gpio::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Driver, HD44780Pins};
use lcdclock_gpio::raw::RawGpioDriver;
use lcdclock_gpio::recording::{decode, Hd44780Model, RecordingGpio};
use crate::clock::ClockFace;
use crate::config::{Backend, Config};

/// GPIO lines of a BCM2711, for the dry-run backend.
const DRY_RUN_LINES: usize = 58;

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("lcdclock starting...");

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load()? {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    let config = config.with_env_overrides()?;

    let timing = HD44780Timing::from(&config.timing);
    if !timing.meets_datasheet() {
        warn!("{:?} is below the HD44780 datasheet minimums, the display may latch garbage", timing);
    }

    let face = ClockFace::new(&config.date_format, &config.time_format)?;

    debug!("Initializing GPIO driver...");
    match &config.backend {
        Backend::Gpiomem => run(&RawGpioDriver::new_gpiomem()?, &config, timing, &face, None),
        Backend::Mem { base } => run(&RawGpioDriver::new_mem(*base)?, &config, timing, &face, None),
        Backend::Gpiod { chip } => run(&GpiodDriver::open(chip)?, &config, timing, &face, None),
        Backend::DryRun => {
            let gpio = RecordingGpio::new(DRY_RUN_LINES);
            run(&gpio, &config, timing, &face, Some(&gpio))
        }
    }
}

/// Drives the display from `gpio` forever.
///
/// With `recorder` set, the pin traffic of each frame is decoded and logged instead of being
/// left to real hardware.
fn run(
    gpio: &dyn GpioDriver,
    config: &Config,
    timing: HD44780Timing,
    face: &ClockFace,
    recorder: Option<&RecordingGpio>,
) -> eyre::Result<()> {
    let pins = &config.pins;
    info!("LCD @ RS: {}, E: {}, Data: {:?}",
        pins.rs, pins.e, [pins.d4, pins.d5, pins.d6, pins.d7]);
    debug!("{:?} initialized.", gpio);

    debug!("Initializing LCD driver...");
    let mut lcd_rs_pin = gpio.get_pin(pins.rs)?;
    let lcd_rs_out = lcd_rs_pin.as_output()?;
    let mut lcd_e_pin = gpio.get_pin(pins.e)?;
    let lcd_e_out = lcd_e_pin.as_output()?;
    let mut lcd_d4_pin = gpio.get_pin(pins.d4)?;
    let lcd_d4_out = lcd_d4_pin.as_output()?;
    let mut lcd_d5_pin = gpio.get_pin(pins.d5)?;
    let lcd_d5_out = lcd_d5_pin.as_output()?;
    let mut lcd_d6_pin = gpio.get_pin(pins.d6)?;
    let lcd_d6_out = lcd_d6_pin.as_output()?;
    let mut lcd_d7_pin = gpio.get_pin(pins.d7)?;
    let lcd_d7_out = lcd_d7_pin.as_output()?;

    let lcd_pins = HD44780Pins::builder()
        .rs(&*lcd_rs_out)
        .e(&*lcd_e_out)
        .d4(&*lcd_d4_out)
        .d5(&*lcd_d5_out)
        .d6(&*lcd_d6_out)
        .d7(&*lcd_d7_out)
        .build()?;
    let mut lcd = GpioHD44780Driver::new(lcd_pins, timing);

    lcd.init()?;
    debug!("{:?} initialized.", lcd);

    let wiring = pins.wiring();
    let mut model = recorder.map(|_| Hd44780Model::new());

    info!("Starting main loop...");
    loop {
        let [date, time] = face.render(clock::now(), config.columns)?;

        lcd.clear_display()?;
        lcd.print(&date)?;
        lcd.set_cursor(1, 0)?;
        lcd.print(&time)?;

        if let (Some(gpio), Some(model)) = (recorder, model.as_mut()) {
            model.replay(&decode(&gpio.drain(), &wiring));
            for event in model.take_events() {
                trace!("{:?}", event);
            }
            debug!("[{}] [{}]", model.line(0, config.columns), model.line(1, config.columns));
        }

        thread::sleep(config.refresh_interval());
    }
}
