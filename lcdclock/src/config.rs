use std::env::var_os;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Duration;
use lcdclock_gpio::lcd::hd44780::HD44780Timing;
use lcdclock_gpio::recording::BusWiring;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_VAR: &str = "LCDCLOCK_CONFIG";
const PULSE_VAR: &str = "LCDCLOCK_PULSE_US";
const SETTLE_VAR: &str = "LCDCLOCK_SETTLE_US";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{name} must be a whole number of microseconds, got {value:?}")]
    InvalidOverride { name: &'static str, value: String },
}

/// Where the six LCD lines come from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Backend {
    /// Memory-mapped registers through `/dev/gpiomem`.
    Gpiomem,
    /// Memory-mapped registers through `/dev/mem`, at the given physical base.
    Mem { base: u64 },
    /// A GPIO character device.
    Gpiod { chip: String },
    /// No hardware; the bus traffic is decoded and logged.
    DryRun,
}

/// BCM GPIO numbers of the LCD lines.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct PinConfig {
    pub rs: usize,
    pub e: usize,
    pub d4: usize,
    pub d5: usize,
    pub d6: usize,
    pub d7: usize,
}

impl Default for PinConfig {
    fn default() -> Self {
        PinConfig {
            rs: 27,
            e: 17,
            d4: 25,
            d5: 24,
            d6: 23,
            d7: 22,
        }
    }
}

impl PinConfig {
    pub fn wiring(&self) -> BusWiring {
        BusWiring {
            rs: self.rs,
            e: self.e,
            data: [self.d4, self.d5, self.d6, self.d7],
        }
    }
}

/// [HD44780Timing] in whole microseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub enable_pulse_us: u64,
    pub enable_settle_us: u64,
    pub power_on_delay_us: u64,
    pub init_first_wait_us: u64,
    pub init_second_wait_us: u64,
    pub init_third_wait_us: u64,
    pub clear_execution_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let timing = HD44780Timing::default();
        let us = |d: Duration| d.as_micros() as u64;
        TimingConfig {
            enable_pulse_us: us(timing.enable_pulse_width),
            enable_settle_us: us(timing.enable_settle),
            power_on_delay_us: us(timing.power_on_delay),
            init_first_wait_us: us(timing.init_first_wait),
            init_second_wait_us: us(timing.init_second_wait),
            init_third_wait_us: us(timing.init_third_wait),
            clear_execution_us: us(timing.clear_execution),
        }
    }
}

impl From<&TimingConfig> for HD44780Timing {
    fn from(config: &TimingConfig) -> Self {
        HD44780Timing {
            enable_pulse_width: Duration::from_micros(config.enable_pulse_us),
            enable_settle: Duration::from_micros(config.enable_settle_us),
            power_on_delay: Duration::from_micros(config.power_on_delay_us),
            init_first_wait: Duration::from_micros(config.init_first_wait_us),
            init_second_wait: Duration::from_micros(config.init_second_wait_us),
            init_third_wait: Duration::from_micros(config.init_third_wait_us),
            clear_execution: Duration::from_micros(config.clear_execution_us),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub pins: PinConfig,
    pub timing: TimingConfig,
    /// Visible characters per line.
    pub columns: usize,
    pub refresh_ms: u64,
    /// `time` format description for the first line.
    pub date_format: String,
    /// `time` format description for the second line.
    pub time_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: Backend::Gpiomem,
            pins: PinConfig::default(),
            timing: TimingConfig::default(),
            columns: 16,
            refresh_ms: 1000,
            date_format: "[year]-[month]-[day]".to_string(),
            time_format: "[hour]:[minute]:[second]".to_string(),
        }
    }
}

impl Config {
    fn path() -> PathBuf {
        let config_str = var_os(CONFIG_FILE_VAR);
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("config.json"));
        PathBuf::from(config_str)
    }

    /// Loads the config file, or `None` if there is none.
    pub fn try_load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::path();
        if !config_path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(config_path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let writer = BufWriter::new(File::create(Self::path())?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    /// Applies the enable-pulse width and settle time overrides from the environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| dotenv::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parse = |name: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(name)
                .map(|value| {
                    let parsed = value.trim().parse::<u64>();
                    parsed.map_err(|_| ConfigError::InvalidOverride { name, value })
                })
                .transpose()
        };

        if let Some(pulse) = parse(PULSE_VAR)? {
            self.timing.enable_pulse_us = pulse;
        }
        if let Some(settle) = parse(SETTLE_VAR)? {
            self.timing.enable_settle_us = settle;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_timing_round_trips_through_microseconds() {
        let timing = HD44780Timing::from(&TimingConfig::default());
        assert_eq!(timing, HD44780Timing::default());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "backend": { "type": "gpiod", "chip": "/dev/gpiochip4" },
                "timing": { "enable_settle_us": 100 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.backend, Backend::Gpiod { chip: "/dev/gpiochip4".to_string() });
        assert_eq!(config.pins, PinConfig::default());
        assert_eq!(config.timing.enable_settle_us, 100);
        assert_eq!(config.timing.enable_pulse_us, 1);
        assert_eq!(config.refresh_ms, 1000);
    }

    #[test]
    fn backend_tags_are_kebab_case() {
        let config: Config = serde_json::from_str(r#"{ "backend": { "type": "dry-run" } }"#).unwrap();
        assert_eq!(config.backend, Backend::DryRun);

        let config: Config =
            serde_json::from_str(r#"{ "backend": { "type": "mem", "base": 4263510016 } }"#).unwrap();
        assert_eq!(config.backend, Backend::Mem { base: 0xFE20_0000 });
    }

    #[test]
    fn overrides_replace_pulse_and_settle() {
        let config = Config::default()
            .with_overrides(|name| match name {
                PULSE_VAR => Some("10".to_string()),
                SETTLE_VAR => Some(" 100 ".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.timing.enable_pulse_us, 10);
        assert_eq!(config.timing.enable_settle_us, 100);
        assert_eq!(config.timing.clear_execution_us, 2000);
    }

    #[test]
    fn malformed_override_is_rejected() {
        let err = Config::default()
            .with_overrides(|name| (name == SETTLE_VAR).then(|| "fast".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { name: SETTLE_VAR, .. }));
    }

    #[test]
    fn wiring_follows_pin_numbers() {
        let wiring = PinConfig::default().wiring();
        assert_eq!(wiring.rs, 27);
        assert_eq!(wiring.e, 17);
        assert_eq!(wiring.data, [25, 24, 23, 22]);
    }
}
