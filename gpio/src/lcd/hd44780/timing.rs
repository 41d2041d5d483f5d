use std::time::Duration;

/// Delays used by the driver between pin transitions.
///
/// Nothing on the bus acknowledges a transfer, so these are the only thing keeping the
/// controller in sync. Values below [HD44780Timing::datasheet] make the controller latch garbage
/// without any error being reported.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HD44780Timing {
    /// How long E is held high for each nibble.
    pub enable_pulse_width: Duration,
    /// How long to wait after E falls before the next transition. Doubles as the execution time
    /// of ordinary instructions, since the busy flag is never polled.
    pub enable_settle: Duration,
    /// Wait before the first synchronization nibble.
    pub power_on_delay: Duration,
    /// Wait after the first synchronization nibble.
    pub init_first_wait: Duration,
    /// Wait after the second synchronization nibble.
    pub init_second_wait: Duration,
    /// Wait after the third synchronization nibble.
    pub init_third_wait: Duration,
    /// Execution time of clear display and return home.
    pub clear_execution: Duration,
}

impl HD44780Timing {
    /// No delays at all. Only useful against a simulated controller.
    pub const ZERO: HD44780Timing = HD44780Timing {
        enable_pulse_width: Duration::ZERO,
        enable_settle: Duration::ZERO,
        power_on_delay: Duration::ZERO,
        init_first_wait: Duration::ZERO,
        init_second_wait: Duration::ZERO,
        init_third_wait: Duration::ZERO,
        clear_execution: Duration::ZERO,
    };

    /// The minimums from the HD44780U datasheet (at 270 kHz).
    ///
    /// The settle time is the 37 µs execution time of ordinary instructions rather than the
    /// enable cycle time, since the busy flag is never read. Oscillators running slower than
    /// nominal need more, see [Default].
    pub const fn datasheet() -> Self {
        HD44780Timing {
            enable_pulse_width: Duration::from_micros(1),
            enable_settle: Duration::from_micros(37),
            power_on_delay: Duration::from_millis(15),
            init_first_wait: Duration::from_micros(4100),
            init_second_wait: Duration::from_micros(100),
            init_third_wait: Duration::from_micros(100),
            clear_execution: Duration::from_micros(1640),
        }
    }

    /// Whether every field is at least the datasheet minimum.
    pub fn meets_datasheet(&self) -> bool {
        let min = Self::datasheet();
        self.enable_pulse_width >= min.enable_pulse_width
            && self.enable_settle >= min.enable_settle
            && self.power_on_delay >= min.power_on_delay
            && self.init_first_wait >= min.init_first_wait
            && self.init_second_wait >= min.init_second_wait
            && self.init_third_wait >= min.init_third_wait
            && self.clear_execution >= min.clear_execution
    }
}

impl Default for HD44780Timing {
    fn default() -> Self {
        HD44780Timing {
            enable_pulse_width: Duration::from_micros(1),
            enable_settle: Duration::from_micros(50),
            power_on_delay: Duration::from_millis(50),
            init_first_wait: Duration::from_millis(5),
            init_second_wait: Duration::from_millis(1),
            init_third_wait: Duration::from_millis(1),
            clear_execution: Duration::from_millis(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_meets_datasheet() {
        assert!(HD44780Timing::default().meets_datasheet());
        assert!(HD44780Timing::datasheet().meets_datasheet());
    }

    #[test]
    fn zero_does_not_meet_datasheet() {
        assert!(!HD44780Timing::ZERO.meets_datasheet());

        let short_clear = HD44780Timing {
            clear_execution: Duration::from_micros(1500),
            ..HD44780Timing::default()
        };
        assert!(!short_clear.meets_datasheet());
    }

    #[test]
    fn settle_must_cover_instruction_execution() {
        let cycle_only = HD44780Timing {
            enable_settle: Duration::from_micros(1),
            ..HD44780Timing::default()
        };
        assert!(!cycle_only.meets_datasheet());

        let barely = HD44780Timing {
            enable_settle: Duration::from_micros(37),
            ..HD44780Timing::default()
        };
        assert!(barely.meets_datasheet());
    }
}
