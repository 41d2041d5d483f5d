//! Formatting of the two clock lines.

use log::warn;
use time::format_description::{self, OwnedFormatItem};
use time::OffsetDateTime;

/// The two lines shown on the display, as configured format descriptions.
#[derive(Debug)]
pub struct ClockFace {
    date: OwnedFormatItem,
    time: OwnedFormatItem,
}

impl ClockFace {
    pub fn new(date_format: &str, time_format: &str) -> Result<Self, time::error::InvalidFormatDescription> {
        Ok(ClockFace {
            date: format_description::parse_owned::<2>(date_format)?,
            time: format_description::parse_owned::<2>(time_format)?,
        })
    }

    /// Renders both lines, each cut to `columns` characters.
    pub fn render(&self, now: OffsetDateTime, columns: usize) -> Result<[String; 2], time::error::Format> {
        let cut = |s: String| s.chars().take(columns).collect::<String>();
        Ok([cut(now.format(&self.date)?), cut(now.format(&self.time)?)])
    }
}

/// The current local time, or UTC if the local offset can't be determined.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|err| {
        warn!("Local offset unavailable ({}), showing UTC", err);
        OffsetDateTime::now_utc()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use time::{Date, Month};

    fn moment() -> OffsetDateTime {
        Date::from_calendar_date(2024, Month::March, 5)
            .unwrap()
            .with_hms(9, 7, 3)
            .unwrap()
            .assume_utc()
    }

    #[test]
    fn default_face_shows_date_then_time() {
        let face = ClockFace::new("[year]-[month]-[day]", "[hour]:[minute]:[second]").unwrap();
        assert_eq!(
            face.render(moment(), 16).unwrap(),
            ["2024-03-05".to_string(), "09:07:03".to_string()]
        );
    }

    #[test]
    fn lines_are_cut_to_the_display_width() {
        let face = ClockFace::new("[weekday], [day] [month repr:long] [year]", "[hour]h").unwrap();
        assert_eq!(
            face.render(moment(), 16).unwrap(),
            ["Tuesday, 05 Marc".to_string(), "09h".to_string()]
        );
    }

    #[test]
    fn bad_format_is_rejected() {
        assert!(ClockFace::new("[yaer]", "[hour]").is_err());
    }
}
