use std::fmt;

use chrono::{NaiveTime, Timelike};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid clock time '{input}', expected HH:MM between 00:00 and 23:59")]
pub struct FormatError {
    pub input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        NaiveTime::parse_from_str(input.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| FormatError {
                input: input.to_string(),
            })
    }

    #[allow(dead_code)]
    pub fn minutes_since_midnight(&self) -> u32 {
        self.0.num_seconds_from_midnight() / 60
    }

    // Unambiguous 24-hour form for files; `Display` is for humans only.
    pub fn storage(&self) -> String {
        self.0.format("%H:%M").to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (is_pm, hour12) = self.0.hour12();
        let meridiem = if is_pm { "PM" } else { "AM" };
        write!(f, "{}:{:02} {}", hour12, self.0.minute(), meridiem)
    }
}

impl std::str::FromStr for ClockTime {
    type Err = FormatError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_24_hour_input() {
        let nine = ClockTime::parse("09:00").expect("valid time");
        assert_eq!(nine.minutes_since_midnight(), 9 * 60);
        assert_eq!(ClockTime::parse("9:00").expect("valid time"), nine);
        assert_eq!(
            ClockTime::parse("23:59")
                .expect("valid time")
                .minutes_since_midnight(),
            23 * 60 + 59
        );
    }

    #[test]
    fn rejects_out_of_range_and_malformed_input() {
        for input in ["24:00", "09:60", "9", "0900", "nine o'clock", "", "9:00 AM"] {
            let err = ClockTime::parse(input).expect_err("should reject");
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn displays_12_hour_without_leading_zero() {
        let cases = [
            ("09:00", "9:00 AM"),
            ("11:00", "11:00 AM"),
            ("13:00", "1:00 PM"),
            ("00:05", "12:05 AM"),
            ("12:00", "12:00 PM"),
            ("18:30", "6:30 PM"),
        ];
        for (input, display) in cases {
            assert_eq!(ClockTime::parse(input).expect("valid").to_string(), display);
        }
    }

    #[test]
    fn storage_form_is_zero_padded_24_hour() {
        assert_eq!(ClockTime::parse("9:05").expect("valid").storage(), "09:05");
        assert_eq!(ClockTime::parse("18:30").expect("valid").storage(), "18:30");
    }

    #[test]
    fn orders_by_minutes_since_midnight() {
        let morning = ClockTime::parse("09:00").expect("valid");
        let noonish = ClockTime::parse("11:30").expect("valid");
        let evening = ClockTime::parse("18:00").expect("valid");
        assert!(morning < noonish);
        assert!(noonish < evening);
        assert_eq!(morning.cmp(&morning), std::cmp::Ordering::Equal);
    }
}
