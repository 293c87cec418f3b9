use std::{
    fmt::{self, Write},
    str::FromStr,
};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// a wall clock time with minute resolution, what alarms are scheduled and compared at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    /// # Errors
    /// if `hour > 23` or `minute > 59`
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self(u16::from(hour) * 60 + u16::from(minute)))
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from(chrono::Local::now().time())
    }

    #[must_use]
    pub const fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    #[must_use]
    pub const fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }

    /// wraps around midnight, so `23:55 + 10` is `00:05`
    #[must_use]
    pub fn add_minutes(self, minutes: u32) -> Self {
        let total = (u32::from(self.0) + minutes % MINUTES_PER_DAY) % MINUTES_PER_DAY;
        // total < 1440 so it always fits
        Self(total as u16)
    }

    /// formats with a chrono format string such as `%-I:%M %p`, falling back to `HH:MM`
    /// when chrono can't use the format for a time of day
    #[must_use]
    pub fn format(self, time_format: &str) -> String {
        self.try_format(time_format).unwrap_or_else(|| self.to_string())
    }

    /// `None` when chrono fails to format, e.g. for an unknown specifier
    #[must_use]
    pub fn try_format(self, time_format: &str) -> Option<String> {
        let mut formatted = String::new();
        write!(formatted, "{}", NaiveTime::from(self).format(time_format)).ok()?;
        Some(formatted)
    }
}

impl From<NaiveTime> for MinuteOfDay {
    fn from(time: NaiveTime) -> Self {
        // hour() < 24 and minute() < 60
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl From<MinuteOfDay> for NaiveTime {
    fn from(time: MinuteOfDay) -> Self {
        Self::from_hms_opt(u32::from(time.hour()), u32::from(time.minute()), 0)
            .unwrap_or(Self::MIN)
    }
}

impl FromStr for MinuteOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(hour) || !two_digits(minute) {
            return Err(invalid());
        }
        let hour = hour.parse::<u8>().map_err(|_| invalid())?;
        let minute = minute.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MinuteOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MinuteOfDay> for String {
    fn from(time: MinuteOfDay) -> Self {
        time.to_string()
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> MinuteOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_displays_24h() {
        assert_eq!(at("07:05").to_string(), "07:05");
        assert_eq!(at("23:59").hour(), 23);
        assert_eq!(at("00:00").minute(), 0);
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in [
            "", "7:00", "24:00", "12:60", "ab:cd", "12-30", "123:00", "+1:05", "07:+5", "-1:00",
        ] {
            assert!(bad.parse::<MinuteOfDay>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn adding_minutes_wraps_midnight() {
        assert_eq!(at("23:55").add_minutes(10), at("00:05"));
        assert_eq!(at("23:58").add_minutes(5), at("00:03"));
        assert_eq!(at("10:00").add_minutes(24 * 60), at("10:00"));
        assert_eq!(at("10:00").add_minutes(90), at("11:30"));
    }

    #[test]
    fn formats_twelve_hour_clock() {
        assert_eq!(at("07:00").format("%-I:%M %p"), "7:00 AM");
        assert_eq!(at("00:05").format("%-I:%M %p"), "12:05 AM");
        assert_eq!(at("13:30").format("%-I:%M %p"), "1:30 PM");
    }

    #[test]
    fn unusable_formats_fall_back_to_24h() {
        assert_eq!(at("07:00").try_format("%Q"), None);
        assert_eq!(at("07:00").format("%Q"), "07:00");
        assert_eq!(at("19:05").format("%H.%M"), "19.05");
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&at("06:45")).unwrap();
        assert_eq!(json, "\"06:45\"");
        let back: MinuteOfDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, at("06:45"));
        assert!(serde_json::from_str::<MinuteOfDay>("\"6:45\"").is_err());
    }
}
