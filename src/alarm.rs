use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, time::MinuteOfDay};

/// longest duration a timed alarm may play, anything longer would wrap onto its own start time
pub const MAX_DURATION_MINUTES: u32 = 24 * 60 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub u64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AlarmId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// the sound an alarm plays, either one of the built in tones or a file the user picked
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ringtone {
    #[default]
    Beep,
    Chime,
    Buzz,
    Melody,
    Alert,
    Bell,
    Bird,
    Ocean,
    Custom,
}

impl Ringtone {
    pub const BUILT_IN: [Self; 8] = [
        Self::Beep,
        Self::Chime,
        Self::Buzz,
        Self::Melody,
        Self::Alert,
        Self::Bell,
        Self::Bird,
        Self::Ocean,
    ];

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Beep => "beep",
            Self::Chime => "chime",
            Self::Buzz => "buzz",
            Self::Melody => "melody",
            Self::Alert => "alert",
            Self::Bell => "bell",
            Self::Bird => "bird",
            Self::Ocean => "ocean",
            Self::Custom => "custom",
        }
    }

    /// name shown in the alarm list
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Beep => "Classic Beep",
            Self::Chime => "Gentle Chime",
            Self::Buzz => "Phone Buzz",
            Self::Melody => "Happy Melody",
            Self::Alert => "Alert Sound",
            Self::Bell => "Church Bell",
            Self::Bird => "Bird Chirping",
            Self::Ocean => "Ocean Waves",
            Self::Custom => "Custom",
        }
    }

    #[must_use]
    pub const fn is_custom(self) -> bool {
        matches!(self, Self::Custom)
    }
}

impl FromStr for Ringtone {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::BUILT_IN
            .into_iter()
            .chain([Self::Custom])
            .find(|ringtone| ringtone.id() == s)
            .ok_or(ValidationError::UnknownRingtone(s))
    }
}

impl fmt::Display for Ringtone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// rings once at the alarm time and keeps ringing until dismissed or snoozed
    Once,
    /// plays from the alarm time until `time + duration_minutes`
    Timed { duration_minutes: u32 },
}

/// represents an alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub id: AlarmId,
    pub time: MinuteOfDay,
    pub label: String,
    pub ringtone: Ringtone,
    pub active: bool,
    pub schedule: Schedule,
    /// name of the last file linked to a custom ringtone
    pub custom_file_name: Option<String>,
    // set once the alarm fired for the current matching minute
    pub(crate) triggered: bool,
    // only the store flips this, together with the custom audio it holds
    pub(crate) needs_reupload: bool,
}

impl Alarm {
    #[must_use]
    pub const fn is_timed(&self) -> bool {
        matches!(self.schedule, Schedule::Timed { .. })
    }

    #[must_use]
    pub const fn duration_minutes(&self) -> Option<u32> {
        match self.schedule {
            Schedule::Timed { duration_minutes } => Some(duration_minutes),
            Schedule::Once => None,
        }
    }

    /// when a timed alarm stops playing, `None` for one shot alarms
    #[must_use]
    pub fn end_time(&self) -> Option<MinuteOfDay> {
        self.duration_minutes()
            .map(|duration| self.time.add_minutes(duration))
    }

    #[must_use]
    pub const fn triggered(&self) -> bool {
        self.triggered
    }

    #[must_use]
    pub const fn needs_reupload(&self) -> bool {
        self.needs_reupload
    }

    /// moves the alarm later, used by snooze
    pub fn postpone(&mut self, minutes: u32) {
        self.time = self.time.add_minutes(minutes);
        self.triggered = false;
    }
}

/// a custom song picked by the user, not yet decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// the raw alarm form, everything is optional until [`AlarmDraft::validate`] says otherwise
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmDraft {
    pub time: String,
    pub label: String,
    pub ringtone: Ringtone,
    pub timed: bool,
    pub duration_minutes: Option<u32>,
    pub file: Option<CustomFile>,
}

/// a draft that passed validation, only missing its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    pub time: MinuteOfDay,
    pub label: String,
    pub ringtone: Ringtone,
    pub schedule: Schedule,
    pub file: Option<CustomFile>,
}

impl AlarmDraft {
    /// # Errors
    /// when the time or label is missing, a custom ringtone has no file,
    /// or a timed alarm would end at its own start time
    pub fn validate(self, default_duration: u32) -> Result<ValidDraft, ValidationError> {
        if self.time.trim().is_empty() {
            return Err(ValidationError::MissingTime);
        }
        let time = self.time.parse()?;
        let label = self.label.trim().to_string();
        if label.is_empty() {
            return Err(ValidationError::MissingLabel);
        }
        let schedule = if self.timed {
            let duration_minutes = self.duration_minutes.unwrap_or(default_duration);
            if !(1..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
                return Err(ValidationError::InvalidDuration(duration_minutes));
            }
            Schedule::Timed { duration_minutes }
        } else {
            Schedule::Once
        };
        let file = if self.ringtone.is_custom() {
            Some(self.file.ok_or(ValidationError::MissingAudioFile)?)
        } else {
            None
        };
        Ok(ValidDraft {
            time,
            label,
            ringtone: self.ringtone,
            schedule,
            file,
        })
    }
}

impl ValidDraft {
    /// the alarm starts armed, a custom one needs its audio attached by the store
    #[must_use]
    pub fn into_alarm(self, id: AlarmId) -> (Alarm, Option<CustomFile>) {
        let alarm = Alarm {
            id,
            time: self.time,
            label: self.label,
            ringtone: self.ringtone,
            active: true,
            schedule: self.schedule,
            custom_file_name: None,
            triggered: false,
            needs_reupload: self.ringtone.is_custom(),
        };
        (alarm, self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(time: &str, label: &str) -> AlarmDraft {
        AlarmDraft {
            time: time.to_string(),
            label: label.to_string(),
            ..AlarmDraft::default()
        }
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert_eq!(
            draft("", "Wake").validate(15),
            Err(ValidationError::MissingTime)
        );
        assert_eq!(
            draft("07:00", "   ").validate(15),
            Err(ValidationError::MissingLabel)
        );
        let custom = AlarmDraft {
            ringtone: Ringtone::Custom,
            ..draft("07:00", "Wake")
        };
        assert_eq!(custom.validate(15), Err(ValidationError::MissingAudioFile));
    }

    #[test]
    fn timed_alarm_uses_default_duration_and_wraps_end() {
        let timed = AlarmDraft {
            timed: true,
            ..draft("23:55", "Late")
        };
        let (alarm, _) = timed.validate(10).unwrap().into_alarm(AlarmId(1));
        assert_eq!(alarm.duration_minutes(), Some(10));
        assert_eq!(alarm.end_time(), Some("00:05".parse().unwrap()));
    }

    #[test]
    fn zero_and_full_day_durations_are_rejected() {
        for duration in [0, 24 * 60, 5000] {
            let timed = AlarmDraft {
                timed: true,
                duration_minutes: Some(duration),
                ..draft("08:00", "Bad")
            };
            assert_eq!(
                timed.validate(15),
                Err(ValidationError::InvalidDuration(duration))
            );
        }
    }

    #[test]
    fn one_shot_alarm_has_no_end_time() {
        let (alarm, file) = draft("07:00", " Wake ")
            .validate(15)
            .unwrap()
            .into_alarm(AlarmId(3));
        assert_eq!(alarm.label, "Wake");
        assert!(alarm.active);
        assert!(!alarm.is_timed());
        assert_eq!(alarm.end_time(), None);
        assert!(file.is_none());
    }

    #[test]
    fn custom_alarm_starts_unlinked() {
        let custom = AlarmDraft {
            ringtone: Ringtone::Custom,
            file: Some(CustomFile {
                name: "song.mp3".to_string(),
                bytes: vec![1, 2, 3],
            }),
            ..draft("07:00", "Song")
        };
        let (alarm, file) = custom.validate(15).unwrap().into_alarm(AlarmId(1));
        assert!(alarm.needs_reupload());
        assert_eq!(file.unwrap().name, "song.mp3");
    }

    #[test]
    fn ringtone_ids_parse() {
        assert_eq!("Chime".parse::<Ringtone>(), Ok(Ringtone::Chime));
        assert_eq!("custom".parse::<Ringtone>(), Ok(Ringtone::Custom));
        assert!("siren".parse::<Ringtone>().is_err());
    }
}
