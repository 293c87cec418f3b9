//! Error types shared across the alarm clock

use std::path::PathBuf;

use thiserror::Error;

use crate::alarm::AlarmId;

/// The decoder could not turn the user's file into a playable buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Cannot decode this file ({0}). Use MP3, WAV, OGG, or AAC-LC (.m4a not Lossless).")]
    Unsupported(String),

    #[error("This file contains no audio. Use MP3, WAV, OGG, or AAC-LC (.m4a not Lossless).")]
    Empty,
}

/// Writing to or reading from durable storage failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: u64, quota: u64 },

    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize alarms")]
    Serialize(#[from] serde_json::Error),
}

/// Form input that cannot become an alarm.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a start time.")]
    MissingTime,

    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("Please enter an alarm label.")]
    MissingLabel,

    #[error("Please select an audio file for the custom ringtone.")]
    MissingAudioFile,

    #[error("a timed alarm needs a duration")]
    MissingDuration,

    #[error("duration must be between 1 and 1439 minutes, got {0}")]
    InvalidDuration(u32),

    #[error("unknown ringtone {0:?}")]
    UnknownRingtone(String),
}

/// The audio output refused to start a session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("no audio output device: {0}")]
    Device(String),

    #[error("playback failed: {0}")]
    Stream(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't find a home directory for the config")]
    NoProjectDirs,

    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("time_format {0:?} can't format a time of day")]
    TimeFormat(String),

    #[error("failed to serialize config")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by the user-facing actions of [`crate::clock::AlarmClock`].
///
/// None of these are fatal: the clock keeps its previous state and keeps ticking.
#[derive(Debug, Error)]
pub enum ClockError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error("no alarm with id {0}")]
    UnknownAlarm(AlarmId),

    #[error("Please re-upload the custom audio file first.")]
    NeedsReupload(AlarmId),

    #[error("alarm {0} does not use a custom ringtone")]
    NotCustom(AlarmId),
}
