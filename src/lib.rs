#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! An alarm clock: one shot alarms that ring until answered and timed alarms that play
//! for a fixed number of minutes, checked once a second against the wall clock.

pub mod alarm;
pub mod audio;
/// the built in ringtones
pub mod catalog;
pub mod clock;
pub mod communication;
pub mod config;
pub mod engine;
pub mod error;
pub mod playback;
pub mod storage;
pub mod store;
pub mod time;

pub use alarm::{Alarm, AlarmDraft, AlarmId, CustomFile, Ringtone, Schedule};
pub use clock::{AlarmClock, AlarmStatus, AlarmView, Notice, PrimaryAction, Prompt};
pub use config::Config;
pub use error::ClockError;
pub use time::MinuteOfDay;
