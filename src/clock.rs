//! Everything a front end talks to: the alarm list, the user actions and the tick.

use std::fmt;

use log::{info, warn};

use crate::{
    alarm::{AlarmDraft, AlarmId, CustomFile},
    audio::{AudioBackend, AudioBuffer},
    catalog::RingtoneCatalog,
    config::Config,
    engine::{TickEvent, TriggerEngine, TriggerRegistry},
    error::{ClockError, StorageError},
    playback::{Owner, PlaybackSession},
    storage::Storage,
    store::AlarmStore,
    time::MinuteOfDay,
};

/// something the user should be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    /// a problem the clock recovered from
    Warning(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info(message) => f.write_str(message),
            Self::Warning(message) => write!(f, "warning: {message}"),
        }
    }
}

/// a ringing one shot alarm waiting for dismiss or snooze
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub id: AlarmId,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmStatus {
    Playing,
    Active,
    Inactive,
}

/// the button shown next to an alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Stop,
    Reupload,
    Test,
}

/// what the alarm list shows for one alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmView {
    pub id: AlarmId,
    pub time: String,
    pub label: String,
    pub sound: String,
    pub status: AlarmStatus,
    pub needs_reupload: bool,
    /// `Plays for 10 min (until 12:05 AM)` for timed alarms
    pub timed: Option<String>,
    pub action: PrimaryAction,
}

impl fmt::Display for AlarmView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:>8}  {}  ({})  {:?}",
            self.id, self.time, self.label, self.sound, self.status
        )?;
        if let Some(timed) = &self.timed {
            write!(f, "  {timed}")?;
        }
        if self.needs_reupload {
            f.write_str("  Please re-upload your custom song file")?;
        }
        Ok(())
    }
}

pub struct AlarmClock<B, S> {
    config: Config,
    store: AlarmStore,
    storage: S,
    session: PlaybackSession<B>,
    registry: TriggerRegistry,
    engine: TriggerEngine,
    prompt: Option<Prompt>,
    notices: Vec<Notice>,
}

impl<B: AudioBackend, S: Storage> AlarmClock<B, S> {
    /// loads the saved alarms, an unreadable storage starts empty
    pub fn new(config: Config, backend: B, storage: S) -> Self {
        let mut notices = Vec::new();
        let store = AlarmStore::restore(&storage).unwrap_or_else(|e| {
            warn!("couldn't load saved alarms: {e}");
            notices.push(Notice::Warning(format!("Could not load saved alarms: {e}")));
            AlarmStore::new()
        });
        Self {
            engine: TriggerEngine::new(config.time_format.clone()),
            config,
            store,
            storage,
            session: PlaybackSession::new(backend),
            registry: TriggerRegistry::new(),
            prompt: None,
            notices,
        }
    }

    /// creates an alarm from the form, decoding the custom song first
    ///
    /// # Errors
    /// on invalid input or an undecodable song, nothing is stored then
    pub fn add(&mut self, draft: AlarmDraft) -> Result<AlarmId, ClockError> {
        let draft = draft.validate(self.config.default_duration_minutes)?;
        let decoded = match &draft.file {
            Some(file) => Some(self.decode(file)?),
            None => None,
        };
        let (alarm, file) = draft.into_alarm(self.store.next_id());
        let id = self.store.add(alarm);
        let message = match (decoded, file) {
            (Some(buffer), Some(file)) => {
                self.store.attach_audio(id, buffer, file.name);
                "Custom alarm created. Your song will play when the alarm triggers."
            }
            _ => "Alarm created.",
        };
        info!("added alarm {id}");
        self.persist();
        self.notices.push(Notice::Info(message.to_string()));
        Ok(id)
    }

    /// # Errors
    /// if there is no such alarm
    pub fn delete(&mut self, id: AlarmId) -> Result<(), ClockError> {
        if self.store.find(id).is_none() {
            return Err(ClockError::UnknownAlarm(id));
        }
        self.engine
            .stop_alarm(id, &mut self.session, &mut self.registry);
        self.store.remove(id);
        info!("deleted alarm {id}");
        self.persist();
        Ok(())
    }

    /// enables or disables an alarm, returns whether it is enabled now
    ///
    /// # Errors
    /// if there is no such alarm
    pub fn toggle(&mut self, id: AlarmId) -> Result<bool, ClockError> {
        let alarm = self.store.find_mut(id).ok_or(ClockError::UnknownAlarm(id))?;
        alarm.active = !alarm.active;
        let active = alarm.active;
        if !active {
            self.engine
                .stop_alarm(id, &mut self.session, &mut self.registry);
        }
        info!("alarm {id} {}", if active { "enabled" } else { "disabled" });
        self.persist();
        Ok(active)
    }

    /// plays the alarm's sound once
    ///
    /// # Errors
    /// if there is no such alarm, its custom song is missing, or the audio output fails
    pub fn test(&mut self, id: AlarmId) -> Result<(), ClockError> {
        let alarm = self.store.find(id).ok_or(ClockError::UnknownAlarm(id))?;
        if alarm.ringtone.is_custom() {
            let buffer = self
                .store
                .custom_audio(id)
                .ok_or(ClockError::NeedsReupload(id))?;
            self.session.play_buffer(buffer, false, Owner::Preview)?;
        } else {
            let buffer = RingtoneCatalog::render(self.session.backend(), alarm.ringtone, None);
            self.session.play_buffer(&buffer, false, Owner::Preview)?;
        }
        Ok(())
    }

    /// plays a song that is not attached to any alarm yet
    ///
    /// # Errors
    /// if the song can't be decoded or played
    pub fn preview(&mut self, file: &CustomFile) -> Result<(), ClockError> {
        let buffer = self.decode(file)?;
        self.session.play_buffer(&buffer, false, Owner::Preview)?;
        Ok(())
    }

    pub fn stop_preview(&mut self) {
        self.session.stop_owned_by(Owner::Preview);
    }

    /// links a new song to a custom alarm
    ///
    /// # Errors
    /// if there is no such custom alarm or the song can't be decoded, the old link is kept then
    pub fn reupload(&mut self, id: AlarmId, file: CustomFile) -> Result<(), ClockError> {
        let alarm = self.store.find(id).ok_or(ClockError::UnknownAlarm(id))?;
        if !alarm.ringtone.is_custom() {
            return Err(ClockError::NotCustom(id));
        }
        let buffer = self.decode(&file)?;
        self.store.attach_audio(id, buffer, file.name);
        info!("alarm {id} has a new song");
        self.persist();
        self.notices
            .push(Notice::Info("File re-uploaded successfully.".to_string()));
        Ok(())
    }

    /// silences a specific playing alarm
    pub fn stop(&mut self, id: AlarmId) -> bool {
        self.engine
            .stop_alarm(id, &mut self.session, &mut self.registry)
    }

    /// answers the ringing prompt, returns the alarm that was dismissed
    pub fn dismiss(&mut self) -> Option<AlarmId> {
        let id = self.registry.active_alarm()?;
        self.engine
            .stop_alarm(id, &mut self.session, &mut self.registry);
        self.prompt = None;
        Some(id)
    }

    /// moves the ringing alarm a few minutes later and silences it, returns its new time
    pub fn snooze(&mut self) -> Option<MinuteOfDay> {
        let id = self.registry.active_alarm()?;
        let minutes = self.config.snooze_minutes;
        let time = self.store.find_mut(id).map(|alarm| {
            alarm.postpone(minutes);
            alarm.time
        });
        if let Some(time) = time {
            info!("alarm {id} snoozed until {time}");
            self.persist();
        }
        self.dismiss();
        time
    }

    /// runs the trigger check for `now`, saving if anything changed
    pub fn tick(&mut self, now: MinuteOfDay) -> Vec<TickEvent> {
        let events = self.engine.tick(
            now,
            &mut self.store,
            &mut self.session,
            &mut self.registry,
        );
        for event in &events {
            match event {
                TickEvent::Triggered { id, message } => {
                    self.prompt = Some(Prompt {
                        id: *id,
                        message: message.clone(),
                    });
                }
                TickEvent::Started {
                    notice: Some(notice),
                    ..
                } => self.notices.push(Notice::Warning(notice.clone())),
                TickEvent::Failed { id, error } => {
                    let label = self.store.find(*id).map_or("", |alarm| alarm.label.as_str());
                    self.notices.push(Notice::Warning(format!(
                        "Alarm \"{label}\" couldn't play: {error}"
                    )));
                }
                TickEvent::Started { notice: None, .. }
                | TickEvent::Stopped { .. }
                | TickEvent::Rearmed { .. } => {}
            }
        }
        if !events.is_empty() {
            self.persist();
        }
        events
    }

    /// the ringing one shot alarm, if any
    #[must_use]
    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt
            .as_ref()
            .filter(|prompt| self.registry.active_alarm() == Some(prompt.id))
    }

    /// notices since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    #[must_use]
    pub fn views(&self) -> Vec<AlarmView> {
        let time_format = self.engine.time_format();
        self.store
            .list()
            .iter()
            .map(|alarm| {
                let playing = self.registry.is_playing(alarm.id);
                let needs_reupload = alarm.needs_reupload();
                let sound = if alarm.ringtone.is_custom() {
                    let fallback = if needs_reupload {
                        "File needs re-upload"
                    } else {
                        "Uploaded Song"
                    };
                    format!(
                        "Custom: {}",
                        alarm.custom_file_name.as_deref().unwrap_or(fallback)
                    )
                } else {
                    alarm.ringtone.display_name().to_string()
                };
                let status = if playing {
                    AlarmStatus::Playing
                } else if alarm.active {
                    AlarmStatus::Active
                } else {
                    AlarmStatus::Inactive
                };
                let action = if playing {
                    PrimaryAction::Stop
                } else if needs_reupload {
                    PrimaryAction::Reupload
                } else {
                    PrimaryAction::Test
                };
                let timed = alarm
                    .duration_minutes()
                    .zip(alarm.end_time())
                    .map(|(duration, end)| {
                        format!("Plays for {duration} min (until {})", end.format(time_format))
                    });
                AlarmView {
                    id: alarm.id,
                    time: alarm.time.format(time_format),
                    label: alarm.label.clone(),
                    sound,
                    status,
                    needs_reupload,
                    timed,
                    action,
                }
            })
            .collect()
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &AlarmStore {
        &self.store
    }

    #[must_use]
    pub const fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn session(&self) -> &PlaybackSession<B> {
        &self.session
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn decode(&mut self, file: &CustomFile) -> Result<AudioBuffer, ClockError> {
        self.session.backend_mut().decode(&file.bytes).map_err(|e| {
            warn!("couldn't decode {}: {e}", file.name);
            e.into()
        })
    }

    /// saving failures only cost durability, the alarms keep working this session
    fn persist(&mut self) {
        if let Err(e) = self.store.persist(&mut self.storage) {
            warn!("couldn't save alarms: {e}");
            let message = match e {
                StorageError::QuotaExceeded { .. } => {
                    "Storage is full. Your alarms will work for this session only.".to_string()
                }
                e => format!("Could not save alarms, they will work for this session only: {e}"),
            };
            self.notices.push(Notice::Warning(message));
        }
    }
}
