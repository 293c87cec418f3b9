//! The once-a-second check that decides when alarms ring and stop.
//!
//! ```text
//!            time == now, not triggered
//!   Armed ───────────────────────────────► Ringing / Playing
//!     ▲                                        │
//!     │  minute passed            dismiss, snooze, stop, disable,
//!     │  (triggered cleared)      or end time for timed alarms
//!     │                                        ▼
//!     └──────────────────────────────── Stopped
//! ```
//!
//! The `triggered` flag of each alarm keeps it from ringing twice in the same
//! minute; it is cleared as soon as the clock shows a minute the alarm does not
//! care about. Which alarms are audible right now lives in the
//! [`TriggerRegistry`], which is never persisted: after a restart nothing is
//! playing, even for alarms that were saved with `triggered` set.

use std::collections::BTreeSet;

use log::{debug, error, info, warn};

use crate::{
    alarm::{Alarm, AlarmId},
    audio::AudioBackend,
    catalog::{RingtoneCatalog, PROMPT_REPEAT, TIMED_REPEAT},
    error::PlaybackError,
    playback::{Owner, PlaybackSession},
    store::AlarmStore,
    time::MinuteOfDay,
};

/// which alarms are playing and which one is waiting for dismiss or snooze
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerRegistry {
    playing: BTreeSet<AlarmId>,
    active_alarm: Option<AlarmId>,
}

impl TriggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_playing(&self, id: AlarmId) -> bool {
        self.playing.contains(&id)
    }

    pub fn playing(&self) -> impl Iterator<Item = AlarmId> + '_ {
        self.playing.iter().copied()
    }

    /// the one shot alarm currently asking to be dismissed or snoozed
    #[must_use]
    pub const fn active_alarm(&self) -> Option<AlarmId> {
        self.active_alarm
    }

    /// forgets the alarm, returns whether it was playing
    fn release(&mut self, id: AlarmId) -> bool {
        if self.active_alarm == Some(id) {
            self.active_alarm = None;
        }
        self.playing.remove(&id)
    }
}

/// something that happened during a tick, every event changed an alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    /// a one shot alarm is ringing and waits for dismiss or snooze
    Triggered { id: AlarmId, message: String },
    /// a timed alarm started playing
    Started { id: AlarmId, notice: Option<String> },
    /// an alarm stopped playing on its own
    Stopped { id: AlarmId },
    /// the alarm's minute passed, it can ring again
    Rearmed { id: AlarmId },
    /// the alarm should be playing but the audio output refused
    Failed { id: AlarmId, error: PlaybackError },
}

#[derive(Debug, Clone)]
pub struct TriggerEngine {
    time_format: String,
}

impl TriggerEngine {
    #[must_use]
    pub const fn new(time_format: String) -> Self {
        Self { time_format }
    }

    #[must_use]
    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    /// checks every active alarm against `now`
    ///
    /// calling it again within the same minute changes nothing, so it can run every second
    pub fn tick<B: AudioBackend>(
        &self,
        now: MinuteOfDay,
        store: &mut AlarmStore,
        session: &mut PlaybackSession<B>,
        registry: &mut TriggerRegistry,
    ) -> Vec<TickEvent> {
        session.refresh();
        let mut events = Vec::new();
        for id in store.ids() {
            let Some(alarm) = store.find(id).filter(|alarm| alarm.active).cloned() else {
                continue;
            };
            if alarm.is_timed() {
                self.tick_timed(&alarm, now, store, session, registry, &mut events);
            } else {
                self.tick_once(&alarm, now, store, session, registry, &mut events);
            }
        }
        if !events.is_empty() {
            debug!("tick at {now}: {events:?}");
        }
        events
    }

    fn tick_once<B: AudioBackend>(
        &self,
        alarm: &Alarm,
        now: MinuteOfDay,
        store: &mut AlarmStore,
        session: &mut PlaybackSession<B>,
        registry: &mut TriggerRegistry,
        events: &mut Vec<TickEvent>,
    ) {
        let id = alarm.id;
        if alarm.time == now && !alarm.triggered {
            if let Some(previous) = registry.active_alarm.filter(|previous| *previous != id) {
                // its sound is about to be replaced and only one prompt can be answered
                info!("alarm {previous} was never answered, alarm {id} takes over");
                registry.release(previous);
                events.push(TickEvent::Stopped { id: previous });
            }
            registry.active_alarm = Some(id);
            registry.playing.insert(id);
            set_triggered(store, id, true);

            let mut message = format!("{} - {}", alarm.label, alarm.time.format(&self.time_format));
            if needs_fallback(alarm, store) {
                message.push_str(" (Custom audio needs re-upload)");
            }
            info!("alarm {id} ringing: {message}");
            if let Err(error) = start_alarm_audio(alarm, store, session, PROMPT_REPEAT) {
                error!("alarm {id} couldn't play: {error}");
                events.push(TickEvent::Failed { id, error });
            }
            events.push(TickEvent::Triggered { id, message });
        } else if alarm.time != now && alarm.triggered {
            set_triggered(store, id, false);
            events.push(TickEvent::Rearmed { id });
        }
    }

    fn tick_timed<B: AudioBackend>(
        &self,
        alarm: &Alarm,
        now: MinuteOfDay,
        store: &mut AlarmStore,
        session: &mut PlaybackSession<B>,
        registry: &mut TriggerRegistry,
        events: &mut Vec<TickEvent>,
    ) {
        let id = alarm.id;
        let Some(end_time) = alarm.end_time() else {
            return;
        };
        let mut started = false;
        if alarm.time == now && !registry.is_playing(id) && !alarm.triggered {
            registry.playing.insert(id);
            set_triggered(store, id, true);
            started = true;
            let notice = needs_fallback(alarm, store).then(|| {
                format!(
                    "Alarm \"{}\" triggered but custom audio needs re-upload. Playing backup beep.",
                    alarm.label
                )
            });
            if alarm.time == end_time {
                warn!("timed alarm {id} ends when it starts, it stops right away");
            }
            info!("timed alarm {id} playing until {end_time}");
            match start_alarm_audio(alarm, store, session, TIMED_REPEAT) {
                Ok(()) => events.push(TickEvent::Started { id, notice }),
                Err(error) => {
                    error!("timed alarm {id} couldn't play: {error}");
                    events.push(TickEvent::Failed { id, error });
                }
            }
        }

        // checked after starting, so an alarm ending when it starts never keeps playing
        if end_time == now && registry.is_playing(id) {
            registry.release(id);
            session.stop_owned_by(Owner::Alarm(id));
            // keep the flag when it was set this tick, or it would start again next second
            if !started {
                set_triggered(store, id, false);
            }
            info!("timed alarm {id} finished");
            events.push(TickEvent::Stopped { id });
        } else if alarm.time != now && end_time != now && alarm.triggered {
            set_triggered(store, id, false);
            events.push(TickEvent::Rearmed { id });
        }
    }

    /// silences an alarm right away, returns whether it was playing
    pub fn stop_alarm<B: AudioBackend>(
        &self,
        id: AlarmId,
        session: &mut PlaybackSession<B>,
        registry: &mut TriggerRegistry,
    ) -> bool {
        let was_playing = registry.release(id);
        session.stop_owned_by(Owner::Alarm(id));
        if was_playing {
            info!("alarm {id} stopped");
        }
        was_playing
    }
}

fn set_triggered(store: &mut AlarmStore, id: AlarmId, triggered: bool) {
    if let Some(alarm) = store.find_mut(id) {
        alarm.triggered = triggered;
    }
}

/// a custom alarm whose song is gone plays the fallback beep instead
fn needs_fallback(alarm: &Alarm, store: &AlarmStore) -> bool {
    alarm.ringtone.is_custom() && store.custom_audio(alarm.id).is_none()
}

/// loops the alarm's song, or its ringtone replayed every `repeat`
fn start_alarm_audio<B: AudioBackend>(
    alarm: &Alarm,
    store: &AlarmStore,
    session: &mut PlaybackSession<B>,
    repeat: std::time::Duration,
) -> Result<(), PlaybackError> {
    let owner = Owner::Alarm(alarm.id);
    if let Some(buffer) = store.custom_audio(alarm.id) {
        session.play_buffer(buffer, true, owner)?;
    } else {
        let buffer = RingtoneCatalog::render(session.backend(), alarm.ringtone, Some(repeat));
        session.play_buffer(&buffer, true, owner)?;
    }
    Ok(())
}
