//! The in-memory alarm list and its persisted form.
//!
//! Decoded custom songs live next to the alarms, keyed by alarm id, and never
//! reach storage. Saving marks every custom alarm as needing a re-upload and
//! loading never has any audio to attach, so a custom alarm always comes back
//! from storage unlinked.

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    alarm::{Alarm, AlarmId, Ringtone, Schedule},
    audio::AudioBuffer,
    error::{StorageError, ValidationError},
    storage::Storage,
    time::MinuteOfDay,
};

/// where the alarm list is kept
pub const STORAGE_KEY: &str = "customAlarms";
/// the lowest id not handed out yet, so a deleted alarm's id is never reused after a restart
pub const NEXT_ID_KEY: &str = "nextAlarmId";

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

/// an alarm as it is written to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    pub id: AlarmId,
    pub time: MinuteOfDay,
    pub label: String,
    pub ringtone: Ringtone,
    #[serde(default = "always_true")]
    pub active: bool,
    #[serde(default)]
    pub is_timed: bool,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub end_time: Option<MinuteOfDay>,
    #[serde(default)]
    pub needs_reupload: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_file_name: Option<String>,
    #[serde(default)]
    pub triggered: bool,
}

impl From<&Alarm> for AlarmRecord {
    fn from(alarm: &Alarm) -> Self {
        Self {
            id: alarm.id,
            time: alarm.time,
            label: alarm.label.clone(),
            ringtone: alarm.ringtone,
            active: alarm.active,
            is_timed: alarm.is_timed(),
            duration: alarm.duration_minutes(),
            end_time: alarm.end_time(),
            // the decoded song stays behind, so a custom alarm always needs it again
            needs_reupload: alarm.ringtone.is_custom() || alarm.needs_reupload,
            custom_file_name: alarm.custom_file_name.clone(),
            triggered: alarm.triggered,
        }
    }
}

impl TryFrom<AlarmRecord> for Alarm {
    type Error = ValidationError;

    fn try_from(record: AlarmRecord) -> Result<Self, Self::Error> {
        let schedule = if record.is_timed {
            let duration_minutes = record.duration.ok_or(ValidationError::MissingDuration)?;
            Schedule::Timed { duration_minutes }
        } else {
            Schedule::Once
        };
        let alarm = Self {
            id: record.id,
            time: record.time,
            label: record.label,
            ringtone: record.ringtone,
            active: record.active,
            schedule,
            custom_file_name: record.custom_file_name,
            triggered: record.triggered,
            needs_reupload: record.ringtone.is_custom(),
        };
        if record.end_time.is_some() && record.end_time != alarm.end_time() {
            warn!(
                "alarm {} had a stale end time {:?}, using {:?}",
                alarm.id,
                record.end_time,
                alarm.end_time()
            );
        }
        Ok(alarm)
    }
}

#[derive(Debug, Default)]
pub struct AlarmStore {
    alarms: Vec<Alarm>,
    custom_audio: HashMap<AlarmId, AudioBuffer>,
    next_id: u64,
}

impl AlarmStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// the id the next added alarm gets, always above every id seen so far
    #[must_use]
    pub fn next_id(&self) -> AlarmId {
        let above_existing = self.alarms.iter().map(|alarm| alarm.id.0 + 1).max();
        AlarmId(above_existing.unwrap_or(1).max(self.next_id).max(1))
    }

    /// appends the alarm, giving it a fresh id if its id is already taken
    pub fn add(&mut self, mut alarm: Alarm) -> AlarmId {
        if self.find(alarm.id).is_some() {
            let id = self.next_id();
            warn!("alarm id {} already taken, using {id}", alarm.id);
            alarm.id = id;
        }
        self.next_id = self.next_id.max(alarm.id.0 + 1);
        let id = alarm.id;
        self.alarms.push(alarm);
        id
    }

    /// removes the alarm together with its decoded song
    pub fn remove(&mut self, id: AlarmId) -> Option<Alarm> {
        let index = self.alarms.iter().position(|alarm| alarm.id == id)?;
        self.custom_audio.remove(&id);
        Some(self.alarms.remove(index))
    }

    #[must_use]
    pub fn find(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    pub fn find_mut(&mut self, id: AlarmId) -> Option<&mut Alarm> {
        self.alarms.iter_mut().find(|alarm| alarm.id == id)
    }

    /// alarms in the order they were added
    #[must_use]
    pub fn list(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub fn ids(&self) -> Vec<AlarmId> {
        self.alarms.iter().map(|alarm| alarm.id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    /// links a decoded song to a custom alarm, returns false if there is no such custom alarm
    pub fn attach_audio(&mut self, id: AlarmId, buffer: AudioBuffer, file_name: String) -> bool {
        let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return false;
        };
        if !alarm.ringtone.is_custom() {
            return false;
        }
        alarm.needs_reupload = false;
        alarm.custom_file_name = Some(file_name);
        self.custom_audio.insert(id, buffer);
        true
    }

    /// drops the decoded song, the alarm then needs a re-upload
    pub fn detach_audio(&mut self, id: AlarmId) {
        self.custom_audio.remove(&id);
        if let Some(alarm) = self.find_mut(id) {
            alarm.needs_reupload = alarm.ringtone.is_custom();
        }
    }

    /// the decoded song of a linked custom alarm
    #[must_use]
    pub fn custom_audio(&self, id: AlarmId) -> Option<&AudioBuffer> {
        self.find(id)
            .filter(|alarm| alarm.ringtone.is_custom() && !alarm.needs_reupload)
            .and_then(|_| self.custom_audio.get(&id))
    }

    #[must_use]
    pub fn records(&self) -> Vec<AlarmRecord> {
        self.alarms.iter().map(AlarmRecord::from).collect()
    }

    /// writes all alarms to `storage`, without any decoded audio
    ///
    /// # Errors
    /// when the storage refuses the write; the in-memory alarms are untouched either way
    pub fn persist<S: Storage + ?Sized>(&self, storage: &mut S) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.records())?;
        storage.set(STORAGE_KEY, &json)?;
        storage.set(NEXT_ID_KEY, &self.next_id().to_string())
    }

    /// reads the alarms back; unreadable json gives an empty list
    ///
    /// # Errors
    /// when the storage itself cannot be read
    pub fn restore<S: Storage + ?Sized>(storage: &S) -> Result<Self, StorageError> {
        let mut store = Self::new();
        if let Some(next_id) = storage.get(NEXT_ID_KEY)? {
            match next_id.trim().parse::<u64>() {
                Ok(next_id) => store.next_id = next_id,
                Err(e) => warn!("ignoring saved next alarm id {next_id:?}: {e}"),
            }
        }
        let Some(json) = storage.get(STORAGE_KEY)? else {
            return Ok(store);
        };
        let records: Vec<AlarmRecord> = match serde_json::from_str(&json) {
            Ok(records) => records,
            Err(e) => {
                warn!("couldn't parse saved alarms, starting empty: {e}");
                return Ok(store);
            }
        };
        for record in records {
            let id = record.id;
            match Alarm::try_from(record) {
                Ok(alarm) => {
                    store.add(alarm);
                }
                Err(e) => warn!("skipping saved alarm {id}: {e}"),
            }
        }
        info!("restored {} alarm(s)", store.len());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alarm::{AlarmDraft, CustomFile},
        storage::MemoryStorage,
    };

    fn alarm(store: &AlarmStore, draft: AlarmDraft) -> Alarm {
        draft.validate(15).unwrap().into_alarm(store.next_id()).0
    }

    fn builtin(time: &str, label: &str, timed: Option<u32>) -> AlarmDraft {
        AlarmDraft {
            time: time.to_string(),
            label: label.to_string(),
            ringtone: Ringtone::Chime,
            timed: timed.is_some(),
            duration_minutes: timed,
            file: None,
        }
    }

    fn custom(time: &str) -> AlarmDraft {
        AlarmDraft {
            ringtone: Ringtone::Custom,
            file: Some(CustomFile {
                name: "song.ogg".to_string(),
                bytes: vec![7; 16],
            }),
            ..builtin(time, "Song", None)
        }
    }

    #[test]
    fn ids_are_monotonic_even_after_removal() {
        let mut store = AlarmStore::new();
        let first = store.add(alarm(&store, builtin("07:00", "a", None)));
        let second = store.add(alarm(&store, builtin("08:00", "b", None)));
        assert!(second > first);
        store.remove(second);
        let third = store.add(alarm(&store, builtin("09:00", "c", None)));
        assert!(third > second);
        assert_eq!(store.ids(), vec![first, third]);
    }

    #[test]
    fn deleted_ids_stay_retired_after_restore() {
        let mut storage = MemoryStorage::new();
        let mut store = AlarmStore::new();
        let kept = store.add(alarm(&store, builtin("07:00", "a", None)));
        let deleted = store.add(alarm(&store, builtin("08:00", "b", None)));
        store.remove(deleted);
        store.persist(&mut storage).unwrap();

        let mut restored = AlarmStore::restore(&storage).unwrap();
        assert_eq!(restored.ids(), vec![kept]);
        let next = restored.add(alarm(&restored, builtin("09:00", "c", None)));
        assert!(next > deleted);

        // an unreadable counter only loses the guarantee, not the alarms
        storage.set(NEXT_ID_KEY, "soon").unwrap();
        let restored = AlarmStore::restore(&storage).unwrap();
        assert_eq!(restored.ids(), vec![kept]);
        assert_eq!(restored.next_id(), AlarmId(kept.0 + 1));
    }

    #[test]
    fn builtin_alarms_round_trip_identically() {
        let mut store = AlarmStore::new();
        store.add(alarm(&store, builtin("07:00", "Wake", None)));
        store.add(alarm(&store, builtin("23:55", "Late", Some(10))));
        store.find_mut(AlarmId(1)).unwrap().active = false;
        let mut storage = MemoryStorage::new();
        store.persist(&mut storage).unwrap();

        let restored = AlarmStore::restore(&storage).unwrap();
        assert_eq!(restored.records(), store.records());
        assert_eq!(restored.list(), store.list());
        let late = restored.find(AlarmId(2)).unwrap();
        assert_eq!(late.end_time(), Some("00:05".parse().unwrap()));
    }

    #[test]
    fn custom_alarms_restore_unlinked() {
        let mut store = AlarmStore::new();
        let id = store.add(alarm(&store, custom("06:30")));
        assert!(store.attach_audio(id, AudioBuffer::new(vec![0.5; 8], 1, 8_000), "song.ogg".into()));
        assert!(!store.find(id).unwrap().needs_reupload());
        assert!(store.custom_audio(id).is_some());

        let mut storage = MemoryStorage::new();
        store.persist(&mut storage).unwrap();
        let json = storage.get(STORAGE_KEY).unwrap().unwrap();
        assert!(json.contains("\"needsReupload\":true"));
        // still linked for this session
        assert!(store.custom_audio(id).is_some());

        let restored = AlarmStore::restore(&storage).unwrap();
        let alarm = restored.find(id).unwrap();
        assert!(alarm.needs_reupload());
        assert_eq!(alarm.custom_file_name.as_deref(), Some("song.ogg"));
        assert!(restored.custom_audio(id).is_none());
    }

    #[test]
    fn record_fields_match_the_stored_format() {
        let mut store = AlarmStore::new();
        store.add(alarm(&store, builtin("23:55", "Late", Some(10))));
        let value = serde_json::to_value(store.records()).unwrap();
        let record = &value[0];
        assert_eq!(record["id"], 1);
        assert_eq!(record["time"], "23:55");
        assert_eq!(record["ringtone"], "chime");
        assert_eq!(record["isTimed"], true);
        assert_eq!(record["duration"], 10);
        assert_eq!(record["endTime"], "00:05");
        assert_eq!(record["needsReupload"], false);
    }

    #[test]
    fn failed_persist_keeps_memory_state() {
        let mut store = AlarmStore::new();
        store.add(alarm(&store, builtin("07:00", "Wake", None)));
        let mut storage = MemoryStorage::with_quota(10);
        assert!(matches!(
            store.persist(&mut storage),
            Err(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(store.len(), 1);
        assert!(storage.get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn unreadable_or_invalid_records_are_dropped() {
        let mut storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "{not json").unwrap();
        assert!(AlarmStore::restore(&storage).unwrap().is_empty());

        storage
            .set(
                STORAGE_KEY,
                r#"[{"id":4,"time":"05:00","label":"ok","ringtone":"bell","active":true,"isTimed":false,"duration":null,"endTime":null},
                    {"id":5,"time":"06:00","label":"bad","ringtone":"bell","active":true,"isTimed":true,"duration":null,"endTime":null}]"#,
            )
            .unwrap();
        let restored = AlarmStore::restore(&storage).unwrap();
        assert_eq!(restored.ids(), vec![AlarmId(4)]);
        assert_eq!(restored.next_id(), AlarmId(5));
    }

    #[test]
    fn attaching_audio_to_builtin_alarm_is_refused() {
        let mut store = AlarmStore::new();
        let id = store.add(alarm(&store, builtin("07:00", "Wake", None)));
        assert!(!store.attach_audio(id, AudioBuffer::new(vec![0.0; 4], 1, 8_000), "x.mp3".into()));
        assert!(store.custom_audio(id).is_none());
        assert!(!store.find(id).unwrap().needs_reupload());
    }
}
