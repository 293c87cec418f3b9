//! The single slot all audible output goes through.
//!
//! Starting anything stops whatever was playing before, so at most one
//! stream is ever audible. The slot remembers who started the current stream;
//! an alarm that lost the slot to a later alarm or a preview cannot silence the
//! newcomer by stopping "its" sound.

use log::{debug, warn};

use crate::{
    alarm::AlarmId,
    audio::{AudioBackend, AudioBuffer, SessionHandle},
    error::PlaybackError,
};

/// who started the current stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Alarm(AlarmId),
    /// the test button or a file preview
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Current {
    handle: SessionHandle,
    owner: Owner,
    looping: bool,
}

#[derive(Debug)]
pub struct PlaybackSession<B> {
    backend: B,
    current: Option<Current>,
}

impl<B: AudioBackend> PlaybackSession<B> {
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            current: None,
        }
    }

    /// stops the current stream, then starts `buffer`
    ///
    /// # Errors
    /// when the backend cannot start playback, the slot is left empty
    pub fn play_buffer(
        &mut self,
        buffer: &AudioBuffer,
        looping: bool,
        owner: Owner,
    ) -> Result<SessionHandle, PlaybackError> {
        self.stop();
        let handle = self.backend.play_buffer(buffer, looping)?;
        debug!("{owner:?} started {handle:?} (looping: {looping})");
        self.current = Some(Current {
            handle,
            owner,
            looping,
        });
        Ok(handle)
    }

    /// stops and releases the current stream, does nothing when idle
    pub fn stop(&mut self) {
        if let Some(current) = self.current.take() {
            debug!("stopping {:?} of {:?}", current.handle, current.owner);
            self.backend.stop_session(current.handle);
        }
    }

    /// stops the current stream only if `owner` started it, returns whether it did
    pub fn stop_owned_by(&mut self, owner: Owner) -> bool {
        if self.owner() == Some(owner) {
            self.stop();
            true
        } else {
            false
        }
    }

    /// releases a stream that reached its end, which only non looping ones should
    pub fn refresh(&mut self) {
        if let Some(current) = self.current {
            if self.backend.is_finished(current.handle) {
                if current.looping {
                    warn!("looping {:?} ended unexpectedly", current.handle);
                } else {
                    debug!("{:?} finished on its own", current.handle);
                }
                self.backend.stop_session(current.handle);
                self.current = None;
            }
        }
    }

    #[must_use]
    pub fn owner(&self) -> Option<Owner> {
        self.current.map(|current| current.owner)
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn handle(&self) -> Option<SessionHandle> {
        self.current.map(|current| current.handle)
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockBackend;

    fn buffer() -> AudioBuffer {
        AudioBuffer::new(vec![0.1; 64], 1, 8_000)
    }

    #[test]
    fn starting_a_stream_stops_the_previous_one() {
        let backend = MockBackend::new();
        let mut session = PlaybackSession::new(backend.clone());
        let first = session
            .play_buffer(&buffer(), true, Owner::Alarm(AlarmId(1)))
            .unwrap();
        let second = session
            .play_buffer(&buffer(), true, Owner::Alarm(AlarmId(2)))
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(backend.audible(), vec![second]);
        assert_eq!(session.owner(), Some(Owner::Alarm(AlarmId(2))));
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let backend = MockBackend::new();
        let mut session = PlaybackSession::new(backend.clone());
        session.stop();
        session.stop();
        assert!(!session.is_playing());
        assert!(backend.audible().is_empty());
    }

    #[test]
    fn former_owner_cannot_stop_newer_stream() {
        let backend = MockBackend::new();
        let mut session = PlaybackSession::new(backend.clone());
        session
            .play_buffer(&buffer(), true, Owner::Alarm(AlarmId(1)))
            .unwrap();
        let preview = session.play_buffer(&buffer(), false, Owner::Preview).unwrap();
        assert!(!session.stop_owned_by(Owner::Alarm(AlarmId(1))));
        assert_eq!(backend.audible(), vec![preview]);
        assert!(session.stop_owned_by(Owner::Preview));
        assert!(backend.audible().is_empty());
    }

    #[test]
    fn finished_preview_clears_itself() {
        let backend = MockBackend::new();
        let mut session = PlaybackSession::new(backend.clone());
        let handle = session.play_buffer(&buffer(), false, Owner::Preview).unwrap();
        session.refresh();
        assert!(session.is_playing());
        assert!(backend.stopped().is_empty());
        backend.finish(handle);
        session.refresh();
        assert!(!session.is_playing());
        assert_eq!(backend.stopped(), vec![handle]);
        // already released, a second refresh or stop doesn't touch the backend again
        session.refresh();
        session.stop();
        assert_eq!(backend.stopped(), vec![handle]);
    }

    #[test]
    fn failed_start_leaves_slot_empty() {
        let backend = MockBackend::new();
        let mut session = PlaybackSession::new(backend.clone());
        session
            .play_buffer(&buffer(), true, Owner::Alarm(AlarmId(1)))
            .unwrap();
        backend.fail_playback(true);
        assert!(session
            .play_buffer(&buffer(), true, Owner::Alarm(AlarmId(2)))
            .is_err());
        assert!(!session.is_playing());
        assert!(backend.audible().is_empty());
    }
}
