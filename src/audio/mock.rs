use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{AudioBackend, AudioBuffer, SessionHandle, DEFAULT_SAMPLE_RATE};
use crate::error::{DecodeError, PlaybackError};

/// a backend that records what it was asked to do instead of playing anything
///
/// clones share state, so a test can keep one and hand the other to the clock
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    next_handle: u64,
    plays: Vec<PlayCall>,
    audible: Vec<SessionHandle>,
    finished: Vec<SessionHandle>,
    stopped: Vec<SessionHandle>,
    fail_decoding: bool,
    fail_playback: bool,
}

/// one recorded `play_buffer` call
#[derive(Debug, Clone, PartialEq)]
pub struct PlayCall {
    pub handle: SessionHandle,
    pub buffer: AudioBuffer,
    pub looping: bool,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// makes every following `decode` fail
    pub fn fail_decoding(&self, fail: bool) {
        self.state().fail_decoding = fail;
    }

    /// makes every following `play_buffer` fail
    pub fn fail_playback(&self, fail: bool) {
        self.state().fail_playback = fail;
    }

    #[must_use]
    pub fn plays(&self) -> Vec<PlayCall> {
        self.state().plays.clone()
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.state().plays.len()
    }

    #[must_use]
    pub fn last_play(&self) -> Option<PlayCall> {
        self.state().plays.last().cloned()
    }

    /// sessions that were started and not stopped yet
    #[must_use]
    pub fn audible(&self) -> Vec<SessionHandle> {
        self.state().audible.clone()
    }

    /// every `stop_session` call, in order
    #[must_use]
    pub fn stopped(&self) -> Vec<SessionHandle> {
        self.state().stopped.clone()
    }

    /// pretends a non looping session reached the end of its samples
    pub fn finish(&self, handle: SessionHandle) {
        let mut state = self.state();
        state.audible.retain(|audible| *audible != handle);
        state.finished.push(handle);
    }
}

impl AudioBackend for MockBackend {
    fn decode(&mut self, bytes: &[u8]) -> Result<AudioBuffer, DecodeError> {
        if self.state().fail_decoding {
            return Err(DecodeError::Unsupported("mock decoder refused".to_string()));
        }
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let samples: Vec<f32> = bytes
            .iter()
            .map(|byte| f32::from(*byte) / 255.0)
            .collect();
        Ok(AudioBuffer::new(samples, 1, DEFAULT_SAMPLE_RATE))
    }

    fn play_buffer(
        &mut self,
        buffer: &AudioBuffer,
        looping: bool,
    ) -> Result<SessionHandle, PlaybackError> {
        let mut state = self.state();
        if state.fail_playback {
            return Err(PlaybackError::Device("mock device unplugged".to_string()));
        }
        state.next_handle += 1;
        let handle = SessionHandle(state.next_handle);
        state.plays.push(PlayCall {
            handle,
            buffer: buffer.clone(),
            looping,
        });
        state.audible.push(handle);
        Ok(handle)
    }

    fn stop_session(&mut self, handle: SessionHandle) {
        let mut state = self.state();
        state.audible.retain(|audible| *audible != handle);
        state.stopped.push(handle);
    }

    fn is_finished(&self, handle: SessionHandle) -> bool {
        self.state().finished.contains(&handle)
    }
}
