use std::{collections::HashMap, io::Cursor};

use log::{debug, info, warn};
use rodio::{buffer::SamplesBuffer, Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use super::{AudioBackend, AudioBuffer, SessionHandle};
use crate::error::{DecodeError, PlaybackError};

/// plays through the default output device
///
/// the device is only opened when something is first played, so decoding
/// files (e.g. when adding an alarm from the command line) works without one
pub struct RodioBackend {
    stream: Option<OutputStream>,
    sinks: HashMap<SessionHandle, Sink>,
    next_handle: u64,
    /// 0 - 100
    volume: f32,
}

impl RodioBackend {
    #[must_use]
    pub fn new(volume: f32) -> Self {
        Self {
            stream: None,
            sinks: HashMap::new(),
            next_handle: 0,
            volume: volume.clamp(0.0, 100.0),
        }
    }

    fn ensure_stream(&mut self) -> Result<&OutputStream, PlaybackError> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| PlaybackError::Device(e.to_string()))?;
            stream.log_on_drop(false);
            info!("opened default audio output");
            self.stream = Some(stream);
        }
        self.stream
            .as_ref()
            .ok_or_else(|| PlaybackError::Device("output stream unavailable".to_string()))
    }
}

impl AudioBackend for RodioBackend {
    fn decode(&mut self, bytes: &[u8]) -> Result<AudioBuffer, DecodeError> {
        let decoder = Decoder::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.collect();
        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }
        debug!(
            "decoded {} samples, {channels} channel(s) at {sample_rate}Hz",
            samples.len()
        );
        Ok(AudioBuffer::new(samples, channels, sample_rate))
    }

    fn play_buffer(
        &mut self,
        buffer: &AudioBuffer,
        looping: bool,
    ) -> Result<SessionHandle, PlaybackError> {
        if buffer.is_empty() {
            return Err(PlaybackError::Stream("buffer has no samples".to_string()));
        }
        let volume = self.volume / 100.0;
        let sink = Sink::connect_new(self.ensure_stream()?.mixer());
        sink.set_volume(volume);
        let source = SamplesBuffer::new(
            buffer.channels(),
            buffer.sample_rate(),
            buffer.samples().to_vec(),
        );
        if looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        sink.play();

        self.next_handle += 1;
        let handle = SessionHandle(self.next_handle);
        self.sinks.insert(handle, sink);
        Ok(handle)
    }

    fn stop_session(&mut self, handle: SessionHandle) {
        match self.sinks.remove(&handle) {
            Some(sink) => sink.stop(),
            None => warn!("asked to stop unknown audio session {handle:?}"),
        }
    }

    fn is_finished(&self, handle: SessionHandle) -> bool {
        self.sinks.get(&handle).map_or(true, Sink::empty)
    }
}
