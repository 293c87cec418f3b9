//! Audio primitives: decoded buffers, tone synthesis and the backend that plays them.
//!
//! Everything audible goes through [`AudioBackend::play_buffer`]. Built-in
//! ringtones are synthesized into buffers first (see [`crate::catalog`]), so
//! tones and custom songs share the one [`crate::playback::PlaybackSession`].

use std::{f32::consts::TAU, sync::Arc, time::Duration};

use crate::error::{DecodeError, PlaybackError};

pub mod mock;
pub mod rodio_backend;

pub use mock::MockBackend;
pub use rodio_backend::RodioBackend;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// seconds it takes a tone to fade in
const ATTACK_SECS: f32 = 0.05;

/// decoded interleaved samples, cheap to clone
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl AudioBuffer {
    #[must_use]
    pub fn new(samples: impl Into<Arc<[f32]>>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / usize::from(self.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// value of the wave at `phase` in `[0, 1)`
    fn sample(self, phase: f32) -> f32 {
        match self {
            Self::Sine => (TAU * phase).sin(),
            Self::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Sawtooth => 2.0f32.mul_add(phase, -1.0),
            Self::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

/// one note of a ringtone recipe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    /// seconds
    pub duration: f32,
    pub waveform: Waveform,
    /// seconds after the recipe starts
    pub offset: f32,
    pub volume: f32,
}

impl Tone {
    pub const DEFAULT_VOLUME: f32 = 0.4;

    #[must_use]
    pub const fn sine(frequency: f32, duration: f32, offset: f32) -> Self {
        Self {
            frequency,
            duration,
            waveform: Waveform::Sine,
            offset,
            volume: Self::DEFAULT_VOLUME,
        }
    }

    #[must_use]
    pub const fn sawtooth(frequency: f32, duration: f32, offset: f32) -> Self {
        Self {
            waveform: Waveform::Sawtooth,
            ..Self::sine(frequency, duration, offset)
        }
    }

    /// seconds from the recipe start until this tone is silent again
    #[must_use]
    pub fn end(&self) -> f32 {
        self.offset + self.duration
    }
}

/// opaque id of one started playback, only meaningful to the backend that returned it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// the capability of actually making noise
pub trait AudioBackend {
    /// # Errors
    /// when the bytes are not a supported audio format or contain no samples
    fn decode(&mut self, bytes: &[u8]) -> Result<AudioBuffer, DecodeError>;

    /// starts playing `buffer`, looping it forever if `looping`
    ///
    /// # Errors
    /// when no output device is available
    fn play_buffer(
        &mut self,
        buffer: &AudioBuffer,
        looping: bool,
    ) -> Result<SessionHandle, PlaybackError>;

    /// stops and releases the session, unknown handles are ignored
    fn stop_session(&mut self, handle: SessionHandle);

    /// whether a non looping session ran out of samples
    fn is_finished(&self, handle: SessionHandle) -> bool;

    fn sample_rate(&self) -> u32 {
        DEFAULT_SAMPLE_RATE
    }

    /// renders one tone into a mono buffer
    fn synthesize_tone(&self, tone: &Tone) -> AudioBuffer {
        AudioBuffer::new(synthesize(tone, self.sample_rate()), 1, self.sample_rate())
    }
}

/// linear fade in to `tone.volume` over 50ms, then linear fade out reaching silence at the tone's end
#[must_use]
pub fn synthesize(tone: &Tone, sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate as f32;
    let len = (tone.duration.max(0.0) * rate).round() as usize;
    let attack = ATTACK_SECS.min(tone.duration);
    let release = (tone.duration - attack).max(f32::EPSILON);
    (0..len)
        .map(|i| {
            let t = i as f32 / rate;
            let gain = if t < attack {
                tone.volume * t / attack
            } else {
                tone.volume * (1.0 - (t - attack) / release)
            };
            let phase = (tone.frequency * t).fract();
            tone.waveform.sample(phase) * gain.max(0.0)
        })
        .collect()
}

/// mixes `samples` (mono) into `target` starting at `offset_secs`, growing it when needed
pub fn mix_into(target: &mut Vec<f32>, samples: &[f32], offset_secs: f32, sample_rate: u32) {
    let start = (offset_secs.max(0.0) * sample_rate as f32).round() as usize;
    if target.len() < start + samples.len() {
        target.resize(start + samples.len(), 0.0);
    }
    for (out, sample) in target[start..].iter_mut().zip(samples) {
        *out = (*out + sample).clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_envelope_starts_and_ends_silent() {
        let tone = Tone::sine(440.0, 0.25, 0.0);
        let samples = synthesize(&tone, 8_000);
        assert_eq!(samples.len(), 2_000);
        assert!(samples[0].abs() < 1e-6);
        assert!(samples.last().unwrap().abs() < 0.01);
        let peak = samples.iter().fold(0.0f32, |max, s| max.max(s.abs()));
        assert!(peak <= Tone::DEFAULT_VOLUME + 1e-4);
        assert!(peak > Tone::DEFAULT_VOLUME / 2.0);
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Sawtooth,
            Waveform::Triangle,
        ] {
            for step in 0..100 {
                let value = waveform.sample(step as f32 / 100.0);
                assert!((-1.0..=1.0).contains(&value), "{waveform:?} gave {value}");
            }
        }
    }

    #[test]
    fn mixing_grows_and_clamps() {
        let mut target = vec![0.9; 4];
        mix_into(&mut target, &[0.5, 0.5, 0.5], 0.0005, 4_000);
        // offset of 2 samples
        assert_eq!(target.len(), 5);
        assert_eq!(target[1], 0.9);
        assert_eq!(target[2], 1.0);
        assert_eq!(target[4], 0.5);
    }

    #[test]
    fn buffer_duration_counts_frames() {
        let buffer = AudioBuffer::new(vec![0.0; 88_200], 2, 44_100);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }
}
