//! Built-in ringtones as tone recipes.
//!
//! A recipe is a list of [`Tone`]s, each scheduled at an offset from the
//! start. Rendering mixes them into a single buffer; padding that buffer with
//! silence up to a repeat interval and looping it gives the "play the tune
//! again every few seconds" behaviour of a ringing alarm.

use std::time::Duration;

use crate::{
    alarm::Ringtone,
    audio::{mix_into, AudioBackend, AudioBuffer, Tone},
};

/// how often a ringing one shot alarm replays its tune
pub const PROMPT_REPEAT: Duration = Duration::from_secs(2);
/// how often a playing timed alarm replays its tune
pub const TIMED_REPEAT: Duration = Duration::from_secs(3);
/// played instead of a custom song that has to be re-uploaded
pub const FALLBACK: Ringtone = Ringtone::Beep;

const BEEP: &[Tone] = &[
    Tone::sine(800.0, 0.25, 0.0),
    Tone::sine(800.0, 0.25, 0.35),
    Tone::sine(800.0, 0.25, 0.70),
];

const CHIME: &[Tone] = &[
    Tone::sine(523.25, 0.5, 0.0),
    Tone::sine(659.25, 0.5, 0.25),
    Tone::sine(783.99, 0.8, 0.5),
];

const BUZZ: &[Tone] = &[
    Tone::sawtooth(200.0, 0.15, 0.0),
    Tone::sawtooth(200.0, 0.15, 0.18),
    Tone::sawtooth(200.0, 0.15, 0.36),
    Tone::sawtooth(200.0, 0.15, 0.54),
    Tone::sawtooth(200.0, 0.15, 0.72),
];

const MELODY: &[Tone] = &[
    Tone::sine(523.25, 0.3, 0.0),
    Tone::sine(587.33, 0.3, 0.25),
    Tone::sine(659.25, 0.3, 0.5),
    Tone::sine(698.46, 0.3, 0.75),
    Tone::sine(783.99, 0.3, 1.0),
];

const ALERT: &[Tone] = &[
    Tone::sine(1000.0, 0.12, 0.0),
    Tone::sine(1000.0, 0.12, 0.12),
    Tone::sine(1000.0, 0.12, 0.24),
    Tone::sine(1000.0, 0.12, 0.36),
    Tone::sine(1000.0, 0.12, 0.48),
    Tone::sine(1000.0, 0.12, 0.60),
];

const BELL: &[Tone] = &[Tone::sine(440.0, 1.0, 0.0), Tone::sine(440.0, 0.9, 1.0)];

// chirps scattered between 800 and 1200 Hz
const BIRD: &[Tone] = &[
    Tone::sine(950.0, 0.25, 0.0),
    Tone::sine(1120.0, 0.25, 0.28),
    Tone::sine(870.0, 0.25, 0.56),
    Tone::sine(1040.0, 0.25, 0.84),
];

// rumbles scattered between 100 and 300 Hz
const OCEAN: &[Tone] = &[
    Tone::sawtooth(180.0, 0.3, 0.0),
    Tone::sawtooth(240.0, 0.3, 0.14),
    Tone::sawtooth(130.0, 0.3, 0.28),
    Tone::sawtooth(290.0, 0.3, 0.42),
    Tone::sawtooth(160.0, 0.3, 0.56),
    Tone::sawtooth(210.0, 0.3, 0.70),
    Tone::sawtooth(120.0, 0.3, 0.84),
    Tone::sawtooth(270.0, 0.3, 0.98),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct RingtoneCatalog;

impl RingtoneCatalog {
    /// the tones of a built-in ringtone, `None` for [`Ringtone::Custom`]
    #[must_use]
    pub const fn recipe(ringtone: Ringtone) -> Option<&'static [Tone]> {
        Some(match ringtone {
            Ringtone::Beep => BEEP,
            Ringtone::Chime => CHIME,
            Ringtone::Buzz => BUZZ,
            Ringtone::Melody => MELODY,
            Ringtone::Alert => ALERT,
            Ringtone::Bell => BELL,
            Ringtone::Bird => BIRD,
            Ringtone::Ocean => OCEAN,
            Ringtone::Custom => return None,
        })
    }

    /// how long a recipe lasts until its last tone fades out
    #[must_use]
    pub fn length(recipe: &[Tone]) -> Duration {
        let end = recipe.iter().map(Tone::end).fold(0.0f32, f32::max);
        Duration::from_secs_f32(end)
    }

    /// mixes a ringtone into one mono buffer, padded with silence up to `pad_to`
    ///
    /// a custom ringtone renders the fallback tune, there is nothing else to synthesize
    #[must_use]
    pub fn render<B: AudioBackend + ?Sized>(
        backend: &B,
        ringtone: Ringtone,
        pad_to: Option<Duration>,
    ) -> AudioBuffer {
        let recipe = Self::recipe(ringtone)
            .or_else(|| Self::recipe(FALLBACK))
            .unwrap_or_default();
        let sample_rate = backend.sample_rate();
        let mut samples = Vec::new();
        for tone in recipe {
            let rendered = backend.synthesize_tone(tone);
            mix_into(&mut samples, rendered.samples(), tone.offset, sample_rate);
        }
        if let Some(pad_to) = pad_to {
            let padded_len = (pad_to.as_secs_f64() * f64::from(sample_rate)).round() as usize;
            if samples.len() < padded_len {
                samples.resize(padded_len, 0.0);
            }
        }
        AudioBuffer::new(samples, 1, sample_rate)
    }
}
