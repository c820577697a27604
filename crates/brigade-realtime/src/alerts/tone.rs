//! Synthesized alert tones. Rendered to mono `f32` PCM; no audio assets.

use std::f32::consts::PI;
use std::time::Duration;

use brigade_core::Priority;

pub const SAMPLE_RATE: u32 = 44_100;

const TONE_DURATION: Duration = Duration::from_millis(300);
const TONE_SPACING: Duration = Duration::from_millis(200);
const START_GAIN: f32 = 0.1;
const END_GAIN: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToneKind {
    /// Two ascending tones.
    Info,
    /// Three ascending tones.
    Success,
    /// Five alternating high/low tones.
    Urgent,
}

impl From<Priority> for ToneKind {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Error => Self::Urgent,
            Priority::Success => Self::Success,
            Priority::Info | Priority::Warning => Self::Info,
        }
    }
}

/// One sine tone within a cue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    /// Start relative to the beginning of the cue.
    pub offset: Duration,
    pub duration: Duration,
}

impl ToneKind {
    pub fn frequencies(&self) -> &'static [f32] {
        match self {
            Self::Info => &[440.0, 660.0],
            Self::Success => &[523.0, 659.0, 784.0],
            Self::Urgent => &[800.0, 600.0, 800.0, 600.0, 800.0],
        }
    }

    pub fn tones(&self) -> Vec<Tone> {
        self.frequencies()
            .iter()
            .zip(0u32..)
            .map(|(&frequency_hz, i)| Tone {
                frequency_hz,
                offset: TONE_SPACING * i,
                duration: TONE_DURATION,
            })
            .collect()
    }

    /// Wall-clock length of the whole cue.
    pub fn total_duration(&self) -> Duration {
        self.tones()
            .last()
            .map(|t| t.offset + t.duration)
            .unwrap_or_default()
    }

    /// Mix every tone of the cue into one buffer at [`SAMPLE_RATE`].
    pub fn render(&self) -> Vec<f32> {
        let mut out = vec![0.0f32; samples_for(self.total_duration())];
        for tone in self.tones() {
            let start = samples_for(tone.offset);
            let len = samples_for(tone.duration);
            for (i, slot) in out[start..].iter_mut().take(len).enumerate() {
                let t = i as f32 / SAMPLE_RATE as f32;
                let progress = i as f32 / len as f32;
                // Exponential ramp from START_GAIN to END_GAIN.
                let gain = START_GAIN * (END_GAIN / START_GAIN).powf(progress);
                *slot += (2.0 * PI * tone.frequency_hz * t).sin() * gain;
            }
        }
        out
    }
}

fn samples_for(d: Duration) -> usize {
    (d.as_secs_f64() * f64::from(SAMPLE_RATE)).round() as usize
}
