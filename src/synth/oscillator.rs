// Oscillateurs - Composantes tonales des percussions

use std::f32::consts::PI;

/// Waveforms used by the percussion voices: sine for the kick body and
/// woodblock click, triangle for the snare tone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveformType {
    Sine,
    Triangle,
}

/// Phase-accumulator oscillator with per-sample retunable frequency.
///
/// The kick sweeps its pitch every sample, so `set_frequency` must be cheap
/// and must not reset the phase.
pub struct SimpleOscillator {
    waveform: WaveformType,
    phase: f32,
    phase_increment: f32,
    sample_rate: f32,
}

impl SimpleOscillator {
    pub fn new(waveform: WaveformType, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let sample = match self.waveform {
            WaveformType::Sine => (self.phase * 2.0 * PI).sin(),
            WaveformType::Triangle => {
                if self.phase < 0.5 {
                    (self.phase * 4.0) - 1.0
                } else {
                    3.0 - (self.phase * 4.0)
                }
            }
        };

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }

    #[inline]
    pub fn set_frequency(&mut self, freq: f32) {
        self.phase_increment = freq / self.sample_rate;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
