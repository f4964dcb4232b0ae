// Percussion voice - Une frappe en cours de rendu
//
// Chaque frappe combine au plus une composante tonale (oscillateur + gain)
// et une composante bruit (lecture du buffer partagé + filtre + gain).
// Tout est exponentiel: l'attaque est instantanée, la décroissance tombe
// vers un plancher de 0.001 puis la voix se libère.

use std::sync::Arc;

use super::envelope::ExpRamp;
use super::filter::OnePoleHighpass;
use super::oscillator::{SimpleOscillator, WaveformType};

/// Gain floor every decay ramp lands on before the voice frees itself.
const GAIN_FLOOR: f32 = 0.001;

/// The five percussion timbres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceKind {
    Kick,
    Hihat,
    Snare,
    Crash,
    Woodblock,
}

struct ToneComponent {
    oscillator: SimpleOscillator,
    gain: ExpRamp,
    /// Kick only: pitch falls 140 → 45 Hz while the gain decays.
    frequency_sweep: Option<ExpRamp>,
}

struct NoiseComponent {
    position: usize,
    gain: ExpRamp,
    highpass: Option<OnePoleHighpass>,
}

/// One voice of the pool. Reused across strikes, never reallocated.
pub struct PercussionVoice {
    sample_rate: f32,
    noise_buffer: Arc<Vec<f32>>,
    tone: Option<ToneComponent>,
    noise: Option<NoiseComponent>,
    samples_left: u32,
    age: u64,
}

impl PercussionVoice {
    pub fn new(sample_rate: f32, noise_buffer: Arc<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            noise_buffer,
            tone: None,
            noise: None,
            samples_left: 0,
            age: 0,
        }
    }

    /// Start rendering a strike of the given timbre.
    pub fn strike(&mut self, kind: VoiceKind, age: u64) {
        let sr = self.sample_rate;
        self.age = age;

        let (tone, noise, tail_seconds) = match kind {
            VoiceKind::Kick => (
                Some(ToneComponent {
                    oscillator: SimpleOscillator::new(WaveformType::Sine, sr),
                    gain: ExpRamp::new(1.0, GAIN_FLOOR, 0.15, sr),
                    frequency_sweep: Some(ExpRamp::new(140.0, 45.0, 0.12, sr)),
                }),
                None,
                0.16,
            ),
            VoiceKind::Hihat => (
                None,
                Some(NoiseComponent {
                    position: self.noise_start(),
                    gain: ExpRamp::new(0.3, GAIN_FLOOR, 0.05, sr),
                    highpass: Some(OnePoleHighpass::new(7000.0, sr)),
                }),
                0.06,
            ),
            VoiceKind::Snare => {
                let mut oscillator = SimpleOscillator::new(WaveformType::Triangle, sr);
                oscillator.set_frequency(220.0);
                (
                    Some(ToneComponent {
                        oscillator,
                        gain: ExpRamp::new(0.2, GAIN_FLOOR, 0.1, sr),
                        frequency_sweep: None,
                    }),
                    Some(NoiseComponent {
                        position: self.noise_start(),
                        gain: ExpRamp::new(0.45, GAIN_FLOOR, 0.12, sr),
                        highpass: None,
                    }),
                    0.13,
                )
            }
            VoiceKind::Crash => (
                None,
                Some(NoiseComponent {
                    position: self.noise_start(),
                    gain: ExpRamp::new(0.5, GAIN_FLOOR, 0.9, sr),
                    highpass: Some(OnePoleHighpass::new(6000.0, sr)),
                }),
                0.95,
            ),
            VoiceKind::Woodblock => {
                let mut oscillator = SimpleOscillator::new(WaveformType::Sine, sr);
                oscillator.set_frequency(1200.0);
                (
                    Some(ToneComponent {
                        oscillator,
                        gain: ExpRamp::new(0.6, GAIN_FLOOR, 0.05, sr),
                        frequency_sweep: None,
                    }),
                    None,
                    0.06,
                )
            }
        };

        self.tone = tone;
        self.noise = noise;
        self.samples_left = (tail_seconds * sr) as u32;
    }

    /// Stagger the noise read position so overlapping strikes decorrelate.
    fn noise_start(&self) -> usize {
        if self.noise_buffer.is_empty() {
            return 0;
        }
        (self.age.wrapping_mul(7919) % self.noise_buffer.len() as u64) as usize
    }

    /// Render one sample; returns 0.0 once the strike has finished.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.samples_left == 0 {
            return 0.0;
        }
        self.samples_left -= 1;
        if self.samples_left == 0 {
            self.tone = None;
            self.noise = None;
            return 0.0;
        }

        let mut sample = 0.0;

        if let Some(tone) = self.tone.as_mut() {
            if let Some(sweep) = tone.frequency_sweep.as_mut() {
                tone.oscillator.set_frequency(sweep.next());
            }
            sample += tone.oscillator.next_sample() * tone.gain.next();
        }

        if let Some(noise) = self.noise.as_mut() {
            let raw = self.noise_buffer[noise.position];
            noise.position = (noise.position + 1) % self.noise_buffer.len();
            let shaped = match noise.highpass.as_mut() {
                Some(hp) => hp.process(raw),
                None => raw,
            };
            sample += shaped * noise.gain.next();
        }

        sample
    }

    pub fn is_active(&self) -> bool {
        self.samples_left > 0
    }

    pub fn age(&self) -> u64 {
        self.age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;

    fn test_noise() -> Arc<Vec<f32>> {
        // deterministic "noise": alternating full-scale samples
        Arc::new((0..4800).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect())
    }

    #[test]
    fn test_voice_starts_inactive() {
        let voice = PercussionVoice::new(SAMPLE_RATE, test_noise());
        assert!(!voice.is_active());
    }

    #[test]
    fn test_strike_lifetimes() {
        for (kind, seconds) in [
            (VoiceKind::Kick, 0.16),
            (VoiceKind::Hihat, 0.06),
            (VoiceKind::Snare, 0.13),
            (VoiceKind::Crash, 0.95),
            (VoiceKind::Woodblock, 0.06),
        ] {
            let mut voice = PercussionVoice::new(SAMPLE_RATE, test_noise());
            voice.strike(kind, 1);
            assert!(voice.is_active());

            let expected = (seconds * SAMPLE_RATE) as u32;
            let mut rendered = 0;
            while voice.is_active() {
                voice.next_sample();
                rendered += 1;
                assert!(rendered <= expected + 1, "{kind:?} never ends");
            }
            assert_eq!(rendered, expected);
        }
    }

    #[test]
    fn test_strike_produces_sound_then_decays() {
        let mut voice = PercussionVoice::new(SAMPLE_RATE, test_noise());
        voice.strike(VoiceKind::Snare, 1);

        let mut early_energy = 0.0f32;
        for _ in 0..100 {
            early_energy += voice.next_sample().abs();
        }
        assert!(early_energy > 0.1);

        // Drain to just before the end: amplitude must be near the floor
        while voice.samples_left > 10 {
            voice.next_sample();
        }
        assert!(voice.next_sample().abs() < 0.01);
    }

    #[test]
    fn test_finished_voice_renders_silence() {
        let mut voice = PercussionVoice::new(SAMPLE_RATE, test_noise());
        voice.strike(VoiceKind::Hihat, 1);
        while voice.is_active() {
            voice.next_sample();
        }
        for _ in 0..100 {
            assert_eq!(voice.next_sample(), 0.0);
        }
    }

    #[test]
    fn test_samples_stay_bounded() {
        let mut voice = PercussionVoice::new(SAMPLE_RATE, test_noise());
        voice.strike(VoiceKind::Kick, 3);
        while voice.is_active() {
            let s = voice.next_sample();
            assert!(s.is_finite());
            assert!(s.abs() <= 1.5);
        }
    }
}
