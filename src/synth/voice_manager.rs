// Voice Manager - Pool fixe de voix de percussion
//
// Pré-alloué à la création du stream; le callback ne fait que frapper et
// mixer. Si toutes les voix sont occupées, la plus ancienne est volée
// (sa queue est coupée, le moins audible des compromis).

use std::sync::Arc;

use super::voice::{PercussionVoice, VoiceKind};

const MAX_VOICES: usize = 16;

pub struct VoiceManager {
    voices: Vec<PercussionVoice>,
    /// Incremented on each strike; orders voices for stealing.
    age_counter: u64,
}

impl VoiceManager {
    pub fn new(sample_rate: f32, noise_buffer: Arc<Vec<f32>>) -> Self {
        let voices = (0..MAX_VOICES)
            .map(|_| PercussionVoice::new(sample_rate, Arc::clone(&noise_buffer)))
            .collect();

        Self {
            voices,
            age_counter: 0,
        }
    }

    /// Start a strike on a free voice, stealing the oldest if none is free.
    pub fn strike(&mut self, kind: VoiceKind) {
        self.age_counter = self.age_counter.wrapping_add(1);
        let age = self.age_counter;

        if let Some(voice) = self.voices.iter_mut().find(|v| !v.is_active()) {
            voice.strike(kind, age);
            return;
        }

        let victim = self.find_voice_to_steal();
        self.voices[victim].strike(kind, age);
    }

    fn find_voice_to_steal(&self) -> usize {
        let mut best_index = 0;
        let mut best_age = u64::MAX;

        for (i, voice) in self.voices.iter().enumerate() {
            if voice.age() < best_age {
                best_age = voice.age();
                best_index = i;
            }
        }

        best_index
    }

    /// Mix one sample from every active voice.
    #[inline]
    pub fn render_sample(&mut self) -> f32 {
        let mut mix = 0.0;
        for voice in self.voices.iter_mut() {
            if voice.is_active() {
                mix += voice.next_sample();
            }
        }
        mix
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }
}
