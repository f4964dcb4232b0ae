// Exercise controls - Réglages utilisateur échantillonnés en continu
//
// Le thread UI écrit, le thread driver lit à chaque évaluation de pas
// (jamais de snapshot figé au démarrage). Tout passe par des atomiques.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::audio::parameters::AtomicF32;

use super::timeline::Tempo;

/// Where the woodblock accent lands inside its beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccentPlacement {
    /// On the beat.
    Start,
    /// Eighth-note off-beat (half way through the beat).
    Binary,
    /// Triplet off-beat (two thirds through the beat).
    Ternary,
}

impl AccentPlacement {
    pub fn offset_seconds(&self, beat_duration: f64) -> f64 {
        match self {
            AccentPlacement::Start => 0.0,
            AccentPlacement::Binary => beat_duration / 2.0,
            AccentPlacement::Ternary => 2.0 * beat_duration / 3.0,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            AccentPlacement::Start => 0,
            AccentPlacement::Binary => 1,
            AccentPlacement::Ternary => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => AccentPlacement::Binary,
            2 => AccentPlacement::Ternary,
            _ => AccentPlacement::Start,
        }
    }
}

/// Accent settings, 0-indexed internally (the UI exposes beats 1-4).
#[derive(Debug, Clone, Copy)]
pub struct AccentConfig {
    /// Which beat of the measure carries the accent (0..=3).
    pub beat_selection: u8,
    /// Minimum number of measures between two accents (>= 1).
    pub interval_measures: u32,
    pub placement: AccentPlacement,
}

/// Live-sampled controls of one exercise.
pub struct ExerciseControls {
    tempo_bpm: AtomicF32,
    kick: AtomicBool,
    hihat: AtomicBool,
    snare: AtomicBool,
    crash: AtomicBool,
    /// Metronome exercise: the compound kick+hihat pulse.
    beat: AtomicBool,
    accent_beat: AtomicU8,
    accent_interval: AtomicU32,
    accent_placement: AtomicU8,
}

impl ExerciseControls {
    pub fn new() -> Self {
        Self {
            tempo_bpm: AtomicF32::new(Tempo::FALLBACK_BPM),
            kick: AtomicBool::new(true),
            hihat: AtomicBool::new(true),
            snare: AtomicBool::new(true),
            crash: AtomicBool::new(true),
            beat: AtomicBool::new(true),
            accent_beat: AtomicU8::new(0),
            accent_interval: AtomicU32::new(1),
            accent_placement: AtomicU8::new(AccentPlacement::Start.as_u8()),
        }
    }

    /// Invalid values are replaced by the fallback tempo, not rejected.
    pub fn set_tempo_bpm(&self, bpm: f32) {
        self.tempo_bpm.set(Tempo::new(bpm).bpm());
    }

    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.tempo_bpm.get())
    }

    pub fn set_kick_enabled(&self, enabled: bool) {
        self.kick.store(enabled, Ordering::Relaxed);
    }

    pub fn set_hihat_enabled(&self, enabled: bool) {
        self.hihat.store(enabled, Ordering::Relaxed);
    }

    pub fn set_snare_enabled(&self, enabled: bool) {
        self.snare.store(enabled, Ordering::Relaxed);
    }

    pub fn set_crash_enabled(&self, enabled: bool) {
        self.crash.store(enabled, Ordering::Relaxed);
    }

    pub fn set_beat_enabled(&self, enabled: bool) {
        self.beat.store(enabled, Ordering::Relaxed);
    }

    /// Beat carrying the accent, 0-indexed; clamped to the measure.
    pub fn set_accent_beat(&self, beat: u8) {
        self.accent_beat.store(beat.min(3), Ordering::Relaxed);
    }

    /// Recurrence interval in measures; floored to 1.
    pub fn set_accent_interval(&self, measures: u32) {
        self.accent_interval.store(measures.max(1), Ordering::Relaxed);
    }

    pub fn set_accent_placement(&self, placement: AccentPlacement) {
        self.accent_placement
            .store(placement.as_u8(), Ordering::Relaxed);
    }

    /// One coherent reading, taken once per step evaluation.
    pub fn sample(&self) -> ControlsSnapshot {
        ControlsSnapshot {
            tempo: self.tempo(),
            kick: self.kick.load(Ordering::Relaxed),
            hihat: self.hihat.load(Ordering::Relaxed),
            snare: self.snare.load(Ordering::Relaxed),
            crash: self.crash.load(Ordering::Relaxed),
            beat: self.beat.load(Ordering::Relaxed),
            accent: AccentConfig {
                beat_selection: self.accent_beat.load(Ordering::Relaxed),
                interval_measures: self.accent_interval.load(Ordering::Relaxed),
                placement: AccentPlacement::from_u8(self.accent_placement.load(Ordering::Relaxed)),
            },
        }
    }
}

impl Default for ExerciseControls {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of every control at one instant.
#[derive(Debug, Clone, Copy)]
pub struct ControlsSnapshot {
    pub tempo: Tempo,
    pub kick: bool,
    pub hihat: bool,
    pub snare: bool,
    pub crash: bool,
    pub beat: bool,
    pub accent: AccentConfig,
}
