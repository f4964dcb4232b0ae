// Timeline - Position de lecture et arithmétique de tempo
//
// Une timeline par exercice. Elle est créée une fois au setup et réutilisée
// à chaque cycle lecture/arrêt: seule la position et l'état d'accent sont
// réinitialisés au démarrage.

/// 16th-note grid: 4 steps per beat, 4 beats per measure.
pub const STEPS_PER_BEAT: u64 = 4;
pub const STEPS_PER_MEASURE: u64 = 16;

/// Tempo in beats per minute.
///
/// Invalid input (zero, negative, NaN) falls back to 120 BPM instead of
/// failing: tempo comes straight from a user-editable field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f32,
}

impl Tempo {
    pub const FALLBACK_BPM: f32 = 120.0;

    pub fn new(bpm: f32) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 {
            bpm
        } else {
            Self::FALLBACK_BPM
        };
        Self { bpm }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    /// Duration of one grid step (a 16th note).
    pub fn step_duration(&self) -> f64 {
        self.seconds_per_beat() / STEPS_PER_BEAT as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(Self::FALLBACK_BPM)
    }
}

/// Bookkeeping for the recurring metronome accent.
///
/// `last_accented_measure` is unset at every playback start; the pattern
/// evaluator seeds it on the first qualifying beat so the first eligible
/// measure fires without waiting out an interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccentState {
    pub last_accented_measure: Option<i64>,
}

/// Mutable playback position of one exercise.
#[derive(Debug)]
pub struct Timeline {
    /// Monotonically increasing while playing; reset to 0 on each start.
    pub current_step: u64,
    /// Absolute stream time (seconds) at which `current_step` is due.
    pub next_trigger_time: f64,
    /// True iff a scheduling driver is attached.
    pub is_playing: bool,
    pub accent: AccentState,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            current_step: 0,
            next_trigger_time: 0.0,
            is_playing: false,
            accent: AccentState::default(),
        }
    }

    /// Rewind to step 0 with the first trigger due at `first_trigger_time`.
    pub fn reset_for_start(&mut self, first_trigger_time: f64) {
        self.current_step = 0;
        self.next_trigger_time = first_trigger_time;
        self.accent = AccentState::default();
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_math() {
        let tempo = Tempo::new(120.0);
        assert_eq!(tempo.seconds_per_beat(), 0.5);
        assert_eq!(tempo.step_duration(), 0.125);

        let tempo = Tempo::new(60.0);
        assert_eq!(tempo.step_duration(), 0.25);
    }

    #[test]
    fn test_invalid_tempo_falls_back() {
        assert_eq!(Tempo::new(0.0).bpm(), Tempo::FALLBACK_BPM);
        assert_eq!(Tempo::new(-30.0).bpm(), Tempo::FALLBACK_BPM);
        assert_eq!(Tempo::new(f32::NAN).bpm(), Tempo::FALLBACK_BPM);
        assert_eq!(Tempo::new(f32::INFINITY).bpm(), Tempo::FALLBACK_BPM);
    }

    #[test]
    fn test_reset_for_start() {
        let mut timeline = Timeline::new();
        timeline.current_step = 123;
        timeline.accent.last_accented_measure = Some(7);

        timeline.reset_for_start(1.05);

        assert_eq!(timeline.current_step, 0);
        assert_eq!(timeline.next_trigger_time, 1.05);
        assert_eq!(timeline.accent.last_accented_measure, None);
    }
}
