// Step patterns - Quelles voix frappent sur un pas donné
//
// Deux exercices: "noire" (groove fixe sur la grille de doubles-croches)
// et "métronome" (pulsation + accent woodblock récurrent). L'évaluation ne
// lit aucune horloge: elle ne dépend que du numéro de pas, des réglages
// échantillonnés et de l'état d'accent.

use crate::synth::voice::VoiceKind;

use super::controls::{AccentConfig, ControlsSnapshot};
use super::timeline::{AccentState, STEPS_PER_BEAT, STEPS_PER_MEASURE, Tempo};

/// The two practice exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    /// Fixed groove: kick on quarters, hi-hat off-beats, snare every 6th
    /// step, crash on each measure start.
    Noire,
    /// Metronome pulse with a recurring accented beat.
    Metronome,
}

/// One voice to strike, `offset_seconds` after the step's trigger time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTrigger {
    pub voice: VoiceKind,
    pub offset_seconds: f64,
}

impl StepTrigger {
    fn on_step(voice: VoiceKind) -> Self {
        Self {
            voice,
            offset_seconds: 0.0,
        }
    }
}

/// Evaluate one step of an exercise.
///
/// `accent` is only touched by the metronome exercise; the noire exercise
/// leaves it untouched.
pub fn evaluate_step(
    kind: ExerciseKind,
    step: u64,
    controls: &ControlsSnapshot,
    accent: &mut AccentState,
) -> Vec<StepTrigger> {
    match kind {
        ExerciseKind::Noire => noire_step(step, controls),
        ExerciseKind::Metronome => metronome_step(step, controls, accent),
    }
}

fn noire_step(step: u64, controls: &ControlsSnapshot) -> Vec<StepTrigger> {
    let mut triggers = Vec::new();
    let position_in_measure = step % STEPS_PER_MEASURE;

    if controls.kick && step % STEPS_PER_BEAT == 0 {
        triggers.push(StepTrigger::on_step(VoiceKind::Kick));
    }

    if controls.hihat && (position_in_measure == 4 || position_in_measure == 12) {
        triggers.push(StepTrigger::on_step(VoiceKind::Hihat));
    }

    if controls.snare && step % 6 == 0 {
        triggers.push(StepTrigger::on_step(VoiceKind::Snare));
    }

    if controls.crash && position_in_measure == 0 {
        triggers.push(StepTrigger::on_step(VoiceKind::Crash));
    }

    triggers
}

fn metronome_step(
    step: u64,
    controls: &ControlsSnapshot,
    accent: &mut AccentState,
) -> Vec<StepTrigger> {
    let mut triggers = Vec::new();

    // The compound pulse: kick and hi-hat struck together on each quarter.
    if controls.beat && step % STEPS_PER_BEAT == 0 {
        triggers.push(StepTrigger::on_step(VoiceKind::Kick));
        triggers.push(StepTrigger::on_step(VoiceKind::Hihat));
    }

    if controls.snare && step % 6 == 0 {
        triggers.push(StepTrigger::on_step(VoiceKind::Snare));
    }

    if let Some(offset) = check_accent(step, &controls.accent, controls.tempo, accent) {
        triggers.push(StepTrigger {
            voice: VoiceKind::Woodblock,
            offset_seconds: offset,
        });
    }

    triggers
}

/// Decide whether the woodblock accent fires on this step, and commit the
/// bookkeeping when it does.
///
/// Only quarter-note boundaries are considered. The first time the selected
/// beat is checked after a start, the last-accented measure is seeded one
/// interval back so that measure fires immediately instead of waiting a
/// full interval.
fn check_accent(
    step: u64,
    config: &AccentConfig,
    tempo: Tempo,
    state: &mut AccentState,
) -> Option<f64> {
    if step % STEPS_PER_BEAT != 0 {
        return None;
    }

    let beat_in_measure = ((step % STEPS_PER_MEASURE) / STEPS_PER_BEAT) as u8;
    if beat_in_measure != config.beat_selection {
        return None;
    }

    let measure = (step / STEPS_PER_MEASURE) as i64;
    let interval = i64::from(config.interval_measures.max(1));
    let last = state
        .last_accented_measure
        .get_or_insert(measure - interval);

    if measure - *last < interval {
        return None;
    }

    *last = measure;
    Some(config.placement.offset_seconds(tempo.seconds_per_beat()))
}
