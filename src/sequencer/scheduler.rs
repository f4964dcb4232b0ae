// Lookahead scheduler - Le cœur du timing hybride
//
// Un poll grossier (25 ms) décide QUELS pas engager; l'heure de frappe
// transmise à l'émetteur est une heure absolue de l'horloge audio,
// précise au sample et indépendante du jitter du poll. Chaque passe engage
// tous les pas dus dans la fenêtre `now + SCHEDULE_AHEAD_SECONDS`.

use std::time::Duration;

use crate::synth::voice::VoiceKind;

use super::controls::ExerciseControls;
use super::pattern::{ExerciseKind, evaluate_step};
use super::timeline::Timeline;

/// Driver poll period. Coarse on purpose: it only bounds how late a pass
/// can run, not the precision of the trigger times.
pub const LOOKAHEAD_POLL: Duration = Duration::from_millis(25);

/// Forward horizon within which due steps are committed.
pub const SCHEDULE_AHEAD_SECONDS: f64 = 0.12;

/// Margin added to the clock at start so the first step is never in the past.
pub const START_EPSILON_SECONDS: f64 = 0.05;

/// Receiver of absolute-time strike events.
///
/// The engine-backed sink crosses a lock-free channel to the audio
/// callback; tests collect into a `Vec`.
pub trait TriggerSink {
    fn trigger(&mut self, voice: VoiceKind, at_seconds: f64);
}

/// Collecting sink, for tests and offline inspection.
impl TriggerSink for Vec<(VoiceKind, f64)> {
    fn trigger(&mut self, voice: VoiceKind, at_seconds: f64) {
        self.push((voice, at_seconds));
    }
}

/// One scheduling pass over one timeline.
///
/// Commits every step whose trigger time falls before `now` plus the
/// lookahead window, advancing the step index and the next trigger time
/// after each. After a stall (late driver) the same loop catches up by
/// committing every overdue step in order: no index is ever skipped.
///
/// Tempo is sampled at commit time, so a change between two passes moves
/// only the deltas of steps not yet committed.
pub fn run_pass(
    timeline: &mut Timeline,
    kind: ExerciseKind,
    controls: &ExerciseControls,
    now: f64,
    sink: &mut dyn TriggerSink,
) {
    while timeline.next_trigger_time < now + SCHEDULE_AHEAD_SECONDS {
        let sampled = controls.sample();

        for trigger in evaluate_step(kind, timeline.current_step, &sampled, &mut timeline.accent) {
            sink.trigger(trigger.voice, timeline.next_trigger_time + trigger.offset_seconds);
        }

        timeline.next_trigger_time += sampled.tempo.step_duration();
        timeline.current_step += 1;
    }
}
