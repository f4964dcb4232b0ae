// Sequencer module - Grille de pas, scheduling lookahead et transport

pub mod controls;
pub mod pattern;
pub mod scheduler;
pub mod timeline;
pub mod transport;

pub use controls::{AccentConfig, AccentPlacement, ControlsSnapshot, ExerciseControls};
pub use pattern::{ExerciseKind, StepTrigger, evaluate_step};
pub use scheduler::{
    LOOKAHEAD_POLL, SCHEDULE_AHEAD_SECONDS, START_EPSILON_SECONDS, TriggerSink, run_pass,
};
pub use timeline::{AccentState, Tempo, Timeline};
pub use transport::{AudioOutput, Transport};
