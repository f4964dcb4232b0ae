// Rythmo - Exercices rythmiques: scheduling lookahead et percussions synthétisées

pub mod audio;
pub mod messaging;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for the binary and integration tests
pub use audio::engine::{AudioEngine, EngineError};
pub use audio::timing::{AudioClock, ManualClock, StreamClock};
pub use messaging::channels::{create_command_channel, create_notification_channel};
pub use messaging::notification::Notification;
pub use sequencer::{
    AccentConfig, AccentPlacement, AccentState, ControlsSnapshot, ExerciseControls, ExerciseKind,
    LOOKAHEAD_POLL, SCHEDULE_AHEAD_SECONDS, START_EPSILON_SECONDS, StepTrigger, Tempo, Timeline,
    Transport, TriggerSink, evaluate_step, run_pass,
};
pub use sequencer::transport::AudioOutput;
pub use synth::voice::VoiceKind;
