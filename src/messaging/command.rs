// Types de commandes - Communication scheduler → Audio

use crate::synth::voice::VoiceKind;

/// Commands consumed by the audio callback.
#[derive(Debug, Clone, Copy)]
pub enum Command {
    /// Strike `voice` at the absolute stream time `at_seconds`.
    ///
    /// The time is in the stream clock's domain; the callback converts it
    /// to a sample index and starts the voice on that exact sample.
    Trigger { voice: VoiceKind, at_seconds: f64 },
}
