// Transport - Contrôleur de lecture et exclusivité entre exercices
//
// Le transport possède les timelines, initialise le graphe audio partagé
// une seule fois (garde par présence, pas de verrou: un seul thread de
// contrôle), et attache/détache le driver périodique. Un seul exercice
// joue à la fois: démarrer l'un arrête d'abord tous les autres.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use ringbuf::traits::Producer;
use tracing::{debug, info, warn};

use crate::audio::engine::EngineError;
use crate::audio::timing::AudioClock;
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::Notification;

use super::controls::ExerciseControls;
use super::pattern::ExerciseKind;
use super::scheduler::{self, LOOKAHEAD_POLL, START_EPSILON_SECONDS, TriggerSink};
use super::timeline::Timeline;

pub const STATUS_PLAYING: &str = "Lecture en cours";
pub const STATUS_STOPPED: &str = "Arrêté";
pub const LABEL_STOP: &str = "Stop";
pub const LABEL_START: &str = "Démarrer";

/// What the transport needs from the audio layer: a resumable stream, its
/// clock, and a way to hand triggers to the emitter. `AudioEngine` is the
/// production implementation; tests plug in a fake.
pub trait AudioOutput {
    /// Resume the stream if suspended. Must succeed before any scheduling.
    fn resume(&self) -> Result<(), EngineError>;
    fn clock(&self) -> Arc<dyn AudioClock>;
    fn trigger_sink(&self) -> Box<dyn TriggerSink + Send>;
}

/// Factory for the lazily-created audio output.
pub type OutputFactory<O> = Box<dyn FnMut() -> Result<O, EngineError>>;

/// Active periodic driver of one timeline.
struct Driver {
    run: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

struct Exercise {
    kind: ExerciseKind,
    controls: Arc<ExerciseControls>,
    timeline: Arc<Mutex<Timeline>>,
    driver: Option<Driver>,
}

pub struct Transport<O: AudioOutput> {
    output: Option<O>,
    make_output: OutputFactory<O>,
    exercises: Vec<Exercise>,
    notifications: Arc<Mutex<NotificationProducer>>,
}

impl<O: AudioOutput> Transport<O> {
    pub fn new(make_output: OutputFactory<O>, notifications: NotificationProducer) -> Self {
        Self {
            output: None,
            make_output,
            exercises: Vec::new(),
            notifications: Arc::new(Mutex::new(notifications)),
        }
    }

    /// Register an exercise; returns its index. Timelines are created here
    /// once and reused across every play/stop cycle.
    pub fn add_exercise(&mut self, kind: ExerciseKind) -> usize {
        self.exercises.push(Exercise {
            kind,
            controls: Arc::new(ExerciseControls::new()),
            timeline: Arc::new(Mutex::new(Timeline::new())),
            driver: None,
        });
        self.exercises.len() - 1
    }

    pub fn exercise_count(&self) -> usize {
        self.exercises.len()
    }

    pub fn kind(&self, index: usize) -> ExerciseKind {
        self.exercises[index].kind
    }

    /// Live controls of an exercise; settable at any time, including
    /// mid-playback.
    pub fn controls(&self, index: usize) -> Arc<ExerciseControls> {
        Arc::clone(&self.exercises[index].controls)
    }

    pub fn is_playing(&self, index: usize) -> bool {
        self.exercises[index].timeline.lock().unwrap().is_playing
    }

    /// Start one exercise, stopping every other one first.
    ///
    /// On any failure (device creation, resume) nothing is left half-done:
    /// no driver is attached and `is_playing` stays false.
    pub fn start(&mut self, index: usize) -> Result<(), EngineError> {
        assert!(index < self.exercises.len(), "unknown exercise index");

        // Shared output graph: created at most once per session.
        let output = match self.output.take() {
            Some(output) => output,
            None => {
                info!("initialising shared audio output");
                (self.make_output)()?
            }
        };
        let resumed = output.resume();
        let clock = output.clock();
        let sink = output.trigger_sink();
        self.output = Some(output);
        resumed?;

        self.stop_all();

        let exercise = &mut self.exercises[index];
        {
            let mut timeline = exercise.timeline.lock().unwrap();
            timeline.reset_for_start(clock.now() + START_EPSILON_SECONDS);
            timeline.is_playing = true;
        }

        let run = Arc::new(AtomicBool::new(true));
        let driver = spawn_driver(
            index,
            exercise.kind,
            Arc::clone(&exercise.timeline),
            Arc::clone(&exercise.controls),
            clock,
            sink,
            Arc::clone(&run),
        );
        let handle = match driver {
            Ok(handle) => handle,
            Err(error) => {
                exercise.timeline.lock().unwrap().is_playing = false;
                return Err(EngineError::Driver(error));
            }
        };
        exercise.driver = Some(Driver { run, handle });

        info!(exercise = index, "playback started");
        self.notify(Notification::status(index, STATUS_PLAYING));
        self.notify(Notification::transport_label(index, LABEL_STOP));
        Ok(())
    }

    /// Stop one exercise. No-op when it is not playing.
    pub fn stop(&mut self, index: usize) {
        assert!(index < self.exercises.len(), "unknown exercise index");

        let exercise = &mut self.exercises[index];
        let Some(driver) = exercise.driver.take() else {
            return;
        };

        driver.run.store(false, Ordering::Relaxed);
        if driver.handle.join().is_err() {
            warn!(exercise = index, "driver thread panicked");
        }
        exercise.timeline.lock().unwrap().is_playing = false;

        info!(exercise = index, "playback stopped");
        self.notify(Notification::status(index, STATUS_STOPPED));
        self.notify(Notification::transport_label(index, LABEL_START));
    }

    /// Stop every exercise (before starting another, and on teardown).
    pub fn stop_all(&mut self) {
        for index in 0..self.exercises.len() {
            self.stop(index);
        }
    }

    /// Play/stop button behaviour.
    pub fn toggle(&mut self, index: usize) -> Result<(), EngineError> {
        if self.is_playing(index) {
            self.stop(index);
            Ok(())
        } else {
            self.start(index)
        }
    }

    fn notify(&self, notification: Notification) {
        let mut producer = self.notifications.lock().unwrap();
        if producer.try_push(notification).is_err() {
            debug!("notification channel full, dropping update");
        }
    }
}

impl<O: AudioOutput> Drop for Transport<O> {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_driver(
    index: usize,
    kind: ExerciseKind,
    timeline: Arc<Mutex<Timeline>>,
    controls: Arc<ExerciseControls>,
    clock: Arc<dyn AudioClock>,
    mut sink: Box<dyn TriggerSink + Send>,
    run: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("rythmo-driver-{index}"))
        .spawn(move || {
            while run.load(Ordering::Relaxed) {
                let now = clock.now();
                {
                    let mut timeline = timeline.lock().unwrap();
                    scheduler::run_pass(&mut timeline, kind, &controls, now, sink.as_mut());
                }
                thread::sleep(LOOKAHEAD_POLL);
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::timing::ManualClock;
    use crate::messaging::channels::create_notification_channel;
    use crate::synth::voice::VoiceKind;
    use std::sync::atomic::AtomicUsize;

    /// Audio output double: manual clock, shared recording sink.
    #[derive(Clone)]
    struct FakeOutput {
        clock: ManualClock,
        triggers: Arc<Mutex<Vec<(VoiceKind, f64)>>>,
        fail_resume: bool,
    }

    struct SharedSink(Arc<Mutex<Vec<(VoiceKind, f64)>>>);

    impl TriggerSink for SharedSink {
        fn trigger(&mut self, voice: VoiceKind, at_seconds: f64) {
            self.0.lock().unwrap().push((voice, at_seconds));
        }
    }

    impl AudioOutput for FakeOutput {
        fn resume(&self) -> Result<(), EngineError> {
            if self.fail_resume {
                Err(EngineError::NoOutputDevice)
            } else {
                Ok(())
            }
        }

        fn clock(&self) -> Arc<dyn AudioClock> {
            Arc::new(self.clock.clone())
        }

        fn trigger_sink(&self) -> Box<dyn TriggerSink + Send> {
            Box::new(SharedSink(Arc::clone(&self.triggers)))
        }
    }

    impl FakeOutput {
        fn new() -> Self {
            Self {
                clock: ManualClock::new(),
                triggers: Arc::new(Mutex::new(Vec::new())),
                fail_resume: false,
            }
        }
    }

    fn transport_with(output: FakeOutput) -> Transport<FakeOutput> {
        let (tx, _rx) = create_notification_channel(64);
        Transport::new(Box::new(move || Ok(output.clone())), tx)
    }

    #[test]
    fn test_starting_one_exercise_stops_the_other() {
        let mut transport = transport_with(FakeOutput::new());
        let a = transport.add_exercise(ExerciseKind::Noire);
        let b = transport.add_exercise(ExerciseKind::Metronome);

        transport.start(a).unwrap();
        assert!(transport.is_playing(a));
        assert!(!transport.is_playing(b));

        transport.start(b).unwrap();
        assert!(!transport.is_playing(a));
        assert!(transport.is_playing(b));

        transport.stop_all();
        assert!(!transport.is_playing(a));
        assert!(!transport.is_playing(b));
    }

    #[test]
    fn test_stop_when_stopped_is_a_noop() {
        let mut transport = transport_with(FakeOutput::new());
        let index = transport.add_exercise(ExerciseKind::Noire);

        transport.stop(index);
        transport.stop(index);
        assert!(!transport.is_playing(index));
    }

    #[test]
    fn test_output_created_once_across_restarts() {
        let created = Arc::new(AtomicUsize::new(0));
        let created_in_factory = Arc::clone(&created);
        let output = FakeOutput::new();
        let (tx, _rx) = create_notification_channel(64);
        let mut transport: Transport<FakeOutput> = Transport::new(
            Box::new(move || {
                created_in_factory.fetch_add(1, Ordering::SeqCst);
                Ok(output.clone())
            }),
            tx,
        );
        let index = transport.add_exercise(ExerciseKind::Noire);

        transport.start(index).unwrap();
        transport.stop(index);
        transport.start(index).unwrap();
        transport.stop(index);

        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_resume_leaves_no_partial_state() {
        let mut output = FakeOutput::new();
        output.fail_resume = true;
        let mut transport = transport_with(output);
        let index = transport.add_exercise(ExerciseKind::Noire);

        assert!(transport.start(index).is_err());
        assert!(!transport.is_playing(index));
    }

    #[test]
    fn test_start_resets_position_with_epsilon() {
        let output = FakeOutput::new();
        output.clock.set(10.0);
        let mut transport = transport_with(output.clone());
        let index = transport.add_exercise(ExerciseKind::Noire);

        transport.start(index).unwrap();
        // Give the driver one pass
        thread::sleep(std::time::Duration::from_millis(60));
        transport.stop(index);

        let triggers = output.triggers.lock().unwrap();
        assert!(!triggers.is_empty());
        // First committed step sits exactly at clock + epsilon
        let first = triggers
            .iter()
            .map(|(_, t)| *t)
            .fold(f64::MAX, f64::min);
        assert!((first - (10.0 + START_EPSILON_SECONDS)).abs() < 1e-9);
    }

    #[test]
    fn test_restart_rewinds_to_step_zero() {
        let output = FakeOutput::new();
        let mut transport = transport_with(output.clone());
        let index = transport.add_exercise(ExerciseKind::Metronome);

        transport.start(index).unwrap();
        thread::sleep(std::time::Duration::from_millis(60));
        transport.stop(index);

        // Move the clock well past the first run, then restart
        output.clock.set(100.0);
        output.triggers.lock().unwrap().clear();
        transport.start(index).unwrap();
        thread::sleep(std::time::Duration::from_millis(60));
        transport.stop(index);

        let triggers = output.triggers.lock().unwrap();
        // The accent fires again on the very first measure: state was reset
        assert!(
            triggers
                .iter()
                .any(|(v, t)| *v == VoiceKind::Woodblock
                    && (*t - (100.0 + START_EPSILON_SECONDS)).abs() < 1e-9)
        );
    }
}
