// Moteur audio - Callback CPAL temps-réel
//
// Le graphe partagé (stream de sortie, gain master, buffer de bruit) est
// construit une seule fois par session; toutes les timelines le partagent
// en lecture seule. Les frappes arrivent par un ring buffer lock-free sous
// forme de (voix, heure absolue en secondes); le callback convertit l'heure
// en index de sample et démarre la voix exactement dessus, quel que soit le
// jitter du thread de scheduling.
//
// Le format de sample du device est détecté via `sample_format()`; le
// rendu interne est mono f32, converti à l'écriture dans le buffer
// entrelacé (voir format_conversion).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use rand::Rng;
use ringbuf::traits::{Consumer, Producer};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

use crate::audio::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero, soft_clip};
use crate::audio::format_conversion::write_mono_to_interleaved_frame;
use crate::audio::parameters::AtomicF32;
use crate::audio::timing::{AudioClock, StreamClock};
use crate::messaging::channels::{CommandConsumer, CommandProducer, create_command_channel};
use crate::messaging::command::Command;
use crate::sequencer::scheduler::TriggerSink;
use crate::sequencer::transport::AudioOutput;
use crate::synth::voice::VoiceKind;
use crate::synth::voice_manager::VoiceManager;

/// Default master gain, matching a comfortable practice level.
const MASTER_GAIN: f32 = 0.7;

/// Shared white-noise buffer length, in seconds.
const NOISE_BUFFER_SECONDS: usize = 2;

/// Triggers in flight between the scheduler and the callback. A full
/// lookahead window holds a handful of steps; 256 is generous headroom.
const TRIGGER_RINGBUFFER_CAPACITY: usize = 256;

/// Triggers the callback may hold before their due sample.
const MAX_PENDING_TRIGGERS: usize = 64;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),
    #[error("output configuration query failed: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("building the output stream failed: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("starting the output stream failed: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("failed to spawn the scheduling driver: {0}")]
    Driver(#[from] std::io::Error),
}

pub struct AudioEngine {
    _device: Device,
    stream: Stream,
    sample_rate: f32,
    clock: StreamClock,
    trigger_tx: Arc<Mutex<CommandProducer>>,
    pub volume: AtomicF32,
}

impl AudioEngine {
    pub fn new() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        info!(
            device = %device.name().unwrap_or_else(|_| "inconnu".to_string()),
            sample_rate,
            channels,
            ?sample_format,
            "output device opened"
        );

        let (trigger_tx, trigger_rx) = create_command_channel(TRIGGER_RINGBUFFER_CAPACITY);
        let clock = StreamClock::new(sample_rate);
        let volume = AtomicF32::new(MASTER_GAIN);

        let noise_buffer = generate_noise_buffer(sample_rate);
        let voices = VoiceManager::new(sample_rate, noise_buffer);

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                trigger_rx,
                voices,
                clock.clone(),
                volume.clone(),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                trigger_rx,
                voices,
                clock.clone(),
                volume.clone(),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                trigger_rx,
                voices,
                clock.clone(),
                volume.clone(),
            ),
            other => return Err(EngineError::UnsupportedFormat(other)),
        }?;

        Ok(Self {
            _device: device,
            stream,
            sample_rate,
            clock,
            trigger_tx: Arc::new(Mutex::new(trigger_tx)),
            volume,
        })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut trigger_rx: CommandConsumer,
        mut voices: VoiceManager,
        clock: StreamClock,
        volume: AtomicF32,
    ) -> Result<Stream, EngineError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let mut smoother = OnePoleSmoother::new(MASTER_GAIN, 10.0, clock.sample_rate() as f32);
        let mut pending: Vec<(VoiceKind, u64)> = Vec::with_capacity(MAX_PENDING_TRIGGERS);

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // ===== Zone temps-réel: pas d'allocation, pas d'I/O =====

                while let Some(command) = trigger_rx.try_pop() {
                    match command {
                        Command::Trigger { voice, at_seconds } => {
                            if pending.len() < MAX_PENDING_TRIGGERS {
                                pending.push((voice, clock.seconds_to_samples(at_seconds)));
                            }
                        }
                    }
                }

                let mut position = clock.current_sample();
                for frame in data.chunks_mut(channels) {
                    // Strike every voice due on this exact sample. Late
                    // triggers (sound scheduled in the past) start now.
                    let mut i = 0;
                    while i < pending.len() {
                        if pending[i].1 <= position {
                            let (voice, _) = pending.swap_remove(i);
                            voices.strike(voice);
                        } else {
                            i += 1;
                        }
                    }

                    let mix = voices.render_sample();
                    let gain = smoother.process(volume.get());
                    let sample = soft_clip(flush_denormals_to_zero(mix) * gain);
                    write_mono_to_interleaved_frame(sample, frame);
                    position += 1;
                }

                clock.advance(data.len() / channels);
            },
            move |err| warn!("erreur du stream audio: {err}"),
            None,
        )?;

        Ok(stream)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn stream_clock(&self) -> StreamClock {
        self.clock.clone()
    }
}

impl AudioOutput for AudioEngine {
    fn resume(&self) -> Result<(), EngineError> {
        self.stream.play()?;
        Ok(())
    }

    fn clock(&self) -> Arc<dyn AudioClock> {
        Arc::new(self.clock.clone())
    }

    fn trigger_sink(&self) -> Box<dyn TriggerSink + Send> {
        Box::new(EngineSink {
            producer: Arc::clone(&self.trigger_tx),
        })
    }
}

/// Scheduler-side end of the trigger channel.
struct EngineSink {
    producer: Arc<Mutex<CommandProducer>>,
}

impl TriggerSink for EngineSink {
    fn trigger(&mut self, voice: VoiceKind, at_seconds: f64) {
        let command = Command::Trigger { voice, at_seconds };
        if self.producer.lock().unwrap().try_push(command).is_err() {
            warn!(?voice, at_seconds, "trigger channel full, strike dropped");
        }
    }
}

/// One shared buffer of white noise, built once per session. Every noise
/// voice (hi-hat, snare, crash) reads it at its own position.
fn generate_noise_buffer(sample_rate: f32) -> Arc<Vec<f32>> {
    let mut rng = rand::thread_rng();
    let length = sample_rate as usize * NOISE_BUFFER_SECONDS;
    Arc::new((0..length).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_buffer_shape() {
        let noise = generate_noise_buffer(48000.0);
        assert_eq!(noise.len(), 96000);
        assert!(noise.iter().all(|s| (-1.0..=1.0).contains(s)));
        // Actual noise, not silence
        assert!(noise.iter().any(|s| s.abs() > 0.5));
    }

    #[test]
    fn test_engine_sink_forwards_triggers() {
        let (tx, mut rx) = create_command_channel(4);
        let mut sink = EngineSink {
            producer: Arc::new(Mutex::new(tx)),
        };

        sink.trigger(VoiceKind::Kick, 1.5);

        match rx.try_pop() {
            Some(Command::Trigger { voice, at_seconds }) => {
                assert_eq!(voice, VoiceKind::Kick);
                assert_eq!(at_seconds, 1.5);
            }
            _ => panic!("expected a trigger command"),
        }
    }

    #[test]
    fn test_engine_sink_drops_when_full_without_panicking() {
        let (tx, _rx) = create_command_channel(1);
        let mut sink = EngineSink {
            producer: Arc::new(Mutex::new(tx)),
        };
        sink.trigger(VoiceKind::Kick, 0.0);
        sink.trigger(VoiceKind::Snare, 0.1);
    }
}
