use ringbuf::traits::Consumer;
use rythmo::{
    AccentPlacement, AudioEngine, ExerciseKind, Notification, Transport,
    create_notification_channel,
};
use std::time::Duration;

// Status updates are tiny and drained every 100 ms; 64 slots is plenty.
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 64;

struct Options {
    exercise: ExerciseKind,
    bpm: f32,
    duration_seconds: u64,
    accent_beat: u8,
    accent_interval: u32,
    placement: AccentPlacement,
    disabled_voices: Vec<String>,
}

fn print_usage() {
    println!("Usage: rythmo [noire|metronome] [options]");
    println!();
    println!("Options:");
    println!("  --bpm N             tempo (défaut 120, valeur invalide → 120)");
    println!("  --duration N        durée de lecture en secondes (défaut 20)");
    println!("  --beat N            temps accentué, 1 à 4 (métronome, défaut 1)");
    println!("  --interval N        accent toutes les N mesures (défaut 1)");
    println!("  --placement MODE    start | binary | ternary (défaut start)");
    println!("  --no-VOICE          coupe une voix: kick, hihat, snare, crash, beat");
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        exercise: ExerciseKind::Noire,
        bpm: 120.0,
        duration_seconds: 20,
        accent_beat: 0,
        accent_interval: 1,
        placement: AccentPlacement::Start,
        disabled_voices: Vec::new(),
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "noire" => options.exercise = ExerciseKind::Noire,
            "metronome" => options.exercise = ExerciseKind::Metronome,
            "--bpm" => {
                let value = args.next().ok_or("--bpm requiert une valeur")?;
                // Invalid input falls back to 120, like an empty tempo field
                options.bpm = value.parse().unwrap_or(120.0);
            }
            "--duration" => {
                let value = args.next().ok_or("--duration requiert une valeur")?;
                options.duration_seconds =
                    value.parse().map_err(|_| format!("durée invalide: {value}"))?;
            }
            "--beat" => {
                let value = args.next().ok_or("--beat requiert une valeur")?;
                let beat: u8 = value.parse().map_err(|_| format!("temps invalide: {value}"))?;
                if !(1..=4).contains(&beat) {
                    return Err(format!("--beat doit être entre 1 et 4, reçu {beat}"));
                }
                // 1-indexed at the CLI, 0-indexed internally
                options.accent_beat = beat - 1;
            }
            "--interval" => {
                let value = args.next().ok_or("--interval requiert une valeur")?;
                options.accent_interval = value
                    .parse()
                    .map_err(|_| format!("intervalle invalide: {value}"))?;
            }
            "--placement" => {
                let value = args.next().ok_or("--placement requiert une valeur")?;
                options.placement = match value.as_str() {
                    "start" => AccentPlacement::Start,
                    "binary" => AccentPlacement::Binary,
                    "ternary" => AccentPlacement::Ternary,
                    other => return Err(format!("placement inconnu: {other}")),
                };
            }
            other if other.starts_with("--no-") => {
                options.disabled_voices.push(other[5..].to_string());
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("argument inconnu: {other}")),
        }
    }

    Ok(options)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = match parse_options() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Erreur: {message}\n");
            print_usage();
            std::process::exit(2);
        }
    };

    println!("=== Rythmo ===\n");

    let (notification_tx, mut notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);

    let mut transport = Transport::new(Box::new(AudioEngine::new), notification_tx);
    let noire = transport.add_exercise(ExerciseKind::Noire);
    let metronome = transport.add_exercise(ExerciseKind::Metronome);
    let selected = match options.exercise {
        ExerciseKind::Noire => noire,
        ExerciseKind::Metronome => metronome,
    };

    let controls = transport.controls(selected);
    controls.set_tempo_bpm(options.bpm);
    controls.set_accent_beat(options.accent_beat);
    controls.set_accent_interval(options.accent_interval);
    controls.set_accent_placement(options.placement);
    for voice in &options.disabled_voices {
        match voice.as_str() {
            "kick" => controls.set_kick_enabled(false),
            "hihat" => controls.set_hihat_enabled(false),
            "snare" => controls.set_snare_enabled(false),
            "crash" => controls.set_crash_enabled(false),
            "beat" => controls.set_beat_enabled(false),
            other => eprintln!("voix inconnue ignorée: {other}"),
        }
    }

    if let Err(error) = transport.start(selected) {
        eprintln!("Impossible de démarrer la lecture: {error}");
        std::process::exit(1);
    }

    let ticks = options.duration_seconds * 10;
    for _ in 0..ticks {
        while let Some(notification) = notification_rx.try_pop() {
            print_notification(&notification);
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    transport.stop_all();
    while let Some(notification) = notification_rx.try_pop() {
        print_notification(&notification);
    }
}

fn print_notification(notification: &Notification) {
    match notification {
        Notification::Status { exercise, text } => {
            println!("[exercice {}] {}", exercise + 1, text);
        }
        Notification::TransportLabel { exercise, text } => {
            println!("[exercice {}] bouton: {}", exercise + 1, text);
        }
    }
}
