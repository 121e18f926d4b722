use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use wake_scribe::audio::AudioCapture;
use wake_scribe::config::Config;
use wake_scribe::constants::queues::{
    ONE_SHOT_QUEUE_FRAMES, SEGMENTER_QUEUE_FRAMES, SPOTTER_QUEUE_FRAMES, UTTERANCE_QUEUE_DEPTH,
};
use wake_scribe::frame_bus::{Frame, FrameBus};
use wake_scribe::gate::TranscriptionGate;
use wake_scribe::hotkey::OneShotHotkey;
use wake_scribe::mode::{spawn_keyword_loop, ModeController};
use wake_scribe::model_download::ModelDownloader;
use wake_scribe::one_shot::OneShotRecorder;
use wake_scribe::output::{ClipboardPaste, OutputSink, StdoutSink};
use wake_scribe::segmenter::{Segmenter, SegmenterState};
use wake_scribe::spotter::{KeywordSpotter, RustpotterSpotter};
use wake_scribe::transcription::{SpeechToText, WhisperTranscriber};
use wake_scribe::vad::{EnergyVad, VoiceActivityDetector};

#[derive(Parser)]
#[command(name = "wake-scribe")]
#[command(about = "Wake-word gated voice-to-text pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a Whisper model
    DownloadModel {
        /// Model to download (e.g., base.en, tiny.en, small.en). If not specified, uses the configured model from settings.yaml
        model: Option<String>,
    },
    /// Feed a recorded WAV file through the segmentation core offline
    Replay {
        /// Path to a 16-bit mono WAV at the configured sample rate
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::DownloadModel { model }) => download_model_command(&model),
        Some(Commands::Replay { file }) => replay_command(&file),
        None => run_app(),
    }
}

fn download_model_command(model_name: &Option<String>) -> Result<()> {
    println!("Wake Scribe - Model Downloader");
    println!();

    // If no model specified, use the configured model
    let model_to_download = if let Some(name) = model_name {
        name.clone()
    } else {
        let config = Config::load_or_create()?;
        println!(
            "No model specified, using configured model: {}",
            config.transcription.model
        );
        println!();
        config.transcription.model
    };

    let models_dir = Config::models_dir()?;
    let downloader = ModelDownloader::new(models_dir.clone());

    println!("Available models:");
    for (name, size, desc) in ModelDownloader::list_available_models() {
        let marker = if name == model_to_download { "→" } else { " " };
        println!("  {} {} - {} ({})", marker, name, desc, size);
    }
    println!();

    println!("Models directory: {}", models_dir.display());
    println!();

    downloader.ensure_model_exists(&model_to_download)?;

    println!();
    println!("✓ Model setup complete!");

    Ok(())
}

/// Run a WAV recording through VAD segmentation and transcription with a
/// virtual clock, printing each finished utterance. Useful for tuning the
/// silence timeout and VAD aggressiveness against real recordings.
fn replay_command(path: &PathBuf) -> Result<()> {
    let config = Config::load_or_create()?;

    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();

    if spec.channels != 1 {
        anyhow::bail!("Replay expects mono audio, got {} channels", spec.channels);
    }
    if spec.sample_rate != config.audio.sample_rate {
        anyhow::bail!(
            "Replay expects {}Hz audio (configured sample rate), got {}Hz",
            config.audio.sample_rate,
            spec.sample_rate
        );
    }
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        anyhow::bail!("Replay expects 16-bit integer PCM");
    }

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<_, _>>()
        .context("Failed to read WAV samples")?;

    println!(
        "✓ Loaded {} samples ({:.2}s)",
        samples.len(),
        samples.len() as f64 / config.audio.sample_rate as f64
    );

    let mut engine = WhisperTranscriber::new(config.transcription.clone())?;
    let mut vad = EnergyVad::new(config.segmentation.vad_aggressiveness)?;
    let mut state = SegmenterState::new(
        config.segmentation.silence_duration(),
        config.segmentation.max_buffer_bytes(),
        config.segmentation.buffer_check_interval,
    );
    let mut sink = StdoutSink;

    let frame_samples = config.audio.frame_samples();
    let frame_duration = config.audio.frame_duration();
    let t0 = Instant::now();
    let mut tick = 0u32;
    let mut utterance_count = 0usize;

    let finish =
        |buffer: Vec<i16>, count: &mut usize, engine: &mut WhisperTranscriber, sink: &mut StdoutSink| {
            *count += 1;
            print!("📝 Utterance {}: ", count);
            match engine.transcribe(&buffer) {
                Ok(text) if !text.trim().is_empty() => {
                    let _ = sink.deliver(text.trim());
                }
                Ok(_) => println!("(no speech detected)"),
                Err(e) => eprintln!("❌ Error during transcription: {}", e),
            }
        };

    for chunk in samples.chunks_exact(frame_samples) {
        tick += 1;
        let frame = Frame::new(chunk.to_vec());
        let is_speech = vad.is_speech(frame.samples(), config.audio.sample_rate);
        let now = t0 + frame_duration * tick;
        if let Some(buffer) = state.process_frame(&frame, is_speech, now) {
            finish(buffer, &mut utterance_count, &mut engine, &mut sink);
        }
    }

    // Feed trailing virtual silence so a buffer still accumulating at the
    // end of the file gets its silence-timeout flush.
    if !state.is_empty() {
        let silence = Frame::new(vec![0i16; frame_samples]);
        let max_ticks =
            (config.segmentation.silence_duration().as_millis() / frame_duration.as_millis()) + 2;
        for _ in 0..=max_ticks {
            tick += 1;
            let now = t0 + frame_duration * tick;
            if let Some(buffer) = state.process_frame(&silence, false, now) {
                finish(buffer, &mut utterance_count, &mut engine, &mut sink);
                break;
            }
        }
    }

    println!();
    println!("✓ Replay complete: {} utterances", utterance_count);

    Ok(())
}

fn run_app() -> Result<()> {
    println!("Wake Scribe - wake-word gated voice-to-text");

    // Configuration failures are fatal here; nothing below runs on a
    // half-valid config.
    let config = Config::load_or_create()?;
    println!("Configuration loaded successfully");

    let engine = WhisperTranscriber::new(config.transcription.clone())?;
    let spotter = RustpotterSpotter::new(&config.keywords, &Config::keywords_dir()?)?;

    // Bounded queues for every cross-thread hop
    let (frame_tx, frame_rx) = bounded(SEGMENTER_QUEUE_FRAMES);
    let (one_shot_tx, one_shot_rx) = bounded(ONE_SHOT_QUEUE_FRAMES);
    let (spot_tx, spot_rx) = bounded(SPOTTER_QUEUE_FRAMES);
    let (utterance_tx, utterance_rx) = bounded(UTTERANCE_QUEUE_DEPTH);

    let mode = Arc::new(ModeController::new(frame_rx.clone()));

    let sink: Box<dyn OutputSink> = Box::new(ClipboardPaste::new());
    let gate = TranscriptionGate::new(
        utterance_rx,
        Box::new(engine) as Box<dyn SpeechToText>,
        sink,
        mode.clone(),
        &config.keywords.sleep_word,
        config.keywords.sleep_word_in_transcript,
    );
    let _gate_handle = gate.spawn();

    let vad: Box<dyn VoiceActivityDetector> =
        Box::new(EnergyVad::new(config.segmentation.vad_aggressiveness)?);
    let segmenter_state = SegmenterState::new(
        config.segmentation.silence_duration(),
        config.segmentation.max_buffer_bytes(),
        config.segmentation.buffer_check_interval,
    );
    let segmenter = Segmenter::new(
        frame_rx,
        utterance_tx.clone(),
        mode.clone(),
        vad,
        segmenter_state,
        config.audio.sample_rate,
    );
    let _segmenter_handle = segmenter.spawn();

    let (recorder, _recorder_handle) = OneShotRecorder::spawn(
        mode.clone(),
        one_shot_rx,
        utterance_tx,
        config.one_shot.max_duration(),
    );

    // The spotter listens on its own stream at its own required format
    let spotter_rate = spotter.sample_rate();
    let spotter_frame_len = spotter.frame_length();
    let mut spotter_capture = AudioCapture::new(spotter_rate)?;
    spotter_capture.start(spotter_frame_len, move |frame| {
        let _ = spot_tx.try_send(frame);
    })?;
    let _keyword_handle = spawn_keyword_loop(mode.clone(), Box::new(spotter), spot_rx);

    // Main capture stream fanned out by the bus
    let bus = FrameBus::new(frame_tx, one_shot_tx, mode.clone());
    let mut capture = AudioCapture::new(config.audio.sample_rate)?;
    capture.start(config.audio.frame_samples(), move |frame| {
        bus.publish(frame);
    })?;

    let hotkey = OneShotHotkey::try_new(&config.one_shot.hotkey);

    println!();
    println!("🔊 Voice system running");
    println!("🎤 Say '{}' to begin transcribing", config.keywords.wake_word);
    println!("💤 Say '{}' to stop transcribing", config.keywords.sleep_word);

    loop {
        if let Some(hotkey) = &hotkey {
            if hotkey.poll_pressed() {
                recorder.trigger();
            }
        }
        thread::sleep(Duration::from_millis(50));
    }
}
