// End-to-end wiring tests: capture-side fan-out, mode gating, one-shot
// arbitration, and the transcription gate, with mock collaborators standing
// in for the ASR engine and the clipboard sink. Real threads and short real
// timeouts throughout.

use anyhow::Result;
use crossbeam_channel::bounded;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use wake_scribe::frame_bus::{Frame, FrameBus};
use wake_scribe::gate::{Origin, TranscriptionGate, Utterance};
use wake_scribe::mode::ModeController;
use wake_scribe::one_shot::OneShotRecorder;
use wake_scribe::output::OutputSink;
use wake_scribe::segmenter::{Segmenter, SegmenterState};
use wake_scribe::transcription::SpeechToText;
use wake_scribe::vad::EnergyVad;

const FRAME_SAMPLES: usize = 480;

fn speech_frame() -> Frame {
    Frame::new(vec![3000i16; FRAME_SAMPLES])
}

fn silence_frame() -> Frame {
    Frame::new(vec![0i16; FRAME_SAMPLES])
}

/// ASR stand-in: returns a fixed text and records the sample counts it saw.
struct FixedEngine {
    text: String,
    seen_lengths: Arc<Mutex<Vec<usize>>>,
}

impl SpeechToText for FixedEngine {
    fn transcribe(&mut self, samples: &[i16]) -> Result<String> {
        self.seen_lengths.lock().unwrap().push(samples.len());
        Ok(self.text.clone())
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    delivered: Arc<Mutex<Vec<String>>>,
}

impl OutputSink for RecordingSink {
    fn deliver(&mut self, text: &str) -> Result<()> {
        self.delivered.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct Pipeline {
    bus: FrameBus,
    mode: Arc<ModeController>,
    recorder: OneShotRecorder,
    seen_lengths: Arc<Mutex<Vec<usize>>>,
    delivered: Arc<Mutex<Vec<String>>>,
}

/// Wire up the full pipeline with a 150ms silence timeout, a 200ms one-shot
/// window, and the given canned transcript.
fn build_pipeline(transcript: &str) -> Pipeline {
    let (frame_tx, frame_rx) = bounded(256);
    let (one_shot_tx, one_shot_rx) = bounded(256);
    let (utterance_tx, utterance_rx) = bounded(4);

    let mode = Arc::new(ModeController::new(frame_rx.clone()));
    let bus = FrameBus::new(frame_tx, one_shot_tx, mode.clone());

    let seen_lengths = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink::default();
    let delivered = sink.delivered.clone();

    let gate = TranscriptionGate::new(
        utterance_rx,
        Box::new(FixedEngine {
            text: transcript.to_string(),
            seen_lengths: seen_lengths.clone(),
        }),
        Box::new(sink),
        mode.clone(),
        "terminator",
        true,
    );
    gate.spawn();

    let segmenter = Segmenter::new(
        frame_rx,
        utterance_tx.clone(),
        mode.clone(),
        Box::new(EnergyVad::new(2).unwrap()),
        SegmenterState::new(Duration::from_millis(150), usize::MAX, 100),
        16000,
    );
    segmenter.spawn();

    let (recorder, _handle) = OneShotRecorder::spawn(
        mode.clone(),
        one_shot_rx,
        utterance_tx,
        Duration::from_millis(200),
    );

    Pipeline {
        bus,
        mode,
        recorder,
        seen_lengths,
        delivered,
    }
}

fn wait_for<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn idle_segmenter_never_accumulates_audio() {
    let pipeline = build_pipeline("should never appear");

    for _ in 0..20 {
        pipeline.bus.publish(speech_frame());
        thread::sleep(Duration::from_millis(5));
    }

    // The idle segmenter drains and discards; nothing reaches the engine
    assert!(wait_for(Duration::from_secs(1), || {
        pipeline.mode.segmenter_queue_len() == 0
    }));
    thread::sleep(Duration::from_millis(200));
    assert!(pipeline.seen_lengths.lock().unwrap().is_empty());
    assert!(pipeline.delivered.lock().unwrap().is_empty());
}

#[test]
fn listening_pipeline_segments_and_delivers_an_utterance() {
    let pipeline = build_pipeline("hello world");
    pipeline.mode.wake();
    // Give the segmenter one full poll interval to observe the wake before
    // audio starts, so its idle drain cannot swallow the first frame
    thread::sleep(Duration::from_millis(150));

    for _ in 0..5 {
        pipeline.bus.publish(speech_frame());
        thread::sleep(Duration::from_millis(10));
    }
    // Keep silence flowing past the 150ms timeout
    for _ in 0..30 {
        pipeline.bus.publish(silence_frame());
        thread::sleep(Duration::from_millis(15));
    }

    assert!(wait_for(Duration::from_secs(2), || {
        !pipeline.delivered.lock().unwrap().is_empty()
    }));

    assert_eq!(
        pipeline.delivered.lock().unwrap().as_slice(),
        ["hello world"]
    );
    // Only the speech frames were buffered; silence is never appended
    assert_eq!(
        pipeline.seen_lengths.lock().unwrap().as_slice(),
        [5 * FRAME_SAMPLES]
    );
}

#[test]
fn transcript_sleep_word_stops_listening_but_still_delivers() {
    let pipeline = build_pipeline("let's stop now terminator please");
    pipeline.mode.wake();
    thread::sleep(Duration::from_millis(150));

    for _ in 0..5 {
        pipeline.bus.publish(speech_frame());
        thread::sleep(Duration::from_millis(10));
    }
    for _ in 0..30 {
        pipeline.bus.publish(silence_frame());
        thread::sleep(Duration::from_millis(15));
    }

    assert!(wait_for(Duration::from_secs(2), || {
        !pipeline.delivered.lock().unwrap().is_empty()
    }));

    // The sleep word flipped the mode, and the final text was still delivered
    assert!(!pipeline.mode.is_listening());
    assert_eq!(
        pipeline.delivered.lock().unwrap().as_slice(),
        ["let's stop now terminator please"]
    );
    // The queue was cleared as part of the transition; frames published
    // after it are drained by the now-idle segmenter
    assert!(wait_for(Duration::from_secs(1), || {
        pipeline.mode.segmenter_queue_len() == 0
    }));
}

#[test]
fn one_shot_records_while_idle_and_ignores_a_second_trigger() {
    let pipeline = build_pipeline("one shot text");
    assert!(!pipeline.mode.is_listening());

    assert!(pipeline.recorder.trigger());
    assert!(!pipeline.recorder.trigger()); // within 50ms: dropped, not queued

    let start = Instant::now();
    while pipeline.mode.is_one_shot_recording() && start.elapsed() < Duration::from_secs(2) {
        pipeline.bus.publish(speech_frame());
        thread::sleep(Duration::from_millis(10));
    }
    assert!(!pipeline.mode.is_one_shot_recording());

    assert!(wait_for(Duration::from_secs(2), || {
        !pipeline.delivered.lock().unwrap().is_empty()
    }));

    // Exactly one delivery: the second trigger never started a session
    thread::sleep(Duration::from_millis(300));
    assert_eq!(
        pipeline.delivered.lock().unwrap().as_slice(),
        ["one shot text"]
    );
    // One-shot transcripts never wake or sleep the continuous mode
    assert!(!pipeline.mode.is_listening());
}

#[test]
fn one_shot_utterance_is_tagged_and_isolated_from_segmenter_queue() {
    // Narrow wiring without the gate so the utterance itself is observable
    let (frame_tx, frame_rx) = bounded(64);
    let (one_shot_tx, one_shot_rx) = bounded(64);
    let (utterance_tx, utterance_rx) = bounded::<Utterance>(4);

    let mode = Arc::new(ModeController::new(frame_rx.clone()));
    let bus = FrameBus::new(frame_tx, one_shot_tx, mode.clone());
    let (recorder, _handle) = OneShotRecorder::spawn(
        mode.clone(),
        one_shot_rx,
        utterance_tx,
        Duration::from_millis(200),
    );

    assert!(recorder.trigger());
    for _ in 0..8 {
        bus.publish(speech_frame());
        thread::sleep(Duration::from_millis(15));
    }

    let utterance = utterance_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("one-shot utterance never arrived");
    assert_eq!(utterance.origin, Origin::OneShot);
    assert!(!utterance.samples.is_empty());

    // The main segmentation queue kept every frame (no segmenter is draining
    // it here): one-shot consumption removed nothing from it.
    assert_eq!(mode.segmenter_queue_len(), 8);
}
