use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::constants::pipeline::FRAME_PULL_TIMEOUT_MS;
use crate::frame_bus::Frame;
use crate::gate::Utterance;
use crate::mode::ModeController;

/// Bounded on-demand capture, independent of the wake/sleep mode.
///
/// One dedicated recorder thread serves every trigger; the session flag on
/// the mode controller enforces at most one live session, and a trigger that
/// arrives while one is running is dropped, not queued.
pub struct OneShotRecorder {
    trigger_tx: Sender<()>,
    mode: Arc<ModeController>,
}

impl OneShotRecorder {
    /// Spawn the recorder thread. `frames` is the one-shot side of the frame
    /// bus; finished buffers go to the gate tagged as one-shot.
    pub fn spawn(
        mode: Arc<ModeController>,
        frames: Receiver<Frame>,
        utterances: Sender<Utterance>,
        max_duration: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (trigger_tx, trigger_rx) = bounded::<()>(1);

        let worker_mode = mode.clone();
        let handle = thread::spawn(move || {
            record_loop(worker_mode, trigger_rx, frames, utterances, max_duration);
        });

        (OneShotRecorder { trigger_tx, mode }, handle)
    }

    /// Start a session. Safe to call from any thread at any time; returns
    /// true if this call claimed the session, false if one was already
    /// running (the call is then a no-op) or the recorder has shut down.
    pub fn trigger(&self) -> bool {
        if !self.mode.begin_one_shot() {
            println!("⏭️  One-time transcription already in progress");
            return false;
        }

        match self.trigger_tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                // Recorder gone or wedged; release the claim we just took.
                self.mode.end_one_shot();
                eprintln!("⚠️  One-shot recorder unavailable, dropping trigger");
                false
            }
        }
    }
}

fn record_loop(
    mode: Arc<ModeController>,
    trigger_rx: Receiver<()>,
    frames: Receiver<Frame>,
    utterances: Sender<Utterance>,
    max_duration: Duration,
) {
    let pull_timeout = Duration::from_millis(FRAME_PULL_TIMEOUT_MS);

    while trigger_rx.recv().is_ok() {
        println!("🎤 One-time transcription started...");

        // Leftovers from a prior session (deliver-then-ignore frames) must
        // not leak into this one.
        while frames.try_recv().is_ok() {}

        let start = Instant::now();
        let mut buffer: Vec<i16> = Vec::new();

        while start.elapsed() < max_duration {
            match frames.recv_timeout(pull_timeout) {
                Ok(frame) => buffer.extend_from_slice(frame.samples()),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        mode.end_one_shot();

        if buffer.is_empty() {
            println!("❌ No audio recorded for one-time transcription");
            continue;
        }

        if utterances.send(Utterance::one_shot(buffer)).is_err() {
            break;
        }
    }
}
