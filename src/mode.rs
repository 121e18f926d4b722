use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::pipeline::FRAME_PULL_TIMEOUT_MS;
use crate::frame_bus::Frame;
use crate::spotter::{KeywordEvent, KeywordSpotter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Listening,
}

/// What caused a Listening -> Idle transition. The spotter hears the sleep
/// word live; the transcript path finds it in finished ASR text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepTrigger {
    Spotter,
    Transcript,
}

/// Shared pipeline state: the wake/sleep mode and the one-shot session flag.
///
/// Both flags are read from the capture callback's fan-out path and written
/// from consumer threads, so all updates go through atomic read-modify-write.
/// Sleeping also drains every frame still queued for the segmenter, so audio
/// spoken after the sleep signal never leaks into the next utterance.
pub struct ModeController {
    listening: AtomicBool,
    one_shot_recording: AtomicBool,
    // Cloned handle on the segmenter's frame queue, used only to discard.
    segmenter_frames: Receiver<Frame>,
}

impl ModeController {
    pub fn new(segmenter_frames: Receiver<Frame>) -> Self {
        ModeController {
            listening: AtomicBool::new(false),
            one_shot_recording: AtomicBool::new(false),
            segmenter_frames,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.listening.load(Ordering::SeqCst) {
            Mode::Listening
        } else {
            Mode::Idle
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Idle -> Listening. Returns false (no-op) if already listening.
    pub fn wake(&self) -> bool {
        if self.listening.swap(true, Ordering::SeqCst) {
            return false;
        }
        println!("✅ Wake word detected! Now transcribing...");
        true
    }

    /// Listening -> Idle, discarding all frames queued for the segmenter.
    /// Returns false (no-op) if already idle.
    pub fn sleep(&self, trigger: SleepTrigger) -> bool {
        if !self.listening.swap(false, Ordering::SeqCst) {
            return false;
        }
        let cleared = self.drain_segmenter_queue();
        match trigger {
            SleepTrigger::Spotter => {
                println!("💤 Sleep word detected! Stopping transcription... ({} queued frames cleared)", cleared);
            }
            SleepTrigger::Transcript => {
                println!("💤 Sleep word detected in transcription! Stopping... ({} queued frames cleared)", cleared);
            }
        }
        true
    }

    pub fn is_one_shot_recording(&self) -> bool {
        self.one_shot_recording.load(Ordering::SeqCst)
    }

    /// Claim the one-shot session. At most one caller wins until
    /// `end_one_shot`; every other caller gets false.
    pub fn begin_one_shot(&self) -> bool {
        self.one_shot_recording
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_one_shot(&self) {
        self.one_shot_recording.store(false, Ordering::SeqCst);
    }

    fn drain_segmenter_queue(&self) -> usize {
        let mut cleared = 0;
        while self.segmenter_frames.try_recv().is_ok() {
            cleared += 1;
        }
        cleared
    }

    /// Number of frames currently queued for the segmenter
    pub fn segmenter_queue_len(&self) -> usize {
        self.segmenter_frames.len()
    }
}

/// Run the keyword spotter over its private frame stream, applying wake and
/// sleep events to the shared mode. Exits when the stream disconnects.
pub fn spawn_keyword_loop(
    mode: Arc<ModeController>,
    mut spotter: Box<dyn KeywordSpotter>,
    frames: Receiver<Frame>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let timeout = Duration::from_millis(FRAME_PULL_TIMEOUT_MS);
        loop {
            match frames.recv_timeout(timeout) {
                Ok(frame) => match spotter.process(frame.samples()) {
                    Some(KeywordEvent::Wake) => {
                        mode.wake();
                    }
                    Some(KeywordEvent::Sleep) => {
                        mode.sleep(SleepTrigger::Spotter);
                    }
                    None => {}
                },
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}
