use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::constants::audio::BYTES_PER_SAMPLE;
use crate::constants::pipeline::FRAME_PULL_TIMEOUT_MS;
use crate::frame_bus::Frame;
use crate::gate::Utterance;
use crate::mode::ModeController;
use crate::vad::VoiceActivityDetector;

/// Utterance endpointing state machine.
///
/// Pure with respect to time: every call takes `now`, so the silence timeout
/// and the run loop can be exercised deterministically with a virtual clock.
/// The thread loop around it lives in [`Segmenter`].
pub struct SegmenterState {
    buffer: Vec<i16>,
    silence_since: Option<Instant>,
    frame_count: u64,
    silence_duration: Duration,
    max_buffer_bytes: usize,
    buffer_check_interval: u64,
}

impl SegmenterState {
    pub fn new(
        silence_duration: Duration,
        max_buffer_bytes: usize,
        buffer_check_interval: u64,
    ) -> Self {
        SegmenterState {
            buffer: Vec::new(),
            silence_since: None,
            frame_count: 0,
            silence_duration,
            max_buffer_bytes,
            buffer_check_interval,
        }
    }

    /// Feed one classified frame. Returns the finished utterance samples when
    /// this frame completes one (silence timeout or forced overflow flush).
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        is_speech: bool,
        now: Instant,
    ) -> Option<Vec<i16>> {
        if is_speech {
            self.buffer.extend_from_slice(frame.samples());
            self.silence_since = None;
            self.frame_count += 1;

            if self.frame_count % self.buffer_check_interval == 0 {
                println!(
                    "📦 Utterance buffer: {:.1}MB accumulated",
                    self.buffer_bytes() as f64 / (1024.0 * 1024.0)
                );
            }

            // The byte count is tracked continuously, so an overflow flush
            // happens on the very frame that crosses the ceiling - the buffer
            // never grows more than one frame past it.
            if self.buffer_bytes() > self.max_buffer_bytes {
                println!(
                    "⚠️  Buffer size ({:.1}MB) exceeded limit. Flushing current audio...",
                    self.buffer_bytes() as f64 / (1024.0 * 1024.0)
                );
                return Some(self.take_buffer());
            }

            return None;
        }

        if self.buffer.is_empty() {
            return None;
        }

        let silence_started = *self.silence_since.get_or_insert(now);
        if now.duration_since(silence_started) >= self.silence_duration {
            return Some(self.take_buffer());
        }

        None
    }

    /// Drop any in-progress utterance, e.g. on a transition to idle.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.silence_since = None;
        self.frame_count = 0;
    }

    pub fn buffer_bytes(&self) -> usize {
        self.buffer.len() * BYTES_PER_SAMPLE
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn take_buffer(&mut self) -> Vec<i16> {
        self.silence_since = None;
        self.frame_count = 0;
        std::mem::take(&mut self.buffer)
    }
}

/// Thread loop turning the gated live frame stream into discrete utterances.
pub struct Segmenter {
    frames: Receiver<Frame>,
    utterances: Sender<Utterance>,
    mode: Arc<ModeController>,
    vad: Box<dyn VoiceActivityDetector>,
    state: SegmenterState,
    sample_rate: u32,
}

impl Segmenter {
    pub fn new(
        frames: Receiver<Frame>,
        utterances: Sender<Utterance>,
        mode: Arc<ModeController>,
        vad: Box<dyn VoiceActivityDetector>,
        state: SegmenterState,
        sample_rate: u32,
    ) -> Self {
        Segmenter {
            frames,
            utterances,
            mode,
            vad,
            state,
            sample_rate,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    pub fn run(mut self) {
        let timeout = Duration::from_millis(FRAME_PULL_TIMEOUT_MS);

        loop {
            if !self.mode.is_listening() {
                if !self.state.is_empty() {
                    println!(
                        "🗑️  Abandoning in-progress utterance ({} bytes)",
                        self.state.buffer_bytes()
                    );
                }
                self.state.reset();

                // Discard anything captured while idle so stale audio never
                // leaks into the next utterance, then wait out the poll
                // interval for a wake.
                while self.frames.try_recv().is_ok() {}
                match self.frames.recv_timeout(timeout) {
                    Ok(_) | Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            match self.frames.recv_timeout(timeout) {
                Ok(frame) => {
                    let is_speech = self.vad.is_speech(frame.samples(), self.sample_rate);
                    if let Some(samples) =
                        self.state.process_frame(&frame, is_speech, Instant::now())
                    {
                        let utterance = Utterance::continuous(samples);
                        println!(
                            "🔊 Utterance complete ({:.1}s of speech)",
                            utterance.duration_secs(self.sample_rate)
                        );
                        if self.utterances.send(utterance).is_err() {
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: i16) -> Frame {
        Frame::new(vec![value; 480])
    }

    fn state(silence_ms: u64, max_bytes: usize) -> SegmenterState {
        SegmenterState::new(Duration::from_millis(silence_ms), max_bytes, 100)
    }

    #[test]
    fn speech_accumulates_without_flushing() {
        let mut state = state(1000, usize::MAX);
        let now = Instant::now();
        for i in 0..10 {
            let flushed = state.process_frame(
                &frame(1000),
                true,
                now + Duration::from_millis(i * 30),
            );
            assert!(flushed.is_none());
        }
        assert_eq!(state.buffer_bytes(), 10 * 480 * 2);
    }

    #[test]
    fn silence_with_empty_buffer_never_flushes() {
        let mut state = state(100, usize::MAX);
        let now = Instant::now();
        for i in 0..50 {
            let flushed =
                state.process_frame(&frame(0), false, now + Duration::from_millis(i * 30));
            assert!(flushed.is_none());
        }
        assert!(state.is_empty());
    }

    #[test]
    fn speech_resets_silence_timer() {
        let mut state = state(100, usize::MAX);
        let t0 = Instant::now();
        assert!(state.process_frame(&frame(1000), true, t0).is_none());
        // 90ms of silence, then speech again: the timer must restart
        assert!(state
            .process_frame(&frame(0), false, t0 + Duration::from_millis(30))
            .is_none());
        assert!(state
            .process_frame(&frame(1000), true, t0 + Duration::from_millis(60))
            .is_none());
        // Fresh silence run needs its own full 100ms
        assert!(state
            .process_frame(&frame(0), false, t0 + Duration::from_millis(90))
            .is_none());
        assert!(state
            .process_frame(&frame(0), false, t0 + Duration::from_millis(120))
            .is_none());
        let flushed = state.process_frame(&frame(0), false, t0 + Duration::from_millis(200));
        assert!(flushed.is_some());
    }

    #[test]
    fn overflow_flush_is_bounded_by_one_frame() {
        let frame_bytes = 480 * 2;
        let mut state = state(1000, 10 * frame_bytes);
        let now = Instant::now();

        let mut flushed_at = None;
        for i in 0..12 {
            if let Some(samples) =
                state.process_frame(&frame(1000), true, now + Duration::from_millis(i * 30))
            {
                flushed_at = Some((i, samples));
                break;
            }
        }

        // Ten frames fit exactly; the eleventh crosses the ceiling.
        let (i, samples) = flushed_at.expect("overflow flush never happened");
        assert_eq!(i, 10);
        assert_eq!(samples.len(), 11 * 480);
        assert!(state.is_empty());
    }

    #[test]
    fn reset_abandons_buffer_and_timer() {
        let mut state = state(100, usize::MAX);
        let t0 = Instant::now();
        state.process_frame(&frame(1000), true, t0);
        state.process_frame(&frame(0), false, t0 + Duration::from_millis(30));
        state.reset();
        assert!(state.is_empty());

        // After reset a silence run over the old timer's horizon is inert
        let flushed = state.process_frame(&frame(0), false, t0 + Duration::from_secs(5));
        assert!(flushed.is_none());
    }
}
