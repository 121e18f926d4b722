use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;

use crate::constants::audio::BYTES_PER_SAMPLE;
use crate::mode::ModeController;

/// One fixed-duration block of mono 16-bit PCM. Immutable once produced;
/// clones share the underlying samples.
#[derive(Debug, Clone)]
pub struct Frame {
    samples: Arc<Vec<i16>>,
}

impl Frame {
    pub fn new(samples: Vec<i16>) -> Self {
        Frame {
            samples: Arc::new(samples),
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.samples.len() * BYTES_PER_SAMPLE
    }
}

/// Fans each captured frame out to the interested consumers without ever
/// blocking the producer.
///
/// The segmenter always receives a copy; the one-shot queue receives one only
/// while a session is recording. The session flag is a single atomic read, so
/// a frame can race a session that just ended - deliver-then-ignore is fine
/// because the recorder drains stale frames at the start of each session and
/// stops reading past its deadline.
pub struct FrameBus {
    segmenter_tx: Sender<Frame>,
    one_shot_tx: Sender<Frame>,
    mode: Arc<ModeController>,
}

impl FrameBus {
    pub fn new(
        segmenter_tx: Sender<Frame>,
        one_shot_tx: Sender<Frame>,
        mode: Arc<ModeController>,
    ) -> Self {
        FrameBus {
            segmenter_tx,
            one_shot_tx,
            mode,
        }
    }

    /// Non-blocking publish. A full consumer queue drops the frame for that
    /// consumer; it never raises and never stalls the capture callback.
    pub fn publish(&self, frame: Frame) {
        if self.mode.is_one_shot_recording() {
            match self.one_shot_tx.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    eprintln!("⚠️  One-shot queue full, dropping frame");
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }

        match self.segmenter_tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                eprintln!("⚠️  Segmenter queue full, dropping frame (consumer is behind)");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    fn make_frame() -> Frame {
        Frame::new(vec![100i16; 480])
    }

    #[test]
    fn frame_reports_byte_length() {
        let frame = make_frame();
        assert_eq!(frame.len(), 480);
        assert_eq!(frame.byte_len(), 960);
    }

    #[test]
    fn one_shot_queue_only_fed_while_recording() {
        let (seg_tx, seg_rx) = bounded(16);
        let (os_tx, os_rx) = bounded(16);
        let mode = Arc::new(ModeController::new(seg_rx.clone()));
        let bus = FrameBus::new(seg_tx, os_tx, mode.clone());

        bus.publish(make_frame());
        assert_eq!(seg_rx.len(), 1);
        assert!(os_rx.is_empty());

        assert!(mode.begin_one_shot());
        bus.publish(make_frame());
        assert_eq!(seg_rx.len(), 2);
        assert_eq!(os_rx.len(), 1);

        mode.end_one_shot();
        bus.publish(make_frame());
        assert_eq!(seg_rx.len(), 3);
        assert_eq!(os_rx.len(), 1);
    }

    #[test]
    fn full_segmenter_queue_drops_without_blocking() {
        let (seg_tx, seg_rx) = bounded(1);
        let (os_tx, _os_rx) = bounded(1);
        let mode = Arc::new(ModeController::new(seg_rx.clone()));
        let bus = FrameBus::new(seg_tx, os_tx, mode);

        bus.publish(make_frame());
        bus.publish(make_frame()); // dropped, must not block or panic
        assert_eq!(seg_rx.len(), 1);
    }

    #[test]
    fn draining_one_shot_queue_leaves_segmenter_queue_intact() {
        let (seg_tx, seg_rx) = bounded(16);
        let (os_tx, os_rx) = bounded(16);
        let mode = Arc::new(ModeController::new(seg_rx.clone()));
        let bus = FrameBus::new(seg_tx, os_tx, mode.clone());

        assert!(mode.begin_one_shot());
        for _ in 0..5 {
            bus.publish(make_frame());
        }

        while os_rx.try_recv().is_ok() {}
        assert_eq!(seg_rx.len(), 5);
    }
}
