use anyhow::{bail, Result};

/// Voice-activity classifier collaborator. Stateless from the caller's
/// perspective per call; aggressiveness is fixed at construction.
pub trait VoiceActivityDetector: Send {
    fn is_speech(&mut self, frame: &[i16], sample_rate: u32) -> bool;
}

/// RMS-energy voice activity detection.
///
/// Aggressiveness 0..=3 selects how readily a frame is declared silence:
/// higher settings need more energy before a frame counts as speech.
pub struct EnergyVad {
    threshold: f32,
}

impl EnergyVad {
    pub fn new(aggressiveness: u8) -> Result<Self> {
        let threshold = match aggressiveness {
            0 => 0.010,
            1 => 0.016,
            2 => 0.025,
            3 => 0.040,
            _ => bail!("VAD aggressiveness must be in 0..=3, got {}", aggressiveness),
        };
        Ok(EnergyVad { threshold })
    }

    fn rms(frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = frame
            .iter()
            .map(|&s| {
                let x = s as f32 / 32768.0;
                x * x
            })
            .sum();
        (sum_squares / frame.len() as f32).sqrt()
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn is_speech(&mut self, frame: &[i16], _sample_rate: u32) -> bool {
        Self::rms(frame) >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_not_speech() {
        let mut vad = EnergyVad::new(2).unwrap();
        assert!(!vad.is_speech(&vec![0i16; 480], 16000));
        assert!(!vad.is_speech(&vec![50i16; 480], 16000));
    }

    #[test]
    fn loud_frame_is_speech() {
        let mut vad = EnergyVad::new(2).unwrap();
        assert!(vad.is_speech(&vec![3000i16; 480], 16000));
    }

    #[test]
    fn higher_aggressiveness_needs_more_energy() {
        // A frame just above the relaxed threshold but below the strict one
        let frame = vec![400i16; 480]; // RMS ~0.012
        let mut relaxed = EnergyVad::new(0).unwrap();
        let mut strict = EnergyVad::new(3).unwrap();
        assert!(relaxed.is_speech(&frame, 16000));
        assert!(!strict.is_speech(&frame, 16000));
    }

    #[test]
    fn empty_frame_is_silence() {
        let mut vad = EnergyVad::new(0).unwrap();
        assert!(!vad.is_speech(&[], 16000));
    }

    #[test]
    fn rejects_out_of_range_aggressiveness() {
        assert!(EnergyVad::new(4).is_err());
    }
}
