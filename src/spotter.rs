use anyhow::{bail, Context, Result};
use rustpotter::{Rustpotter, RustpotterConfig, SampleFormat};
use std::path::Path;

use crate::config::KeywordConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordEvent {
    Wake,
    Sleep,
}

/// Keyword-spotting collaborator. Exposes the sample rate and frame length
/// its private capture stream must be opened with.
pub trait KeywordSpotter: Send {
    fn sample_rate(&self) -> u32;
    fn frame_length(&self) -> usize;
    fn process(&mut self, frame: &[i16]) -> Option<KeywordEvent>;
}

const SPOTTER_SAMPLE_RATE: u32 = 16000;

const WAKE_KEY: &str = "wake";
const SLEEP_KEY: &str = "sleep";

/// Wake/sleep word detector using rustpotter.
///
/// Each keyword loads from a model file named `<word>.rpw` in the keywords
/// directory; a missing model is a fatal startup error.
pub struct RustpotterSpotter {
    detector: Rustpotter,
}

impl RustpotterSpotter {
    pub fn new(config: &KeywordConfig, keywords_dir: &Path) -> Result<Self> {
        let mut rp_config = RustpotterConfig::default();
        rp_config.fmt.sample_rate = SPOTTER_SAMPLE_RATE as usize;
        rp_config.fmt.channels = 1;
        rp_config.fmt.sample_format = SampleFormat::F32;
        rp_config.detector.threshold = config.spotter_threshold;

        let mut detector =
            Rustpotter::new(&rp_config).context("Failed to create rustpotter detector")?;

        for (key, word) in [(WAKE_KEY, &config.wake_word), (SLEEP_KEY, &config.sleep_word)] {
            let model_path = keywords_dir.join(format!("{}.rpw", word));
            if !model_path.exists() {
                bail!(
                    "Keyword model for '{}' not found: {}\n\
                     Train or download a rustpotter model for this word and place it there.",
                    word,
                    model_path.display()
                );
            }
            detector
                .add_wakeword_from_file(key, &model_path.to_string_lossy())
                .with_context(|| format!("Failed to load keyword model for '{}'", word))?;
        }

        println!("Keyword spotter loaded:");
        println!("  🎤 Wake word: '{}'", config.wake_word);
        println!("  💤 Sleep word: '{}'", config.sleep_word);

        Ok(RustpotterSpotter { detector })
    }
}

impl KeywordSpotter for RustpotterSpotter {
    fn sample_rate(&self) -> u32 {
        SPOTTER_SAMPLE_RATE
    }

    fn frame_length(&self) -> usize {
        self.detector.get_samples_per_frame()
    }

    fn process(&mut self, frame: &[i16]) -> Option<KeywordEvent> {
        let samples: Vec<f32> = frame.iter().map(|&s| s as f32 / 32768.0).collect();
        let detection = self.detector.process_f32(&samples)?;
        match detection.name.as_str() {
            WAKE_KEY => Some(KeywordEvent::Wake),
            SLEEP_KEY => Some(KeywordEvent::Sleep),
            _ => None,
        }
    }
}
