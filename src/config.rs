use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub one_shot: OneShotConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_frame_ms() -> u64 {
    30
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl AudioConfig {
    /// Samples per frame at the configured rate and duration
    pub fn frame_samples(&self) -> usize {
        (self.sample_rate as u64 * self.frame_ms / 1000) as usize
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationConfig {
    #[serde(default = "default_vad_aggressiveness")]
    pub vad_aggressiveness: u8,
    #[serde(default = "default_silence_duration")]
    pub silence_duration_sec: f64,
    #[serde(default = "default_max_buffer_mb")]
    pub max_buffer_mb: usize,
    #[serde(default = "default_buffer_check_interval")]
    pub buffer_check_interval: u64,
}

fn default_vad_aggressiveness() -> u8 {
    2
}

fn default_silence_duration() -> f64 {
    1.0
}

fn default_max_buffer_mb() -> usize {
    50
}

fn default_buffer_check_interval() -> u64 {
    100
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        SegmentationConfig {
            vad_aggressiveness: default_vad_aggressiveness(),
            silence_duration_sec: default_silence_duration(),
            max_buffer_mb: default_max_buffer_mb(),
            buffer_check_interval: default_buffer_check_interval(),
        }
    }
}

impl SegmentationConfig {
    pub fn silence_duration(&self) -> Duration {
        Duration::from_secs_f64(self.silence_duration_sec)
    }

    pub fn max_buffer_bytes(&self) -> usize {
        self.max_buffer_mb * 1024 * 1024
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KeywordConfig {
    #[serde(default = "default_wake_word")]
    pub wake_word: String,
    #[serde(default = "default_sleep_word")]
    pub sleep_word: String,
    /// Also recognize the sleep word when it shows up as ordinary speech in a
    /// finished transcript, in addition to the live spotter path.
    #[serde(default = "default_sleep_word_in_transcript")]
    pub sleep_word_in_transcript: bool,
    #[serde(default = "default_spotter_threshold")]
    pub spotter_threshold: f32,
}

fn default_wake_word() -> String {
    "computer".to_string()
}

fn default_sleep_word() -> String {
    "terminator".to_string()
}

fn default_sleep_word_in_transcript() -> bool {
    true
}

fn default_spotter_threshold() -> f32 {
    0.4
}

impl Default for KeywordConfig {
    fn default() -> Self {
        KeywordConfig {
            wake_word: default_wake_word(),
            sleep_word: default_sleep_word(),
            sleep_word_in_transcript: default_sleep_word_in_transcript(),
            spotter_threshold: default_spotter_threshold(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OneShotConfig {
    #[serde(default = "default_one_shot_duration")]
    pub max_duration_sec: f64,
    #[serde(default = "default_one_shot_hotkey")]
    pub hotkey: String,
}

fn default_one_shot_duration() -> f64 {
    10.0
}

fn default_one_shot_hotkey() -> String {
    "Ctrl+Alt+T".to_string()
}

impl Default for OneShotConfig {
    fn default() -> Self {
        OneShotConfig {
            max_duration_sec: default_one_shot_duration(),
            hotkey: default_one_shot_hotkey(),
        }
    }
}

impl OneShotConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_duration_sec)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranscriptionConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,
}

fn default_model() -> String {
    "base.en".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_use_gpu() -> bool {
    true
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        TranscriptionConfig {
            model: default_model(),
            language: default_language(),
            use_gpu: default_use_gpu(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            audio: AudioConfig::default(),
            segmentation: SegmentationConfig::default(),
            keywords: KeywordConfig::default(),
            one_shot: OneShotConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".wake-scribe"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.yaml"))
    }

    pub fn models_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("models"))
    }

    /// Directory holding the per-keyword spotter model files (`<word>.rpw`)
    pub fn keywords_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("keywords"))
    }

    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config: Config =
                serde_yaml::from_str(&contents).context("Failed to parse config file")?;

            // Validate configuration after loading
            config.validate()?;

            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            println!("Created default config at: {}", config_path.display());
            Ok(config)
        }
    }

    /// Validate configuration values. Any failure here is fatal at startup;
    /// the pipeline never runs on a half-valid configuration.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            bail!("sample_rate must be greater than 0");
        }
        if self.audio.channels != 1 {
            bail!("channels must be 1 (mono capture)");
        }
        if self.audio.frame_ms == 0 || self.audio.frame_ms > 100 {
            bail!("frame_ms must be in 1..=100");
        }

        if self.segmentation.vad_aggressiveness > 3 {
            bail!("vad_aggressiveness must be in 0..=3");
        }
        if self.segmentation.silence_duration_sec <= 0.0 {
            bail!("silence_duration_sec must be greater than 0");
        }
        if self.segmentation.max_buffer_mb == 0 {
            bail!("max_buffer_mb must be greater than 0");
        }
        if self.segmentation.buffer_check_interval == 0 {
            bail!("buffer_check_interval must be greater than 0");
        }

        if self.keywords.wake_word.trim().is_empty() {
            bail!("wake_word cannot be empty");
        }
        if self.keywords.sleep_word.trim().is_empty() {
            bail!("sleep_word cannot be empty");
        }
        if !(0.0..=1.0).contains(&self.keywords.spotter_threshold) {
            bail!("spotter_threshold must be between 0.0 and 1.0");
        }

        if self.one_shot.max_duration_sec <= 0.0 {
            bail!("one_shot max_duration_sec must be greater than 0");
        }
        if self.one_shot.hotkey.trim().is_empty() {
            bail!("one_shot hotkey cannot be empty");
        }

        if self.transcription.model.is_empty() {
            bail!("model name cannot be empty");
        }
        if self.transcription.language.is_empty() {
            bail!("language code cannot be empty");
        }

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        let config_path = Self::config_path()?;
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs::write(&config_path, yaml).context("Failed to write config file")?;

        Ok(())
    }
}
