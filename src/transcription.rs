use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use crate::config::{Config, TranscriptionConfig};

/// Speech-to-text collaborator. A call blocks the calling thread for the
/// duration of the conversion; failures are per-utterance, not fatal.
pub trait SpeechToText: Send {
    fn transcribe(&mut self, samples: &[i16]) -> Result<String>;
}

/// Whisper refuses very short inputs; utterances below this are padded with
/// trailing silence (1.5s at 16kHz).
const MIN_WHISPER_SAMPLES: usize = 24000;

pub struct WhisperTranscriber {
    // The context owns the model weights; the state is reused across calls so
    // each utterance doesn't pay the setup cost again.
    _ctx: Arc<WhisperContext>,
    state: WhisperState,
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        let model_path = Self::model_path(&config.model)?;

        println!("Loading Whisper model from: {}", model_path.display());

        let ctx_params = WhisperContextParameters {
            use_gpu: config.use_gpu,
            ..Default::default()
        };

        let ctx = WhisperContext::new_with_params(&model_path.to_string_lossy(), ctx_params)
            .context("Failed to load Whisper model")?;

        println!("Whisper model loaded successfully (GPU: {})", config.use_gpu);

        let ctx = Arc::new(ctx);
        let state = ctx.create_state().context("Failed to create Whisper state")?;

        Ok(WhisperTranscriber {
            _ctx: ctx,
            state,
            config,
        })
    }

    pub fn model_path(model_name: &str) -> Result<PathBuf> {
        let models_dir = Config::models_dir()?;
        let model_filename = format!("ggml-{}.bin", model_name);
        let model_path = models_dir.join(&model_filename);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\n\
                Download it with:\n\
                  wake-scribe download-model {}",
                model_path.display(),
                model_name
            );
        }

        Ok(model_path)
    }
}

impl SpeechToText for WhisperTranscriber {
    fn transcribe(&mut self, samples: &[i16]) -> Result<String> {
        let mut audio: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();
        if audio.len() < MIN_WHISPER_SAMPLES {
            audio.resize(MIN_WHISPER_SAMPLES, 0.0);
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if !self.config.language.is_empty() && self.config.language != "auto" {
            params.set_language(Some(&self.config.language));
        }

        params.set_translate(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // Keep annotations like [BLANK_AUDIO] and (coughs) out of the output
        params.set_suppress_blank(true);
        params.set_suppress_non_speech_tokens(true);

        // Greedy decoding at temperature 0 keeps hallucinations down on the
        // short, silence-bounded buffers this pipeline produces
        params.set_temperature(0.0);
        params.set_temperature_inc(0.0);

        self.state
            .full(params, &audio)
            .context("Failed to run Whisper transcription")?;

        let num_segments = self
            .state
            .full_n_segments()
            .context("Failed to get number of segments")?;

        let mut result = String::new();
        for i in 0..num_segments {
            let segment = self
                .state
                .full_get_segment_text(i)
                .context("Failed to get segment text")?;
            result.push_str(&segment);
            result.push(' ');
        }

        Ok(result.trim().to_string())
    }
}
