use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::constants::audio::BYTES_PER_SAMPLE;
use crate::mode::{ModeController, SleepTrigger};
use crate::output::OutputSink;
use crate::transcription::SpeechToText;

/// Where a finished buffer came from. One-shot transcripts never change the
/// wake/sleep mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Continuous,
    OneShot,
}

/// A finished span of audio ready for the speech-to-text collaborator.
#[derive(Debug)]
pub struct Utterance {
    pub samples: Vec<i16>,
    pub origin: Origin,
}

impl Utterance {
    pub fn continuous(samples: Vec<i16>) -> Self {
        Utterance {
            samples,
            origin: Origin::Continuous,
        }
    }

    pub fn one_shot(samples: Vec<i16>) -> Self {
        Utterance {
            samples,
            origin: Origin::OneShot,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.samples.len() * BYTES_PER_SAMPLE
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.samples.len() as f64 / sample_rate as f64
    }
}

/// Serializes finished buffers through the speech-to-text collaborator and
/// applies the post-hoc sleep-word policy.
///
/// One thread, one utterance at a time. A failed transcription drops that
/// utterance and the loop continues; nothing escapes to the caller.
pub struct TranscriptionGate {
    utterances: Receiver<Utterance>,
    engine: Box<dyn SpeechToText>,
    sink: Box<dyn OutputSink>,
    mode: Arc<ModeController>,
    sleep_word: String,
    sleep_word_in_transcript: bool,
}

impl TranscriptionGate {
    pub fn new(
        utterances: Receiver<Utterance>,
        engine: Box<dyn SpeechToText>,
        sink: Box<dyn OutputSink>,
        mode: Arc<ModeController>,
        sleep_word: &str,
        sleep_word_in_transcript: bool,
    ) -> Self {
        TranscriptionGate {
            utterances,
            engine,
            sink,
            mode,
            sleep_word: sleep_word.to_lowercase(),
            sleep_word_in_transcript,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    pub fn run(mut self) {
        while let Ok(utterance) = self.utterances.recv() {
            self.process_utterance(utterance);
        }
    }

    /// Handle a single finished buffer end to end.
    pub fn process_utterance(&mut self, utterance: Utterance) {
        let origin = utterance.origin;

        let text = match self.engine.transcribe(&utterance.samples) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("❌ Error during transcription: {}", e);
                return;
            }
        };

        let text = text.trim();
        if text.is_empty() {
            println!("🔇 No speech detected in utterance");
            return;
        }

        println!("📝 You said: {}", text);

        if origin == Origin::Continuous
            && self.sleep_word_in_transcript
            && text.to_lowercase().contains(&self.sleep_word)
        {
            // The flip clears the segmenter queue; this final utterance is
            // still delivered below.
            self.mode.sleep(SleepTrigger::Transcript);
        }

        if let Err(e) = self.sink.deliver(text) {
            eprintln!("⚠️  Failed to deliver text: {}", e);
        }
    }
}
