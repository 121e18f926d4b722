/// Application-wide constants for queue sizing and pipeline polling

pub mod audio {
    /// Bytes per sample of 16-bit PCM
    pub const BYTES_PER_SAMPLE: usize = 2;
}

pub mod pipeline {
    /// Cooperative poll interval for every blocking frame pull.
    /// A timeout at this interval is the idle tick of a consumer loop, not a failure.
    pub const FRAME_PULL_TIMEOUT_MS: u64 = 100;
}

pub mod queues {
    /// Maximum frames queued for the segmenter before the bus drops new ones.
    /// At 30ms per frame this is several seconds of backlog; if the segmenter
    /// falls that far behind, dropping beats blocking the capture callback.
    pub const SEGMENTER_QUEUE_FRAMES: usize = 256;

    /// Maximum frames queued for the one-shot recorder. Sized to hold a full
    /// maximum-length session (10s of 30ms frames) plus slack.
    pub const ONE_SHOT_QUEUE_FRAMES: usize = 512;

    /// Maximum frames queued for the keyword spotter loop.
    pub const SPOTTER_QUEUE_FRAMES: usize = 64;

    /// Maximum finished utterances waiting on the transcription gate.
    /// The gate processes one at a time; a small backlog is enough.
    pub const UTTERANCE_QUEUE_DEPTH: usize = 4;
}
