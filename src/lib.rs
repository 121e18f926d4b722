// Library exports for testing
pub mod audio;
pub mod config;
pub mod constants;
pub mod frame_bus;
pub mod gate;
pub mod hotkey;
pub mod mode;
pub mod model_download;
pub mod one_shot;
pub mod output;
pub mod segmenter;
pub mod spotter;
pub mod transcription;
pub mod vad;
