use anyhow::{anyhow, Context, Result};
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::thread;
use std::time::Duration;

/// Delivery collaborator for finished transcripts. Side-effecting and
/// fire-and-forget; a failed delivery is logged by the caller, never fatal.
pub trait OutputSink: Send {
    fn deliver(&mut self, text: &str) -> Result<()>;
}

/// Copies the text to the system clipboard and issues a paste keystroke into
/// whatever application has focus.
///
/// Clipboard and input handles are opened per delivery; utterances arrive
/// seconds apart and some platforms dislike long-lived clipboard handles.
pub struct ClipboardPaste;

impl ClipboardPaste {
    pub fn new() -> Self {
        ClipboardPaste
    }

    fn paste_chord(enigo: &mut Enigo) -> Result<()> {
        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| anyhow!("Failed to press paste modifier: {}", e))?;
        let result = enigo
            .key(Key::Unicode('v'), Direction::Click)
            .map_err(|e| anyhow!("Failed to tap paste key: {}", e));
        // Always release the modifier, even if the tap failed
        enigo
            .key(modifier, Direction::Release)
            .map_err(|e| anyhow!("Failed to release paste modifier: {}", e))?;
        result
    }
}

impl OutputSink for ClipboardPaste {
    fn deliver(&mut self, text: &str) -> Result<()> {
        let mut clipboard =
            arboard::Clipboard::new().context("Failed to open system clipboard")?;
        clipboard
            .set_text(text.to_string())
            .context("Failed to copy text to clipboard")?;

        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow!("Failed to initialize keystroke injection: {}", e))?;
        Self::paste_chord(&mut enigo)?;

        // Give the foreground application time to process the paste before
        // the next delivery can overwrite the clipboard
        thread::sleep(Duration::from_millis(200));

        Ok(())
    }
}

/// Prints transcripts to stdout. Used by the offline replay harness.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn deliver(&mut self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }
}
