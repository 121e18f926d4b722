use anyhow::{Context, Result};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager,
};

/// Global hotkey for the one-shot recording trigger.
///
/// The hotkey backend is optional at runtime: any failure to create the
/// manager, parse the combo, or register it degrades to running without
/// one-shot triggering rather than aborting startup.
pub struct OneShotHotkey {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
}

impl OneShotHotkey {
    pub fn try_new(combo: &str) -> Option<Self> {
        match Self::register(combo) {
            Ok(hotkey) => {
                println!("✅ Global hotkey: {} (one-time transcription)", combo);
                Some(hotkey)
            }
            Err(e) => {
                eprintln!("⚠️  Global hotkey unavailable: {}", e);
                eprintln!("   Continuing without one-time transcription");
                None
            }
        }
    }

    fn register(combo: &str) -> Result<Self> {
        let manager =
            GlobalHotKeyManager::new().context("Failed to create global hotkey manager")?;

        let hotkey = Self::parse_hotkey(combo).context("Failed to parse one-shot hotkey")?;
        manager
            .register(hotkey)
            .context("Failed to register one-shot hotkey")?;

        Ok(OneShotHotkey { manager, hotkey })
    }

    fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
        let parts: Vec<&str> = hotkey_str.split('+').map(|s| s.trim()).collect();

        if parts.is_empty() {
            anyhow::bail!("Hotkey string is empty");
        }

        let mut modifiers = Modifiers::empty();
        let mut key_code = None;

        for part in parts {
            match part.to_lowercase().as_str() {
                "cmd" | "command" | "super" => modifiers |= Modifiers::SUPER,
                "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
                "alt" | "option" => modifiers |= Modifiers::ALT,
                "shift" => modifiers |= Modifiers::SHIFT,
                key => {
                    key_code = Some(Self::parse_key_code(key)?);
                }
            }
        }

        let code = key_code.context("No key code found in hotkey string")?;
        Ok(HotKey::new(Some(modifiers), code))
    }

    fn parse_key_code(key: &str) -> Result<Code> {
        let code = match key.to_uppercase().as_str() {
            "A" => Code::KeyA,
            "B" => Code::KeyB,
            "C" => Code::KeyC,
            "D" => Code::KeyD,
            "E" => Code::KeyE,
            "F" => Code::KeyF,
            "G" => Code::KeyG,
            "H" => Code::KeyH,
            "I" => Code::KeyI,
            "J" => Code::KeyJ,
            "K" => Code::KeyK,
            "L" => Code::KeyL,
            "M" => Code::KeyM,
            "N" => Code::KeyN,
            "O" => Code::KeyO,
            "P" => Code::KeyP,
            "Q" => Code::KeyQ,
            "R" => Code::KeyR,
            "S" => Code::KeyS,
            "T" => Code::KeyT,
            "U" => Code::KeyU,
            "V" => Code::KeyV,
            "W" => Code::KeyW,
            "X" => Code::KeyX,
            "Y" => Code::KeyY,
            "Z" => Code::KeyZ,
            "0" => Code::Digit0,
            "1" => Code::Digit1,
            "2" => Code::Digit2,
            "3" => Code::Digit3,
            "4" => Code::Digit4,
            "5" => Code::Digit5,
            "6" => Code::Digit6,
            "7" => Code::Digit7,
            "8" => Code::Digit8,
            "9" => Code::Digit9,
            "F1" => Code::F1,
            "F2" => Code::F2,
            "F3" => Code::F3,
            "F4" => Code::F4,
            "F5" => Code::F5,
            "F6" => Code::F6,
            "F7" => Code::F7,
            "F8" => Code::F8,
            "F9" => Code::F9,
            "F10" => Code::F10,
            "F11" => Code::F11,
            "F12" => Code::F12,
            "SPACE" => Code::Space,
            "ENTER" | "RETURN" => Code::Enter,
            "TAB" => Code::Tab,
            "MINUS" | "-" => Code::Minus,
            "BACKSPACE" => Code::Backspace,
            "ESCAPE" | "ESC" => Code::Escape,
            other => anyhow::bail!("Unknown key code: {}", other),
        };
        Ok(code)
    }

    /// Non-blocking poll; true when the one-shot combo was pressed.
    pub fn poll_pressed(&self) -> bool {
        if let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            return event.id == self.hotkey.id();
        }
        false
    }
}

impl Drop for OneShotHotkey {
    fn drop(&mut self) {
        let _ = self.manager.unregister(self.hotkey);
    }
}
