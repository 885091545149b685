use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Token the catalog uses for the primary modifier, independent of platform.
pub const CTRL: &str = "ctrl";
/// Primary modifier token on macOS (the command key, reported as meta/super).
pub const COMMAND: &str = "command";
/// Secondary modifier token. The option key reports as alt on every platform.
pub const ALT: &str = "alt";
pub const SHIFT: &str = "shift";

/// Platform capability, resolved once at startup and threaded through the
/// session configuration instead of being re-queried per key event.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Mac,
    Other,
}

impl Default for Platform {
    fn default() -> Self {
        Self::detect()
    }
}

impl Platform {
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" | "ios" => Platform::Mac,
            _ => Platform::Other,
        }
    }

    pub fn primary_token(&self) -> &'static str {
        match self {
            Platform::Mac => COMMAND,
            Platform::Other => CTRL,
        }
    }

    pub fn secondary_token(&self) -> &'static str {
        ALT
    }

    /// Maps the catalog's neutral primary token onto this platform's primary
    /// modifier. Every other token passes through unchanged.
    pub fn resolve<'a>(&self, token: &'a str) -> &'a str {
        if is_primary(token) {
            self.primary_token()
        } else {
            token
        }
    }

    /// Human readable name of a modifier token on this platform.
    pub fn key_label(&self, token: &str) -> String {
        match (self, token) {
            (Platform::Mac, COMMAND) | (Platform::Mac, CTRL) => "⌘".to_string(),
            (Platform::Mac, ALT) => "⌥".to_string(),
            (Platform::Mac, SHIFT) => "⇧".to_string(),
            (Platform::Other, COMMAND) | (Platform::Other, CTRL) => "Ctrl".to_string(),
            (Platform::Other, ALT) => "Alt".to_string(),
            (Platform::Other, SHIFT) => "Shift".to_string(),
            (_, other) => other.to_uppercase(),
        }
    }
}

pub fn is_primary(token: &str) -> bool {
    token == CTRL || token == COMMAND
}

pub fn is_secondary(token: &str) -> bool {
    token == ALT
}
