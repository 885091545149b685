//! Key normalization: turns whatever the host reports for a key press into a
//! single canonical lowercase token.
//!
//! Two platform quirks are absorbed here:
//!
//! - macOS produces a different character when option is held (option+x types
//!   `≈`), so those characters are mapped back to the letter that was struck.
//! - the command key arrives as `meta`/`super`, which is aliased to `command`
//!   so chord matching can treat it as the primary modifier.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, ModifierKeyCode};

use crate::platform::{Platform, ALT, COMMAND, CTRL, SHIFT};

/// Characters macOS types when option is held, paired with the letter struck.
const OPTION_LAYER: &[(char, char)] = &[
    ('å', 'a'),
    ('∫', 'b'),
    ('ç', 'c'),
    ('∂', 'd'),
    ('´', 'e'),
    ('ƒ', 'f'),
    ('©', 'g'),
    ('˙', 'h'),
    ('ˆ', 'i'),
    ('∆', 'j'),
    ('˚', 'k'),
    ('¬', 'l'),
    ('µ', 'm'),
    ('˜', 'n'),
    ('ø', 'o'),
    ('π', 'p'),
    ('œ', 'q'),
    ('®', 'r'),
    ('ß', 's'),
    ('†', 't'),
    ('¨', 'u'),
    ('√', 'v'),
    ('∑', 'w'),
    ('≈', 'x'),
    ('¥', 'y'),
    ('Ω', 'z'),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierFlags {
    /// Platform command modifier (ctrl, or command on macOS).
    pub primary: bool,
    /// Option/alt.
    pub secondary: bool,
    /// Shift.
    pub tertiary: bool,
}

impl ModifierFlags {
    pub const NONE: ModifierFlags = ModifierFlags {
        primary: false,
        secondary: false,
        tertiary: false,
    };
    pub const PRIMARY: ModifierFlags = ModifierFlags {
        primary: true,
        secondary: false,
        tertiary: false,
    };
    pub const SECONDARY: ModifierFlags = ModifierFlags {
        primary: false,
        secondary: true,
        tertiary: false,
    };

    pub fn any(&self) -> bool {
        self.primary || self.secondary || self.tertiary
    }
}

/// A key-down event as delivered by the host UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKey {
    pub code: String,
    pub modifiers: ModifierFlags,
}

impl RawKey {
    pub fn new(code: impl Into<String>, modifiers: ModifierFlags) -> Self {
        Self {
            code: code.into(),
            modifiers,
        }
    }

    pub fn plain(code: impl Into<String>) -> Self {
        Self::new(code, ModifierFlags::NONE)
    }

    /// The canonical token for this press.
    pub fn token(&self) -> String {
        normalize(&self.code, self.modifiers)
    }

    /// True when the press is a modifier key on its own.
    pub fn is_modifier(&self) -> bool {
        matches!(self.token().as_str(), CTRL | COMMAND | ALT | SHIFT)
    }

    /// True for a character the macOS option layer produces in place of a
    /// letter, as delivered by terminals that don't treat option as meta.
    pub fn is_option_layer(&self) -> bool {
        let mut chars = self.code.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if option_layer_letter(c).is_some())
    }

    /// Adapts a terminal key event.
    ///
    /// Control is the primary modifier everywhere. On macOS super/meta (the
    /// command key, when the terminal forwards it) counts as primary too.
    pub fn from_key_event(event: &KeyEvent, platform: Platform) -> Self {
        let m = event.modifiers;
        let mut modifiers = ModifierFlags {
            primary: m.contains(KeyModifiers::CONTROL)
                || (platform == Platform::Mac
                    && m.intersects(KeyModifiers::SUPER | KeyModifiers::META)),
            secondary: m.contains(KeyModifiers::ALT),
            tertiary: m.contains(KeyModifiers::SHIFT),
        };

        let code = match event.code {
            KeyCode::Char(' ') => "space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Modifier(modifier) => {
                // the modifier key being pressed is, by definition, held
                let name = modifier_name(modifier);
                match name {
                    "shift" => modifiers.tertiary = true,
                    "alt" => modifiers.secondary = true,
                    "control" => modifiers.primary = true,
                    "meta" if platform == Platform::Mac => modifiers.primary = true,
                    _ => {}
                }
                name.to_string()
            }
            KeyCode::Enter => "enter".to_string(),
            KeyCode::Esc => "escape".to_string(),
            KeyCode::Tab => "tab".to_string(),
            KeyCode::BackTab => "tab".to_string(),
            KeyCode::Backspace => "backspace".to_string(),
            KeyCode::Delete => "delete".to_string(),
            KeyCode::Up => "arrowup".to_string(),
            KeyCode::Down => "arrowdown".to_string(),
            KeyCode::Left => "arrowleft".to_string(),
            KeyCode::Right => "arrowright".to_string(),
            KeyCode::Home => "home".to_string(),
            KeyCode::End => "end".to_string(),
            KeyCode::PageUp => "pageup".to_string(),
            KeyCode::PageDown => "pagedown".to_string(),
            KeyCode::F(n) => format!("f{n}"),
            _ => "unidentified".to_string(),
        };

        Self { code, modifiers }
    }
}

fn modifier_name(modifier: ModifierKeyCode) -> &'static str {
    match modifier {
        ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => "shift",
        ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => "control",
        ModifierKeyCode::LeftAlt
        | ModifierKeyCode::RightAlt
        | ModifierKeyCode::IsoLevel3Shift => "alt",
        ModifierKeyCode::LeftSuper
        | ModifierKeyCode::RightSuper
        | ModifierKeyCode::LeftMeta
        | ModifierKeyCode::RightMeta
        | ModifierKeyCode::LeftHyper
        | ModifierKeyCode::RightHyper => "meta",
        ModifierKeyCode::IsoLevel5Shift => "unidentified",
    }
}

/// Maps a raw key identifier to its canonical token. Never fails; unknown
/// identifiers are simply lowercased.
pub fn normalize(code: &str, modifiers: ModifierFlags) -> String {
    let mut chars = code.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if modifiers.secondary && c.is_ascii_alphabetic() {
            return c.to_ascii_lowercase().to_string();
        }
        if let Some(letter) = option_layer_letter(c) {
            return letter.to_string();
        }
    }

    let lower = code.to_lowercase();
    match lower.as_str() {
        "meta" | "super" | "cmd" | "os" => COMMAND.to_string(),
        "control" => CTRL.to_string(),
        "option" => ALT.to_string(),
        _ => lower,
    }
}

pub(crate) fn option_layer_letter(c: char) -> Option<char> {
    OPTION_LAYER
        .iter()
        .find(|(typed, _)| *typed == c)
        .map(|(_, letter)| *letter)
}
