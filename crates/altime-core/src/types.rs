use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Modifier keys that can be bound to IME activation or deactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyId {
    LeftAlt,
    RightAlt,
    LeftCtrl,
    RightCtrl,
    LeftShift,
    RightShift,
}

impl KeyId {
    pub const COUNT: usize = 6;

    pub const ALL: [KeyId; Self::COUNT] = [
        KeyId::LeftAlt,
        KeyId::RightAlt,
        KeyId::LeftCtrl,
        KeyId::RightCtrl,
        KeyId::LeftShift,
        KeyId::RightShift,
    ];

    /// Wire token used by the command surface and the settings file.
    pub const fn as_token(self) -> &'static str {
        match self {
            KeyId::LeftAlt => "left_alt",
            KeyId::RightAlt => "right_alt",
            KeyId::LeftCtrl => "left_ctrl",
            KeyId::RightCtrl => "right_ctrl",
            KeyId::LeftShift => "left_shift",
            KeyId::RightShift => "right_shift",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for KeyId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyId::ALL
            .into_iter()
            .find(|k| k.as_token() == s)
            .ok_or_else(|| Error::InvalidKeyToken(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Pressed,
    Released,
}

/// A key transition as reported by the OS hook, before matching.
#[derive(Debug, Clone, Copy)]
pub struct RawKeyEvent {
    /// Virtual-key code.
    pub code: u32,
    pub direction: KeyDirection,
    pub t: Instant,
}

impl RawKeyEvent {
    pub fn new(code: u32, direction: KeyDirection) -> Self {
        Self {
            code,
            direction,
            t: Instant::now(),
        }
    }
}

/// A recognized key transition.
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    pub key: KeyId,
    pub direction: KeyDirection,
    pub t: Instant,
}

impl KeyEvent {
    pub fn pressed(key: KeyId) -> Self {
        Self {
            key,
            direction: KeyDirection::Pressed,
            t: Instant::now(),
        }
    }

    pub fn released(key: KeyId) -> Self {
        Self {
            key,
            direction: KeyDirection::Released,
            t: Instant::now(),
        }
    }
}

/// Decision produced by the activation state machine for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ignore,
    /// Set IME open status (true=ON, false=OFF).
    SetIme(bool),
    /// Inject a no-op key so the released Alt does not focus the menu bar.
    MaskMenu,
}
