pub mod commands;
pub mod engine;
pub mod error;
pub mod ime;
#[cfg(windows)]
pub mod keyboard_hook;
pub mod notify;
pub mod settings;
pub mod source;
pub mod types;
pub mod vk_map;
pub mod watcher;

pub use commands::{Commands, RELOAD_SETTING_EVENT};
pub use error::{Error, ImeError, Result};
pub use settings::{JsonFile, Settings, SettingsStore};
pub use types::{Action, KeyDirection, KeyEvent, KeyId, RawKeyEvent};
pub use watcher::{ImeFailure, Watcher, WatcherOptions};
