use crate::settings::Settings;
use crate::types::{Action, KeyDirection, KeyEvent, KeyId};
use std::time::{Duration, Instant};
use tracing::debug;

/// Longest gap between two `Pressed` events of one key that still counts as
/// auto-repeat. Covers the slowest Windows repeat delay (1 s); later repeats
/// arrive much faster and refresh the timestamp.
pub const REPEAT_WINDOW: Duration = Duration::from_millis(1100);

#[derive(Debug, Clone, Copy)]
struct KeyState {
    direction: KeyDirection,
    /// Time of the last `Pressed`, repeats included.
    pressed_at: Option<Instant>,
}

/// Edge-triggered activation logic.
///
/// Holds nothing but the last transition seen for each recognized key; the
/// settings snapshot is passed in with every event.
#[derive(Debug, Default)]
pub struct Engine {
    keys: [Option<KeyState>; KeyId::COUNT],
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what to do for one recognized event.
    ///
    /// A `Pressed` that follows another `Pressed` on the same key within
    /// [`REPEAT_WINDOW`] is OS key repeat and never fires. Past the window the
    /// key-up is assumed lost (secure desktop, lock screen) and the press
    /// counts as new. The repeat memory is updated even while monitoring is off.
    pub fn process(&mut self, event: &KeyEvent, settings: &Settings) -> Action {
        let slot = &mut self.keys[event.key.index()];
        let previous = *slot;
        *slot = Some(KeyState {
            direction: event.direction,
            pressed_at: match event.direction {
                KeyDirection::Pressed => Some(event.t),
                KeyDirection::Released => previous.and_then(|p| p.pressed_at),
            },
        });

        if !settings.is_running {
            return Action::Ignore;
        }

        let is_trigger = event.key == settings.activate_key || event.key == settings.deactivate_key;
        if !is_trigger {
            return Action::Ignore;
        }

        let was_held = matches!(
            previous,
            Some(KeyState {
                direction: KeyDirection::Pressed,
                ..
            })
        );

        match event.direction {
            KeyDirection::Pressed if was_held && is_repeat(previous, event.t) => {
                debug!("Repeat suppressed: {}", event.key);
                Action::Ignore
            }
            // Activation wins when both keys are the same.
            KeyDirection::Pressed if event.key == settings.activate_key => Action::SetIme(true),
            KeyDirection::Pressed => Action::SetIme(false),
            KeyDirection::Released if was_held => Action::MaskMenu,
            KeyDirection::Released => Action::Ignore,
        }
    }
}

fn is_repeat(previous: Option<KeyState>, t: Instant) -> bool {
    match previous.and_then(|p| p.pressed_at) {
        Some(at) => t.saturating_duration_since(at) < REPEAT_WINDOW,
        None => false,
    }
}
