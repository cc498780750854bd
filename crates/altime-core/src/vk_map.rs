use crate::types::{KeyEvent, KeyId, RawKeyEvent};

/// Maps side-specific Windows virtual-key codes to recognized keys.
/// Low-level hooks report the side-specific codes, so the generic
/// VK_SHIFT / VK_CONTROL / VK_MENU are deliberately absent.
pub const VK_TO_KEY: &[(u32, KeyId)] = &[
    (0xA0, KeyId::LeftShift),  // VK_LSHIFT
    (0xA1, KeyId::RightShift), // VK_RSHIFT
    (0xA2, KeyId::LeftCtrl),   // VK_LCONTROL
    (0xA3, KeyId::RightCtrl),  // VK_RCONTROL
    (0xA4, KeyId::LeftAlt),    // VK_LMENU
    (0xA5, KeyId::RightAlt),   // VK_RMENU
];

pub fn vk_to_key(vk: u32) -> Option<KeyId> {
    VK_TO_KEY
        .iter()
        .find(|(code, _)| *code == vk)
        .map(|(_, key)| *key)
}

pub fn key_to_vk(key: KeyId) -> u32 {
    VK_TO_KEY
        .iter()
        .find(|(_, k)| *k == key)
        .map(|(vk, _)| *vk)
        .unwrap_or_default()
}

/// Narrows a raw hook event to a recognized key event, dropping everything else.
pub fn match_event(raw: &RawKeyEvent) -> Option<KeyEvent> {
    vk_to_key(raw.code).map(|key| KeyEvent {
        key,
        direction: raw.direction,
        t: raw.t,
    })
}
