//! Translation from egui key events to the core's `InputKey`.

use annotator_core::InputKey;
use eframe::egui::{self, Key};

pub(super) fn to_input_key(key: Key) -> Option<InputKey> {
    let mapped = match key {
        Key::Num0 => InputKey::Digit(0),
        Key::Num1 => InputKey::Digit(1),
        Key::Num2 => InputKey::Digit(2),
        Key::Num3 => InputKey::Digit(3),
        Key::Num4 => InputKey::Digit(4),
        Key::Num5 => InputKey::Digit(5),
        Key::Num6 => InputKey::Digit(6),
        Key::Num7 => InputKey::Digit(7),
        Key::Num8 => InputKey::Digit(8),
        Key::Num9 => InputKey::Digit(9),
        Key::F1 => InputKey::F(1),
        Key::F2 => InputKey::F(2),
        Key::F3 => InputKey::F(3),
        Key::F4 => InputKey::F(4),
        Key::F5 => InputKey::F(5),
        Key::F6 => InputKey::F(6),
        Key::F7 => InputKey::F(7),
        Key::F8 => InputKey::F(8),
        Key::F9 => InputKey::F(9),
        Key::F10 => InputKey::F(10),
        Key::F11 => InputKey::F(11),
        Key::F12 => InputKey::F(12),
        Key::ArrowLeft => InputKey::ArrowLeft,
        Key::ArrowRight => InputKey::ArrowRight,
        Key::Space => InputKey::Space,
        Key::Enter => InputKey::Enter,
        Key::Escape => InputKey::Escape,
        other => {
            // Letter keys are named "A".."Z" by egui.
            let name = other.name();
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => {
                    InputKey::Letter(c.to_ascii_uppercase())
                }
                _ => return None,
            }
        }
    };
    Some(mapped)
}

/// Keys pressed this frame without a command modifier, in event order.
pub(super) fn pressed_keys(ctx: &egui::Context) -> Vec<InputKey> {
    ctx.input(|i| {
        i.events
            .iter()
            .filter_map(|event| match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    modifiers,
                    ..
                } if !modifiers.command && !modifiers.alt => to_input_key(*key),
                _ => None,
            })
            .collect()
    })
}
