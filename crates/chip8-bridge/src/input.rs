//! Physical keyboard to CHIP-8 keypad mapping.
//!
//! Physical keys are identified by `KeyboardEvent.code`-style strings so the mapping is layout
//! independent. The 16-key hex keypad is laid out on the left side of a QWERTY keyboard:
//!
//! ```text
//! 1 2 3 C        Digit1 Digit2 Digit3 Digit4
//! 4 5 6 D   <=   KeyQ   KeyW   KeyE   KeyR
//! 7 8 9 E        KeyA   KeyS   KeyD   KeyF
//! A 0 B F        KeyZ   KeyX   KeyC   KeyV
//! ```

use std::collections::HashSet;

/// Import module name for the input and framebuffer functions.
pub const MODULE: &str = "chip8";

pub const KEYPAD_SIZE: usize = 16;

/// Returned by [`KeyState::first_held`] when no keypad key is down.
pub const NO_KEY: u32 = u32::MAX;

/// Physical key code for each logical keypad index `0x0..=0xF`.
pub const KEYPAD_CODES: [&str; KEYPAD_SIZE] = [
    "KeyX", "Digit1", "Digit2", "Digit3", "KeyQ", "KeyW", "KeyE", "KeyA", "KeyS", "KeyD", "KeyZ",
    "KeyC", "Digit4", "KeyR", "KeyF", "KeyV",
];

/// Logical keypad index for a physical key code, if it is mapped.
pub fn keypad_index(code: &str) -> Option<u32> {
    KEYPAD_CODES
        .iter()
        .position(|c| *c == code)
        .map(|i| i as u32)
}

/// Set of physical keys currently held down.
///
/// Unmapped keys are tracked too; they simply never show up on the keypad.
#[derive(Debug, Default, Clone)]
pub struct KeyState {
    down: HashSet<String>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, code: &str) {
        if !self.down.contains(code) {
            self.down.insert(code.to_owned());
        }
    }

    pub fn release(&mut self, code: &str) {
        self.down.remove(code);
    }

    /// Focus loss: forget every held key at once.
    pub fn clear(&mut self) {
        self.down.clear();
    }

    pub fn is_held(&self, code: &str) -> bool {
        self.down.contains(code)
    }

    /// Lowest keypad index currently down, or [`NO_KEY`].
    pub fn first_held(&self) -> u32 {
        KEYPAD_CODES
            .iter()
            .position(|code| self.down.contains(*code))
            .map_or(NO_KEY, |i| i as u32)
    }

    /// 1 if keypad `index` is down, else 0. Indices outside `0..16` read as released.
    pub fn is_down(&self, index: u32) -> u32 {
        KEYPAD_CODES
            .get(index as usize)
            .map_or(0, |code| u32::from(self.down.contains(*code)))
    }

    /// Snapshot of the whole keypad.
    pub fn keypad(&self) -> [bool; KEYPAD_SIZE] {
        KEYPAD_CODES.map(|code| self.down.contains(code))
    }
}
