//! Keyboard decoding and the input collaborator.

/// Keys the courier reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Backward,
    Left,
    Right,
    Jump,
    Sprint,
    Crouch,
}

impl Key {
    /// Decode a DOM-style key code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "KeyW" => Some(Key::Forward),
            "KeyS" => Some(Key::Backward),
            "KeyA" => Some(Key::Left),
            "KeyD" => Some(Key::Right),
            "Space" => Some(Key::Jump),
            "ShiftLeft" | "ShiftRight" => Some(Key::Sprint),
            "ControlLeft" | "KeyC" => Some(Key::Crouch),
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of keys held during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys(u8);

impl HeldKeys {
    pub fn none() -> Self {
        Self(0)
    }

    pub fn from_keys(keys: &[Key]) -> Self {
        keys.iter().fold(Self::none(), |held, &key| held.with(key))
    }

    /// Build from raw key codes, silently skipping codes nobody is bound to.
    pub fn from_codes<'a, I>(codes: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        codes
            .into_iter()
            .filter_map(Key::from_code)
            .fold(Self::none(), |held, key| held.with(key))
    }

    pub fn with(self, key: Key) -> Self {
        Self(self.0 | key.bit())
    }

    pub fn is_held(self, key: Key) -> bool {
        self.0 & key.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Input collaborator interface.
pub trait InputSource {
    fn is_key_pressed(&self, code: &str) -> bool;
    /// Drains the accumulated mouse movement
    fn take_mouse_delta(&mut self) -> (f32, f32);
    /// Drains the accumulated wheel movement
    fn take_wheel_delta(&mut self) -> f32;

    /// Snapshot of the gameplay keys currently down
    fn held_keys(&self) -> HeldKeys {
        const CODES: [&str; 9] = [
            "KeyW", "KeyS", "KeyA", "KeyD", "Space", "ShiftLeft", "ShiftRight", "ControlLeft", "KeyC",
        ];
        HeldKeys::from_codes(CODES.iter().copied().filter(|code| self.is_key_pressed(code)))
    }
}

/// In-memory keyboard/mouse state fed by an event source.
#[derive(Debug, Default)]
pub struct KeyboardState {
    pressed: std::collections::HashSet<String>,
    mouse_delta: (f32, f32),
    wheel_delta: f32,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, code: &str) {
        self.pressed.insert(code.to_string());
    }

    pub fn key_up(&mut self, code: &str) {
        self.pressed.remove(code);
    }

    pub fn mouse_moved(&mut self, dx: f32, dy: f32) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    pub fn wheel_scrolled(&mut self, delta: f32) {
        self.wheel_delta += delta;
    }
}

impl InputSource for KeyboardState {
    fn is_key_pressed(&self, code: &str) -> bool {
        self.pressed.contains(code)
    }

    fn take_mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse_delta)
    }

    fn take_wheel_delta(&mut self) -> f32 {
        std::mem::take(&mut self.wheel_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_codes_are_ignored() {
        let held = HeldKeys::from_codes(["KeyW", "F13", "", "ShiftRight"]);
        assert!(held.is_held(Key::Forward));
        assert!(held.is_held(Key::Sprint));
        assert!(!held.is_held(Key::Jump));
        assert!(HeldKeys::from_codes(["Escape"]).is_empty());
    }

    #[test]
    fn test_keyboard_state_drains_deltas() {
        let mut input = KeyboardState::new();
        input.mouse_moved(3.0, -1.0);
        input.mouse_moved(1.0, 0.5);
        input.wheel_scrolled(2.0);

        assert_eq!(input.take_mouse_delta(), (4.0, -0.5));
        assert_eq!(input.take_mouse_delta(), (0.0, 0.0));
        assert_eq!(input.take_wheel_delta(), 2.0);
        assert_eq!(input.take_wheel_delta(), 0.0);
    }

    #[test]
    fn test_held_keys_from_source() {
        let mut input = KeyboardState::new();
        input.key_down("KeyC");
        input.key_down("Space");
        input.key_up("Space");

        let held = input.held_keys();
        assert!(held.is_held(Key::Crouch));
        assert!(!held.is_held(Key::Jump));
    }
}
