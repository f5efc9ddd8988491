//! Input manager fed by winit window events.

use std::time::Instant;

use hashbrown::HashMap;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::key_state::KeyState;

/// Keyboard input manager.
///
/// Feed it window events, query key phases during update, and call
/// [`end_frame`](Self::end_frame) once per tick so single-frame edges
/// (`just_pressed` / `just_released`) last exactly one frame.
#[derive(Debug, Default)]
pub struct InputManager {
    /// State of individual keys by key code.
    keys: HashMap<KeyCode, KeyState>,
}

impl InputManager {
    /// Create a new input manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a window event.
    ///
    /// Returns `true` if the event was consumed.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key_code) = event.physical_key else {
                    return false;
                };
                self.apply(key_code, event.state, Instant::now());
                true
            }
            _ => false,
        }
    }

    /// Feed a single key transition directly.
    ///
    /// `process_window_event` routes through here; it is public so the
    /// keyboard can be driven without a window.
    pub fn apply(&mut self, key: KeyCode, state: ElementState, now: Instant) {
        let entry = self.keys.entry(key).or_default();
        match state {
            ElementState::Pressed => entry.press(now),
            ElementState::Released => entry.release(),
        }
    }

    /// Returns `true` if the key is currently down.
    #[must_use]
    pub fn is_down(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_down())
    }

    /// Returns `true` if the key went down this frame.
    #[must_use]
    pub fn is_just_pressed(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_just_pressed())
    }

    /// Returns `true` if the key came up this frame.
    #[must_use]
    pub fn is_just_released(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_just_released())
    }

    /// Returns `true` if the key has been down long enough to count as
    /// held rather than tapped.
    #[must_use]
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.is_held_at(key, Instant::now())
    }

    /// Hold query with an explicit clock.
    #[must_use]
    pub fn is_held_at(&self, key: KeyCode, now: Instant) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_held_at(now))
    }

    /// Called at end of frame to retire single-frame edges.
    pub fn end_frame(&mut self) {
        for state in self.keys.values_mut() {
            state.end_frame();
        }
    }

    /// Clear all key states, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::key_state::HOLD_THRESHOLD;

    #[test]
    fn press_edge_lasts_one_frame() {
        let t0 = Instant::now();
        let mut input = InputManager::new();

        input.apply(KeyCode::KeyW, ElementState::Pressed, t0);
        assert!(input.is_down(KeyCode::KeyW));
        assert!(input.is_just_pressed(KeyCode::KeyW));

        input.end_frame();
        assert!(input.is_down(KeyCode::KeyW));
        assert!(!input.is_just_pressed(KeyCode::KeyW));

        input.apply(KeyCode::KeyW, ElementState::Released, t0);
        assert!(input.is_just_released(KeyCode::KeyW));

        input.end_frame();
        assert!(!input.is_down(KeyCode::KeyW));
        assert!(!input.is_just_released(KeyCode::KeyW));
    }

    #[test]
    fn repeats_do_not_retrigger_the_edge() {
        let t0 = Instant::now();
        let mut input = InputManager::new();

        input.apply(KeyCode::Space, ElementState::Pressed, t0);
        input.end_frame();

        input.apply(
            KeyCode::Space,
            ElementState::Pressed,
            t0 + Duration::from_millis(50),
        );
        assert!(!input.is_just_pressed(KeyCode::Space));
        assert!(input.is_down(KeyCode::Space));
    }

    #[test]
    fn hold_is_measured_from_the_first_press() {
        let t0 = Instant::now();
        let mut input = InputManager::new();

        input.apply(KeyCode::KeyP, ElementState::Pressed, t0);
        input.end_frame();

        assert!(!input.is_held_at(KeyCode::KeyP, t0 + Duration::from_millis(100)));
        assert!(input.is_held_at(KeyCode::KeyP, t0 + HOLD_THRESHOLD));
    }

    #[test]
    fn unknown_keys_answer_false() {
        let input = InputManager::new();
        assert!(!input.is_down(KeyCode::KeyQ));
        assert!(!input.is_just_pressed(KeyCode::KeyQ));
        assert!(!input.is_held_at(KeyCode::KeyQ, Instant::now()));
    }

    #[test]
    fn clear_forgets_everything() {
        let t0 = Instant::now();
        let mut input = InputManager::new();

        input.apply(KeyCode::Escape, ElementState::Pressed, t0);
        input.clear();
        assert!(!input.is_down(KeyCode::Escape));
    }
}
