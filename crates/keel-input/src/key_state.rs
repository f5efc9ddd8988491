//! Per-key phase and hold-time tracking.

use std::time::{Duration, Instant};

/// How long a key must stay down before it counts as held rather than
/// tapped.
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(250);

/// Phase of a key within the current frame.
///
/// Transitions:
/// - `Up` -> `press()` -> `JustPressed` -> `end_frame()` -> `Down`
/// - `Down` -> `release()` -> `JustReleased` -> `end_frame()` -> `Up`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPhase {
    /// Key went down this frame.
    JustPressed,
    /// Key is being held down.
    Down,
    /// Key came up this frame.
    JustReleased,
    /// Key is not pressed.
    #[default]
    Up,
}

impl KeyPhase {
    /// Returns `true` if the key is currently down (including just pressed).
    #[inline]
    #[must_use]
    pub const fn is_down(self) -> bool {
        matches!(self, Self::JustPressed | Self::Down)
    }

    /// Returns `true` if the key went down this frame.
    #[inline]
    #[must_use]
    pub const fn is_just_pressed(self) -> bool {
        matches!(self, Self::JustPressed)
    }

    /// Returns `true` if the key came up this frame.
    #[inline]
    #[must_use]
    pub const fn is_just_released(self) -> bool {
        matches!(self, Self::JustReleased)
    }
}

/// State of one key: its phase plus the moment it last went down.
///
/// The timestamp distinguishes a tap from a hold. It is set when the key
/// goes down and survives OS key-repeat events, so `is_held_at` measures
/// from the physical press.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyState {
    phase: KeyPhase,
    pressed_at: Option<Instant>,
}

impl KeyState {
    /// Current phase of the key.
    #[inline]
    #[must_use]
    pub const fn phase(self) -> KeyPhase {
        self.phase
    }

    /// Returns `true` if the key is currently down.
    #[inline]
    #[must_use]
    pub const fn is_down(self) -> bool {
        self.phase.is_down()
    }

    /// Returns `true` if the key went down this frame.
    #[inline]
    #[must_use]
    pub const fn is_just_pressed(self) -> bool {
        self.phase.is_just_pressed()
    }

    /// Returns `true` if the key came up this frame.
    #[inline]
    #[must_use]
    pub const fn is_just_released(self) -> bool {
        self.phase.is_just_released()
    }

    /// Returns `true` if the key has been down for at least
    /// [`HOLD_THRESHOLD`] as of `now`.
    #[must_use]
    pub fn is_held_at(self, now: Instant) -> bool {
        self.is_down()
            && self
                .pressed_at
                .is_some_and(|at| now.duration_since(at) >= HOLD_THRESHOLD)
    }

    /// Record a key-down transition at `now`.
    ///
    /// Repeat events while the key is already down are ignored: no new
    /// edge, and the hold timer keeps its original start.
    pub fn press(&mut self, now: Instant) {
        if !self.phase.is_down() {
            self.phase = KeyPhase::JustPressed;
            self.pressed_at = Some(now);
        }
    }

    /// Record a key-up transition.
    pub fn release(&mut self) {
        if self.phase.is_down() {
            self.phase = KeyPhase::JustReleased;
            self.pressed_at = None;
        }
    }

    /// Called at end of frame to retire the edge phases.
    pub fn end_frame(&mut self) {
        match self.phase {
            KeyPhase::JustPressed => self.phase = KeyPhase::Down,
            KeyPhase::JustReleased => self.phase = KeyPhase::Up,
            KeyPhase::Down | KeyPhase::Up => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_transitions() {
        let t0 = Instant::now();
        let mut state = KeyState::default();
        assert!(!state.is_down());
        assert!(!state.is_just_pressed());

        state.press(t0);
        assert!(state.is_down());
        assert!(state.is_just_pressed());

        state.end_frame();
        assert!(state.is_down());
        assert!(!state.is_just_pressed());

        state.release();
        assert!(!state.is_down());
        assert!(state.is_just_released());

        state.end_frame();
        assert!(!state.is_down());
        assert!(!state.is_just_released());
    }

    #[test]
    fn tap_is_not_a_hold() {
        let t0 = Instant::now();
        let mut state = KeyState::default();
        state.press(t0);
        state.end_frame();

        assert!(!state.is_held_at(t0 + Duration::from_millis(100)));
        assert!(state.is_held_at(t0 + Duration::from_millis(250)));
        assert!(state.is_held_at(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn repeat_press_keeps_the_hold_timer() {
        let t0 = Instant::now();
        let mut state = KeyState::default();
        state.press(t0);
        state.end_frame();

        // OS key repeat fires another press while already down
        state.press(t0 + Duration::from_millis(200));
        assert!(!state.is_just_pressed());
        assert!(state.is_held_at(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn released_key_is_never_held() {
        let t0 = Instant::now();
        let mut state = KeyState::default();
        state.press(t0);
        state.end_frame();
        state.release();

        assert!(!state.is_held_at(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn spurious_release_is_ignored() {
        let mut state = KeyState::default();
        state.release();
        assert_eq!(state.phase(), KeyPhase::Up);
    }
}
