//! Keyboard bookkeeping for the Keel engine.
//!
//! Tracks per-key phases (just pressed, down, just released, up) plus a
//! tap/hold distinction: a key down for at least [`HOLD_THRESHOLD`]
//! counts as held.
//!
//! ```ignore
//! use keel_input::InputManager;
//! use winit::keyboard::KeyCode;
//!
//! // In the event handler
//! fn on_event(input: &mut InputManager, event: &WindowEvent) -> bool {
//!     input.process_window_event(event)
//! }
//!
//! // In the update loop
//! fn update(input: &mut InputManager) {
//!     if input.is_just_pressed(KeyCode::KeyP) {
//!         // Toggle pause
//!     }
//!     if input.is_held(KeyCode::Space) {
//!         // Charge the jump
//!     }
//!
//!     // MUST call at end of update
//!     input.end_frame();
//! }
//! ```

mod input;
mod key_state;

pub use input::InputManager;
pub use key_state::{KeyPhase, KeyState, HOLD_THRESHOLD};

// Re-export winit types commonly used with input
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;
