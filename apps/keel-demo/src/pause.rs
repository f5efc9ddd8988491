//! Pause popup overlaid on the menu.

use keel_app::{GameState, StateContext};
use keel_input::KeyCode;

pub struct PausePopup;

impl GameState for PausePopup {
    fn name(&self) -> &str {
        "pause"
    }

    fn update(&mut self, ctx: &mut StateContext) {
        if ctx.input.is_just_pressed(KeyCode::Escape) {
            ctx.pop_popup();
        }
    }
}
