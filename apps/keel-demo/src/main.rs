//! Keel Engine Demo
//!
//! Opens a window, presents the triangle pipeline, and runs a small
//! state stack: a menu state that prepares a generated background
//! texture off-thread, with a pause popup over it.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p keel-demo
//! ```
//!
//! ## Controls
//!
//! - `P`: open the pause popup
//! - `Escape`: close the popup, or leave the menu
//! - Hold `Q`: quit
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod menu;
mod pause;

use keel_app::{run, EngineConfig};

use crate::menu::MenuState;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> anyhow::Result<()> {
    run(
        EngineConfig::new("Keel Engine - Demo")
            .with_size(WIDTH, HEIGHT)
            .with_version((0, 1, 0)),
        Box::new(MenuState::new()),
    )
}
