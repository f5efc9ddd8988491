//! Application framework for the Keel engine.
//!
//! This crate provides a state-stack application framework that handles
//! common boilerplate like:
//! - Window creation and the event loop
//! - GPU context and renderer initialization
//! - A pushdown stack of game states with popup overlays
//! - Keyboard input with edge and hold detection
//! - Named events and typed assets shared between states
//! - Supervised background loading
//!
//! # Example
//!
//! ```no_run
//! use keel_app::{run, EngineConfig, GameState, KeyCode, StateContext};
//!
//! struct Menu;
//!
//! impl GameState for Menu {
//!     fn name(&self) -> &str {
//!         "menu"
//!     }
//!
//!     fn update(&mut self, ctx: &mut StateContext) {
//!         if ctx.input.is_just_pressed(KeyCode::Escape) {
//!             ctx.pop_state();
//!         }
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run(EngineConfig::new("My Game"), Box::new(Menu))
//! }
//! ```

mod assets;
mod config;
mod events;
mod loader;
mod runner;
mod state;

pub use assets::{AssetKind, AssetStore};
pub use config::EngineConfig;
pub use events::EventBus;
pub use loader::{CancelToken, LoadTask};
pub use runner::run;
pub use state::{GameState, StateCommand, StateContext, StateStack};

// Re-export commonly used types for convenience
pub use keel_gpu::{GpuContext, Texture};
pub use keel_input::{InputManager, KeyCode};
