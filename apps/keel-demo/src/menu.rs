//! Menu state. Prepares a generated background texture off-thread and
//! registers it as an asset once uploaded.

use keel_app::{AssetKind, CancelToken, GameState, LoadTask, StateContext};
use keel_gpu::Texture;
use keel_input::KeyCode;
use tracing::{debug, info, warn};

use crate::pause::PausePopup;

const BACKGROUND_WIDTH: u32 = 256;
const BACKGROUND_HEIGHT: u32 = 256;

/// Name the background texture is registered under.
const BACKGROUND_ASSET: &str = "menu:background";

pub struct MenuState {
    load: Option<LoadTask<Vec<u8>>>,
}

impl MenuState {
    pub fn new() -> Self {
        Self { load: None }
    }
}

impl GameState for MenuState {
    fn name(&self) -> &str {
        "menu"
    }

    fn on_enter(&mut self) {
        self.load = Some(LoadTask::spawn("menu-load", |token| {
            generate_background(token, BACKGROUND_WIDTH, BACKGROUND_HEIGHT)
        }));
    }

    fn is_loading(&self) -> bool {
        self.load.is_some()
    }

    fn update_loading(&mut self, ctx: &mut StateContext) {
        if !self.load.as_ref().is_some_and(LoadTask::is_finished) {
            return;
        }
        let Some(mut task) = self.load.take() else {
            return;
        };
        let Some(pixels) = task.try_take() else {
            warn!("Background load worker died, continuing without a background");
            return;
        };

        match Texture::upload_rgba8(ctx.gpu, &pixels, BACKGROUND_WIDTH, BACKGROUND_HEIGHT) {
            Ok(texture) => {
                ctx.assets
                    .insert(AssetKind::Texture2D, BACKGROUND_ASSET, texture);
                ctx.events.trigger("menu:ready");
                info!("Menu background ready");
            }
            Err(e) => warn!("Background upload failed: {e}"),
        }
    }

    fn update(&mut self, ctx: &mut StateContext) {
        if ctx.input.is_just_pressed(KeyCode::Escape) {
            ctx.pop_state();
        }
        if ctx.input.is_just_pressed(KeyCode::KeyP) {
            ctx.push_popup(Box::new(PausePopup));
        }
        if ctx.input.is_held(KeyCode::KeyQ) {
            ctx.quit();
        }
    }

    fn draw(&mut self, ctx: &mut StateContext) {
        // Fired by update_loading earlier in the same tick.
        if ctx.events.triggered("menu:ready") {
            debug!(
                "Background registered, {} texture(s) live",
                ctx.assets.count(AssetKind::Texture2D)
            );
        }
    }
}

/// Fill an RGBA gradient, checking for cancellation between rows.
fn generate_background(token: &CancelToken, width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        if token.is_cancelled() {
            return pixels;
        }
        for x in 0..width {
            pixels.push((x * 255 / width) as u8);
            pixels.push((y * 255 / height) as u8);
            pixels.push(64);
            pixels.push(255);
        }
    }
    pixels
}
