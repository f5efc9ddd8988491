//! Engine runner and event loop.

use std::sync::Arc;
use std::time::Instant;

use ash::vk;
use keel_gpu::{FrameOutcome, GpuContext, GpuContextBuilder, Renderer, SurfaceContext, Texture};
use keel_input::InputManager;
use tracing::{debug, error, info, trace};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::assets::{AssetKind, AssetStore};
use crate::config::EngineConfig;
use crate::events::EventBus;
use crate::state::{GameState, StateCommand, StateContext, StateStack};

/// Run the engine with the given configuration and initial state.
///
/// This function initializes logging, creates the window and GPU
/// context, and drives the event loop until the state stack empties or
/// the window is closed.
pub fn run(config: EngineConfig, first_state: Box<dyn GameState>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = EngineRunner {
        config,
        first_state: Some(first_state),
        state: None,
    };

    event_loop.run_app(&mut runner)?;

    Ok(())
}

/// Internal runner that implements winit's ApplicationHandler.
struct EngineRunner {
    config: EngineConfig,
    first_state: Option<Box<dyn GameState>>,
    state: Option<EngineState>,
}

/// Everything alive between window creation and shutdown.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    surface: SurfaceContext,
    renderer: Renderer,
    input: InputManager,
    events: EventBus,
    assets: AssetStore,
    stack: StateStack,
    commands: Vec<StateCommand>,
    last_tick: Instant,
}

impl ApplicationHandler for EngineRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating engine state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Engine ready!");
            }
            Err(e) => {
                error!("Failed to initialize engine: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        // Keyboard input is consumed before general event handling
        if let Some(state) = &mut self.state {
            if state.input.process_window_event(&event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(mut state) = self.state.take() {
                    state.cleanup();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.renderer.request_resize();
                    debug!("Resize requested: {}x{}", size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let mut shutdown = false;
                if let Some(state) = &mut self.state {
                    if state.stack.is_empty() {
                        info!("State stack empty, shutting down");
                        shutdown = true;
                    } else if let Err(e) = state.tick() {
                        error!("Fatal render error: {e}");
                        shutdown = true;
                    } else {
                        state.window.request_redraw();
                    }
                }
                if shutdown {
                    if let Some(mut state) = self.state.take() {
                        state.cleanup();
                    }
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

impl EngineRunner {
    fn create_state(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<EngineState> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let (gpu, surface) = GpuContextBuilder::new()
            .app_name(&self.config.title)
            .app_version(self.config.version)
            .diagnostics(self.config.diagnostics)
            .build(window.as_ref())?;

        let size = window.inner_size();
        let device = gpu.device();
        let mut recorder = move |cmd: vk::CommandBuffer, _image_index: u32| {
            // Three vertices, no vertex buffer: the shader synthesizes the triangle.
            unsafe { device.cmd_draw(cmd, 3, 1, 0, 0) };
        };
        let renderer = Renderer::new(
            &gpu,
            &surface,
            &mut recorder,
            self.config.frames_in_flight,
            size.width,
            size.height,
        )?;

        let mut stack = StateStack::new();
        if let Some(first) = self.first_state.take() {
            stack.push_state(first);
        }

        Ok(EngineState {
            window,
            gpu,
            surface,
            renderer,
            input: InputManager::new(),
            events: EventBus::new(),
            assets: AssetStore::new(),
            stack,
            commands: Vec::new(),
            last_tick: Instant::now(),
        })
    }
}

impl EngineState {
    /// One engine tick: update the active state, apply queued stack
    /// commands, run draw hooks, present a frame, retire per-tick data.
    fn tick(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        let mut ctx = StateContext::new(
            &self.gpu,
            &self.input,
            &mut self.events,
            &mut self.assets,
            dt,
            &mut self.commands,
        );
        self.stack.update(&mut ctx);
        self.stack.apply(&mut self.commands);

        if self.stack.is_empty() {
            // Quit was requested this tick; the next tick shuts down.
            return Ok(());
        }

        let mut ctx = StateContext::new(
            &self.gpu,
            &self.input,
            &mut self.events,
            &mut self.assets,
            dt,
            &mut self.commands,
        );
        self.stack.draw(&mut ctx);

        let size = self.window.inner_size();
        let device = self.gpu.device();
        let mut recorder = move |cmd: vk::CommandBuffer, _image_index: u32| {
            // Three vertices, no vertex buffer: the shader synthesizes the triangle.
            unsafe { device.cmd_draw(cmd, 3, 1, 0, 0) };
        };
        let outcome = self.renderer.draw_frame(
            &self.gpu,
            &self.surface,
            &mut recorder,
            size.width,
            size.height,
        )?;
        match outcome {
            FrameOutcome::Presented => {}
            FrameOutcome::Skipped => trace!("Swapchain rebuilt, frame skipped"),
            FrameOutcome::Suspended => trace!("Zero-area surface, frame skipped"),
        }

        self.input.end_frame();
        self.events.end_frame();

        Ok(())
    }

    fn cleanup(&mut self) {
        info!("Starting cleanup...");

        // Exit hooks run before GPU teardown so states can drop their
        // background tasks first.
        self.stack.clear();
        self.commands.clear();

        if let Err(e) = self.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        for mut texture in self.assets.remove_all::<Texture>(AssetKind::Texture2D) {
            if let Err(e) = unsafe { texture.destroy(&self.gpu) } {
                error!("Failed to destroy texture: {e}");
            }
        }

        unsafe {
            self.renderer.destroy(&self.gpu, &self.surface);
            self.surface.destroy();
        }

        info!("Cleanup complete");
    }
}
