//! Vulkan presentation core for the Keel engine.
//!
//! This crate provides:
//! - Vulkan instance and device management
//! - Surface and swapchain handling
//! - Memory allocation via gpu-allocator
//! - Command recording and frame synchronization
//! - The renderer loop that ties acquire, submit and present together

pub mod command;
pub mod context;
pub mod error;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod renderer;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod texture;

pub use command::{CommandPool, RecordDraw};
pub use context::{GpuContext, GpuContextBuilder};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer, GpuImage};
pub use pipeline::FramePipeline;
pub use renderer::{FrameOutcome, Renderer};
pub use surface::{SurfaceContext, SurfaceSupport};
pub use swapchain::{ImageAcquire, Swapchain};
pub use sync::{create_fence, create_semaphore, FrameSlot, FrameSlots, ImageFences};
pub use texture::Texture;
