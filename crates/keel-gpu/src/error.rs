//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No physical device exposes graphics + present queues, the
    /// swapchain extension, and a usable surface format.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Instance creation failed.
    #[error("Instance creation failed: {0}")]
    InstanceCreation(String),

    /// Logical device creation failed.
    #[error("Device creation failed: {0}")]
    DeviceCreation(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Shader compilation failed.
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Command buffer recording failed. The device is effectively lost.
    #[error("Command recording failed: {0}")]
    Recording(vk::Result),

    /// Queue submission failed. The device is effectively lost.
    #[error("Queue submission failed: {0}")]
    Submission(vk::Result),

    /// Presentation failed for a reason other than an outdated or
    /// suboptimal swapchain.
    #[error("Presentation failed: {0}")]
    Presentation(vk::Result),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
