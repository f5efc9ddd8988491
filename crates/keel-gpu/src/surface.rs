//! Window surface plumbing.
//!
//! Wraps the Vulkan surface and its extension loaders so the rest of
//! the engine never touches raw-window-handle types directly.

use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// Create a window surface.
///
/// # Safety
/// The instance must be valid and the window must outlive the surface.
pub unsafe fn create_surface<W>(
    entry: &ash::Entry,
    instance: &ash::Instance,
    window: &W,
) -> Result<vk::SurfaceKHR>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    let display = window
        .display_handle()
        .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
    let window_handle = window
        .window_handle()
        .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

    ash_window::create_surface(
        entry,
        instance,
        display.as_raw(),
        window_handle.as_raw(),
        None,
    )
    .map_err(|e| GpuError::SurfaceCreation(e.to_string()))
}

/// What a physical device reports for a surface.
pub struct SurfaceSupport {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Query the surface support a physical device reports.
///
/// # Safety
/// The surface and device handles must be valid.
pub unsafe fn query_surface_support(
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Result<SurfaceSupport> {
    let capabilities =
        surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?;
    let formats = surface_loader.get_physical_device_surface_formats(physical_device, surface)?;
    let present_modes =
        surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?;

    Ok(SurfaceSupport {
        capabilities,
        formats,
        present_modes,
    })
}

/// Surface context for windowed rendering.
///
/// Bundles the surface handle with the instance-level and device-level
/// extension loaders that operate on it.
pub struct SurfaceContext {
    /// The Vulkan surface handle.
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader.
    pub surface_loader: ash::khr::surface::Instance,
    /// Swapchain extension loader.
    pub swapchain_loader: ash::khr::swapchain::Device,
}

impl SurfaceContext {
    /// Query the support the given physical device reports for this surface.
    pub fn support(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceSupport> {
        unsafe { query_surface_support(&self.surface_loader, self.surface, physical_device) }
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// The surface must not be in use and must be destroyed before the
    /// instance.
    pub unsafe fn destroy(&self) {
        self.surface_loader.destroy_surface(self.surface, None);
    }
}
