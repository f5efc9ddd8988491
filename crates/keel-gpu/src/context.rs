//! GPU context management.

use crate::command::CommandPool;
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, DebugMessenger};
use crate::memory::GpuAllocator;
use crate::surface::{create_surface, query_surface_support, SurfaceContext};
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;
use std::sync::Arc;

/// Main GPU context holding Vulkan resources.
pub struct GpuContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) debug: Option<DebugMessenger>,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) allocator: Mutex<GpuAllocator>,
    pub(crate) command_pool: CommandPool,

    // Queue families and queues
    pub(crate) graphics_queue_family: u32,
    pub(crate) present_queue_family: u32,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
}

impl GpuContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the present queue. May be the graphics queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Get the graphics queue family index.
    pub fn graphics_queue_family(&self) -> u32 {
        self.graphics_queue_family
    }

    /// Get the present queue family index.
    pub fn present_queue_family(&self) -> u32 {
        self.present_queue_family
    }

    /// Get the context-owned command pool.
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    /// Get access to the GPU allocator.
    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Shutdown allocator BEFORE destroying device
            // This frees all VkDeviceMemory allocations
            self.allocator.lock().shutdown();

            self.command_pool.destroy(&self.device);
            self.device.destroy_device(None);

            if let Some(debug) = &self.debug {
                debug.destroy();
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    app_version: (u32, u32, u32),
    enable_diagnostics: bool,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Keel".to_string(),
            app_version: (0, 1, 0),
            enable_diagnostics: cfg!(debug_assertions),
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Set the application version.
    pub fn app_version(mut self, version: (u32, u32, u32)) -> Self {
        self.app_version = version;
        self
    }

    /// Enable or disable diagnostic layers.
    pub fn diagnostics(mut self, enable: bool) -> Self {
        self.enable_diagnostics = enable;
        self
    }

    /// Build the GPU context and the surface for `window`.
    ///
    /// The surface is created before device selection because candidate
    /// devices are judged against it.
    pub fn build<W>(self, window: &W) -> Result<(GpuContext, SurfaceContext)>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        // Load Vulkan entry point
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        // Create Vulkan instance
        let (instance, diagnostics_active) = unsafe {
            create_instance(
                &entry,
                &self.app_name,
                self.app_version,
                self.enable_diagnostics,
            )
        }?;

        let debug = if diagnostics_active {
            Some(unsafe { DebugMessenger::install(&entry, &instance) }?)
        } else {
            None
        };

        let surface = unsafe { create_surface(&entry, &instance, window) }?;
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        // First complete candidate wins
        let (physical_device, families) =
            unsafe { select_physical_device(&instance, &surface_loader, surface) }?;

        // Create logical device
        let (device, graphics_queue, present_queue) =
            unsafe { create_device(&instance, physical_device, &families) }?;

        let device = Arc::new(device);

        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

        // Create GPU allocator
        let allocator = unsafe { GpuAllocator::new(&instance, device.clone(), physical_device) }?;

        let command_pool = unsafe { CommandPool::new(&device, families.graphics) }?;

        let gpu = GpuContext {
            entry,
            instance,
            debug,
            physical_device,
            device,
            allocator: Mutex::new(allocator),
            command_pool,
            graphics_queue_family: families.graphics,
            present_queue_family: families.present,
            graphics_queue,
            present_queue,
        };

        let surface = SurfaceContext {
            surface,
            surface_loader,
            swapchain_loader,
        };

        Ok((gpu, surface))
    }
}

/// Queue family indices required for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueFamilies {
    graphics: u32,
    present: u32,
}

/// Scan queue families for the first graphics-capable family and the
/// first family that can present. Returns `None` if either is missing,
/// marking the candidate incomplete.
fn complete_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> Option<QueueFamilies>
where
    F: FnMut(u32) -> bool,
{
    let mut graphics = None;
    let mut present = None;

    for (index, family) in families.iter().enumerate() {
        if family.queue_count == 0 {
            continue;
        }
        let index = index as u32;

        if graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            graphics = Some(index);
        }
        if present.is_none() && supports_present(index) {
            present = Some(index);
        }
        if graphics.is_some() && present.is_some() {
            break;
        }
    }

    Some(QueueFamilies {
        graphics: graphics?,
        present: present?,
    })
}

/// Required device extensions.
fn required_device_extensions() -> Vec<&'static CStr> {
    vec![ash::khr::swapchain::NAME]
}

/// True when every required extension name appears in `available`.
fn extensions_contained(required: &[&CStr], available: &[&CStr]) -> bool {
    required.iter().all(|req| available.contains(req))
}

/// Select the first physical device able to drive the surface.
///
/// Candidates are examined in enumeration order; the first exposing a
/// graphics queue, a present-capable queue, the swapchain extension,
/// and at least one surface format and present mode wins. Deterministic
/// for a fixed device list.
///
/// # Safety
/// The instance and surface must be valid.
unsafe fn select_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
    let devices = instance.enumerate_physical_devices()?;

    for device in devices {
        let family_props = instance.get_physical_device_queue_family_properties(device);
        let Some(families) = complete_queue_families(&family_props, |index| {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .unwrap_or(false)
        }) else {
            continue;
        };

        let extension_props = instance.enumerate_device_extension_properties(device)?;
        let available: Vec<&CStr> = extension_props
            .iter()
            .map(|props| CStr::from_ptr(props.extension_name.as_ptr()))
            .collect();
        if !extensions_contained(&required_device_extensions(), &available) {
            continue;
        }

        let support = query_surface_support(surface_loader, surface, device)?;
        if support.formats.is_empty() || support.present_modes.is_empty() {
            continue;
        }

        let props = instance.get_physical_device_properties(device);
        let name = CStr::from_ptr(props.device_name.as_ptr());
        tracing::info!("Selected GPU: {}", name.to_string_lossy());

        return Ok((device, families));
    }

    Err(GpuError::NoSuitableDevice)
}

/// Create the logical device and retrieve queues.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: &QueueFamilies,
) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
    // Graphics and present may share a family
    let mut unique_families = std::collections::HashSet::new();
    unique_families.insert(families.graphics);
    unique_families.insert(families.present);

    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extensions = required_device_extensions();
    let extension_names: Vec<*const i8> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    // No optional device features are requested
    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names);

    let device = instance
        .create_device(physical_device, &device_create_info, None)
        .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

    let graphics_queue = device.get_device_queue(families.graphics, 0);
    let present_queue = device.get_device_queue(families.present, 0);

    Ok((device, graphics_queue, present_queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn first_graphics_and_first_present_families_win() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 4),
            family(vk::QueueFlags::GRAPHICS, 2),
        ];

        // Present support only on the transfer-only family
        let found = complete_queue_families(&families, |index| index == 0).unwrap();
        assert_eq!(found, QueueFamilies { graphics: 1, present: 0 });
    }

    #[test]
    fn shared_family_serves_both_roles() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        let found = complete_queue_families(&families, |_| true).unwrap();
        assert_eq!(found, QueueFamilies { graphics: 0, present: 0 });
    }

    #[test]
    fn incomplete_candidates_are_rejected() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        assert!(complete_queue_families(&families, |_| false).is_none());

        let compute_only = [family(vk::QueueFlags::COMPUTE, 1)];
        assert!(complete_queue_families(&compute_only, |_| true).is_none());
    }

    #[test]
    fn empty_families_are_skipped() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 0),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        let found = complete_queue_families(&families, |index| index == 1).unwrap();
        assert_eq!(found, QueueFamilies { graphics: 1, present: 1 });
    }

    #[test]
    fn scan_is_deterministic() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        let a = complete_queue_families(&families, |_| true).unwrap();
        let b = complete_queue_families(&families, |_| true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn extension_check_requires_all_names() {
        let required = [ash::khr::swapchain::NAME];
        let with: Vec<&CStr> = vec![c"VK_KHR_something", ash::khr::swapchain::NAME];
        let without: Vec<&CStr> = vec![c"VK_KHR_something"];

        assert!(extensions_contained(&required, &with));
        assert!(!extensions_contained(&required, &without));
    }
}
