//! Swapchain management.

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::surface::SurfaceContext;
use ash::vk;

/// Outcome of an image acquisition.
pub enum ImageAcquire {
    /// An image is ready. `suboptimal` flags a stale but usable chain.
    Ready { index: u32, suboptimal: bool },
    /// The chain no longer matches the surface; nothing was acquired.
    OutOfDate,
}

/// Swapchain wrapper.
///
/// A valid swapchain always has a non-zero extent and index-aligned
/// image and view lists.
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for the surface.
    ///
    /// Returns `Ok(None)` when the surface currently has no drawable
    /// area (minimized window). That is the expected transient case,
    /// not an error.
    ///
    /// # Safety
    /// The context and surface must be valid.
    pub unsafe fn create(
        gpu: &GpuContext,
        surface: &SurfaceContext,
        width: u32,
        height: u32,
    ) -> Result<Option<Self>> {
        let support = surface.support(gpu.physical_device())?;

        let Some(extent) = surface_extent(&support.capabilities, width, height) else {
            return Ok(None);
        };

        let surface_format = select_surface_format(&support.formats);
        let present_mode = select_present_mode(&support.present_modes);
        let image_count = select_image_count(&support.capabilities);

        let queue_families = [gpu.graphics_queue_family(), gpu.present_queue_family()];
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        // Images are shared across distinct graphics and present families
        create_info = if queue_families[0] == queue_families[1] {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_families)
        };

        let swapchain = surface
            .swapchain_loader
            .create_swapchain(&create_info, None)
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        // The presentation engine owns the images; we only hold handles
        let images = surface.swapchain_loader.get_swapchain_images(swapchain)?;

        let image_views: Vec<_> = images
            .iter()
            .map(|&image| {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(
                        vk::ImageSubresourceRange::default()
                            .aspect_mask(vk::ImageAspectFlags::COLOR)
                            .base_mip_level(0)
                            .level_count(1)
                            .base_array_layer(0)
                            .layer_count(1),
                    );

                gpu.device().create_image_view(&view_info, None)
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Swapchain created: {}x{}, {} images, {:?}",
            extent.width,
            extent.height,
            images.len(),
            present_mode
        );

        Ok(Some(Self {
            swapchain,
            images,
            image_views,
            format: surface_format.format,
            extent,
        }))
    }

    /// Acquire the next image, signaling `semaphore` when it is usable.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn acquire(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        semaphore: vk::Semaphore,
    ) -> Result<ImageAcquire> {
        let result = swapchain_loader.acquire_next_image(
            self.swapchain,
            u64::MAX,
            semaphore,
            vk::Fence::null(),
        );

        match result {
            Ok((index, suboptimal)) => Ok(ImageAcquire::Ready { index, suboptimal }),
            // OUT_OF_DATE means no image was acquired; the caller must
            // rebuild the chain before trying again.
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(ImageAcquire::OutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Present an image. Returns `true` when the chain needs a rebuild
    /// (out of date or suboptimal); the present itself still happened.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn present(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = swapchain_loader.queue_present(queue, &present_info);

        match result {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(e) => Err(GpuError::Presentation(e)),
        }
    }

    /// Destroy the image views and the swapchain handle. The images
    /// themselves belong to the presentation engine and are not
    /// destroyed here.
    ///
    /// # Safety
    /// The swapchain must not be in use.
    pub unsafe fn destroy(
        &self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) {
        for &view in &self.image_views {
            device.destroy_image_view(view, None);
        }
        swapchain_loader.destroy_swapchain(self.swapchain, None);
    }
}

/// Select the surface format, preferring 8-bit sRGB.
#[must_use]
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    for format in available {
        if format.format == vk::Format::B8G8R8A8_SRGB
            && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        {
            return *format;
        }
    }

    // Fall back to first available; device selection guarantees the
    // list is non-empty
    available[0]
}

/// Select the present mode: low-latency triple buffering when the
/// driver offers it, else the universally supported FIFO.
///
/// # Panics
/// Panics on an empty list; device selection rejects such devices.
#[must_use]
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    assert!(!available.is_empty(), "present mode list is empty");

    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Derive the swapchain extent, or `None` when the surface has no
/// drawable area.
///
/// A fixed `current_extent` (width not `u32::MAX`) is used verbatim;
/// otherwise the framebuffer size is clamped into the supported range.
/// Zero-area inputs and zero-area results both yield `None` so that a
/// degenerate extent never reaches swapchain creation.
#[must_use]
pub fn surface_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    framebuffer_width: u32,
    framebuffer_height: u32,
) -> Option<vk::Extent2D> {
    if framebuffer_width == 0 || framebuffer_height == 0 {
        return None;
    }

    let extent = if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: framebuffer_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: framebuffer_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    };

    (extent.width > 0 && extent.height > 0).then_some(extent)
}

/// Number of images to request: one more than the driver minimum,
/// clamped when the driver caps the count (zero max means uncapped).
#[must_use]
pub fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
        image_count = capabilities.max_image_count;
    }
    image_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn caps(
        min_count: u32,
        max_count: u32,
        current: (u32, u32),
        min_extent: (u32, u32),
        max_extent: (u32, u32),
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D {
                width: min_extent.0,
                height: min_extent.1,
            },
            max_image_extent: vk::Extent2D {
                width: max_extent.0,
                height: max_extent.1,
            },
            ..Default::default()
        }
    }

    #[test]
    fn srgb_format_preferred() {
        let available = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = select_surface_format(&available);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn first_format_when_srgb_missing() {
        let available = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R16G16B16A16_SFLOAT, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = select_surface_format(&available);
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn mailbox_preferred_over_fifo() {
        let available = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(select_present_mode(&available), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn fifo_when_mailbox_missing() {
        let available = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(select_present_mode(&available), vk::PresentModeKHR::FIFO);
    }

    #[test]
    #[should_panic(expected = "present mode list is empty")]
    fn empty_present_mode_list_panics() {
        select_present_mode(&[]);
    }

    #[test]
    fn fixed_current_extent_used_verbatim() {
        let caps = caps(2, 0, (1280, 720), (1, 1), (4096, 4096));
        let extent = surface_extent(&caps, 640, 480).unwrap();
        assert_eq!((extent.width, extent.height), (1280, 720));
    }

    #[test]
    fn free_extent_clamps_framebuffer_size() {
        let caps = caps(2, 0, (u32::MAX, u32::MAX), (100, 100), (2048, 2048));

        let small = surface_extent(&caps, 10, 10).unwrap();
        assert_eq!((small.width, small.height), (100, 100));

        let large = surface_extent(&caps, 5000, 5000).unwrap();
        assert_eq!((large.width, large.height), (2048, 2048));

        let inside = surface_extent(&caps, 800, 600).unwrap();
        assert_eq!((inside.width, inside.height), (800, 600));
    }

    #[test]
    fn zero_inputs_never_reach_creation() {
        // Even when clamping would produce a positive extent
        let clamping = caps(2, 0, (u32::MAX, u32::MAX), (1, 1), (4096, 4096));
        assert!(surface_extent(&clamping, 0, 600).is_none());
        assert!(surface_extent(&clamping, 800, 0).is_none());
        assert!(surface_extent(&clamping, 0, 0).is_none());

        let fixed = caps(2, 0, (800, 600), (1, 1), (4096, 4096));
        assert!(surface_extent(&fixed, 0, 0).is_none());
    }

    #[test]
    fn fixed_zero_extent_is_invalid() {
        // Minimized windows report a fixed 0x0 extent
        let caps = caps(2, 0, (0, 0), (0, 0), (4096, 4096));
        assert!(surface_extent(&caps, 800, 600).is_none());
    }

    #[test]
    fn image_count_is_min_plus_one() {
        assert_eq!(select_image_count(&caps(2, 8, (1, 1), (1, 1), (1, 1))), 3);
    }

    #[test]
    fn image_count_clamped_by_max() {
        assert_eq!(select_image_count(&caps(3, 3, (1, 1), (1, 1), (1, 1))), 3);
    }

    #[test]
    fn zero_max_means_uncapped() {
        assert_eq!(select_image_count(&caps(7, 0, (1, 1), (1, 1), (1, 1))), 8);
    }
}
