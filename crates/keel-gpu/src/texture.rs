//! Staged texture upload.

use crate::command::with_one_shot;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::memory::GpuImage;
use ash::vk;
use gpu_allocator::MemoryLocation;

/// A sampled color image with its view.
pub struct Texture {
    pub image: GpuImage,
    pub view: vk::ImageView,
}

impl Texture {
    /// Upload tightly packed RGBA8 pixels into a device-local sampled
    /// image: stage in a host-visible buffer, copy, and transition to
    /// shader-read layout. Blocks until the copy has drained.
    pub fn upload_rgba8(gpu: &GpuContext, pixels: &[u8], width: u32, height: u32) -> Result<Self> {
        let size = u64::from(width) * u64::from(height) * 4;
        if pixels.len() as u64 != size {
            return Err(GpuError::InvalidState(format!(
                "pixel buffer is {} bytes, expected {size} for {width}x{height}",
                pixels.len()
            )));
        }

        let mut staging = gpu.allocator().lock().create_buffer(
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "texture staging",
        )?;
        staging.write(pixels)?;

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(vk::Format::R8G8B8A8_SRGB)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let mut image =
            gpu.allocator()
                .lock()
                .create_image(&image_info, MemoryLocation::GpuOnly, "texture")?;

        let upload = unsafe {
            with_one_shot(
                gpu.device(),
                gpu.command_pool(),
                gpu.graphics_queue(),
                |cmd| {
                    image_barrier(
                        gpu.device(),
                        cmd,
                        image.image,
                        vk::ImageLayout::UNDEFINED,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        vk::AccessFlags::empty(),
                        vk::AccessFlags::TRANSFER_WRITE,
                        vk::PipelineStageFlags::TOP_OF_PIPE,
                        vk::PipelineStageFlags::TRANSFER,
                    );
                    copy_buffer_to_image(
                        gpu.device(),
                        cmd,
                        staging.buffer,
                        image.image,
                        width,
                        height,
                    );
                    image_barrier(
                        gpu.device(),
                        cmd,
                        image.image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                        vk::AccessFlags::TRANSFER_WRITE,
                        vk::AccessFlags::SHADER_READ,
                        vk::PipelineStageFlags::TRANSFER,
                        vk::PipelineStageFlags::FRAGMENT_SHADER,
                    );
                },
            )
        };

        // The staging buffer is transient either way
        let staging_freed = gpu.allocator().lock().free_buffer(&mut staging);

        if let Err(e) = upload {
            let _ = gpu.allocator().lock().free_image(&mut image);
            return Err(e);
        }
        staging_freed?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_SRGB)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = match unsafe { gpu.device().create_image_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                let _ = gpu.allocator().lock().free_image(&mut image);
                return Err(GpuError::from(e));
            }
        };

        tracing::debug!("Texture uploaded: {width}x{height}");

        Ok(Self { image, view })
    }

    /// Pixel width of the image.
    pub fn width(&self) -> u32 {
        self.image.extent.width
    }

    /// Pixel height of the image.
    pub fn height(&self) -> u32 {
        self.image.extent.height
    }

    /// Destroy the view and free the image.
    ///
    /// # Safety
    /// The texture must not be in use.
    pub unsafe fn destroy(&mut self, gpu: &GpuContext) -> Result<()> {
        gpu.device().destroy_image_view(self.view, None);
        self.view = vk::ImageView::null();
        gpu.allocator().lock().free_image(&mut self.image)
    }
}

/// Record a whole-image layout transition barrier.
#[allow(clippy::too_many_arguments)]
unsafe fn image_barrier(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
) {
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        )
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    device.cmd_pipeline_barrier(
        cmd,
        src_stage,
        dst_stage,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );
}

/// Record a full-extent buffer-to-image copy.
unsafe fn copy_buffer_to_image(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    buffer: vk::Buffer,
    image: vk::Image,
    width: u32,
    height: u32,
) {
    let region = vk::BufferImageCopy::default()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(
            vk::ImageSubresourceLayers::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .mip_level(0)
                .base_array_layer(0)
                .layer_count(1),
        )
        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
        .image_extent(vk::Extent3D {
            width,
            height,
            depth: 1,
        });

    device.cmd_copy_buffer_to_image(
        cmd,
        buffer,
        image,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        &[region],
    );
}
