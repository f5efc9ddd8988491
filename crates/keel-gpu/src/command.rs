//! Command pool and command buffer recording.

use crate::error::{GpuError, Result};
use crate::pipeline::FramePipeline;
use crate::swapchain::Swapchain;
use ash::vk;

/// External draw hook invoked once per command buffer while recording.
///
/// Recording happens per swapchain generation, not per tick; the hook
/// sees each image index exactly once per rebuild.
pub trait RecordDraw {
    /// Record draw commands into `cmd` for the given swapchain image.
    fn record(&mut self, cmd: vk::CommandBuffer, image_index: u32);
}

impl<F: FnMut(vk::CommandBuffer, u32)> RecordDraw for F {
    fn record(&mut self, cmd: vk::CommandBuffer, image_index: u32) {
        self(cmd, image_index);
    }
}

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(device: &ash::Device, queue_family: u32) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default().queue_family_index(queue_family);

        let pool = device.create_command_pool(&create_info, None)?;

        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate a single command buffer.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffer(
        &self,
        device: &ash::Device,
        level: vk::CommandBufferLevel,
    ) -> Result<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(level)
            .command_buffer_count(1);

        let buffers = device.allocate_command_buffers(&alloc_info)?;
        Ok(buffers[0])
    }

    /// Allocate multiple command buffers.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffers(
        &self,
        device: &ash::Device,
        level: vk::CommandBufferLevel,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(level)
            .command_buffer_count(count);

        let buffers = device.allocate_command_buffers(&alloc_info)?;
        Ok(buffers)
    }

    /// Destroy the command pool.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_command_pool(self.pool, None);
    }
}

/// Begin recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn begin_command_buffer(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    flags: vk::CommandBufferUsageFlags,
) -> Result<()> {
    let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
    device.begin_command_buffer(cmd, &begin_info)?;
    Ok(())
}

/// End recording a command buffer.
///
/// # Safety
/// The device and command buffer must be valid.
pub unsafe fn end_command_buffer(device: &ash::Device, cmd: vk::CommandBuffer) -> Result<()> {
    device.end_command_buffer(cmd)?;
    Ok(())
}

/// Submit command buffers to a queue.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn submit_command_buffers(
    device: &ash::Device,
    queue: vk::Queue,
    command_buffers: &[vk::CommandBuffer],
    wait_semaphores: &[vk::Semaphore],
    wait_stages: &[vk::PipelineStageFlags],
    signal_semaphores: &[vk::Semaphore],
    fence: vk::Fence,
) -> Result<()> {
    let submit_info = vk::SubmitInfo::default()
        .command_buffers(command_buffers)
        .wait_semaphores(wait_semaphores)
        .wait_dst_stage_mask(wait_stages)
        .signal_semaphores(signal_semaphores);

    device
        .queue_submit(queue, &[submit_info], fence)
        .map_err(GpuError::Submission)?;
    Ok(())
}

/// Record one static primary command buffer per framebuffer: begin,
/// clear pass, bind pipeline, external draw hook, end.
///
/// Recording failures map to [`GpuError::Recording`]; they indicate a
/// lost device and are not recoverable.
///
/// # Safety
/// All handles must be valid and the pipeline must have been built for
/// this swapchain.
pub unsafe fn record_draw_buffers(
    device: &ash::Device,
    pool: &CommandPool,
    pipeline: &FramePipeline,
    swapchain: &Swapchain,
    recorder: &mut dyn RecordDraw,
) -> Result<Vec<vk::CommandBuffer>> {
    let count = u32::try_from(pipeline.framebuffers.len())
        .map_err(|_| GpuError::InvalidState("framebuffer count exceeds u32".to_string()))?;
    let buffers = pool.allocate_command_buffers(device, vk::CommandBufferLevel::PRIMARY, count)?;

    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue {
            float32: [0.0, 0.0, 0.0, 1.0],
        },
    }];

    for (index, (&cmd, &framebuffer)) in buffers.iter().zip(&pipeline.framebuffers).enumerate() {
        let begin_info = vk::CommandBufferBeginInfo::default();
        device
            .begin_command_buffer(cmd, &begin_info)
            .map_err(GpuError::Recording)?;

        let pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(pipeline.render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: swapchain.extent,
            })
            .clear_values(&clear_values);

        device.cmd_begin_render_pass(cmd, &pass_info, vk::SubpassContents::INLINE);
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);

        recorder.record(cmd, index as u32);

        device.cmd_end_render_pass(cmd);
        device.end_command_buffer(cmd).map_err(GpuError::Recording)?;
    }

    Ok(buffers)
}

/// Run `f` inside a one-time command buffer, submit it, and block until
/// the queue drains. The buffer is freed on every path, including
/// submission failure.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn with_one_shot<F>(
    device: &ash::Device,
    pool: &CommandPool,
    queue: vk::Queue,
    f: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let cmd = pool.allocate_command_buffer(device, vk::CommandBufferLevel::PRIMARY)?;

    let result: Result<()> = (|| {
        begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        f(cmd);
        end_command_buffer(device, cmd)?;

        let cmd_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&cmd_buffers);
        device.queue_submit(queue, &[submit_info], vk::Fence::null())?;
        device.queue_wait_idle(queue)?;
        Ok(())
    })();

    device.free_command_buffers(pool.handle(), &[cmd]);

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_record_through_the_trait_seam() {
        let mut seen = Vec::new();
        let mut recorder = |_cmd: vk::CommandBuffer, index: u32| seen.push(index);

        let hook: &mut dyn RecordDraw = &mut recorder;
        hook.record(vk::CommandBuffer::null(), 0);
        hook.record(vk::CommandBuffer::null(), 2);
        hook.record(vk::CommandBuffer::null(), 1);

        assert_eq!(seen, vec![0, 2, 1]);
    }
}
