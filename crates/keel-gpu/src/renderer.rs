//! Frame lifecycle: acquire, submit, present, recover.
//!
//! The [`Renderer`] owns a fixed ring of [`FrameSlot`]s and, when the
//! surface has drawable area, one [`PresentChain`] generation. Slots
//! survive any number of chain rebuilds; the per-image fence tracker is
//! resized and cleared on each rebuild.
//!
//! [`FrameSlot`]: crate::sync::FrameSlot

use crate::command::{record_draw_buffers, submit_command_buffers, RecordDraw};
use crate::context::GpuContext;
use crate::error::Result;
use crate::pipeline::FramePipeline;
use crate::surface::SurfaceContext;
use crate::swapchain::{ImageAcquire, Swapchain};
use crate::sync::{reset_fence, wait_for_fence, FrameSlots, ImageFences};
use ash::vk;

/// What a tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and presented.
    Presented,
    /// The chain was stale and has been rebuilt; nothing was drawn.
    Skipped,
    /// The surface has no drawable area; nothing was drawn.
    Suspended,
}

/// One swapchain generation: the chain, its pipeline bundle, and the
/// command buffers prerecorded for it. Built and destroyed as a unit.
struct PresentChain {
    swapchain: Swapchain,
    pipeline: FramePipeline,
    draw_buffers: Vec<vk::CommandBuffer>,
}

impl PresentChain {
    /// Build a generation, or `None` while the surface has no area.
    ///
    /// # Safety
    /// The context and surface must be valid.
    unsafe fn build(
        gpu: &GpuContext,
        surface: &SurfaceContext,
        recorder: &mut dyn RecordDraw,
        width: u32,
        height: u32,
    ) -> Result<Option<Self>> {
        let Some(swapchain) = Swapchain::create(gpu, surface, width, height)? else {
            return Ok(None);
        };

        let pipeline = FramePipeline::build(gpu.device(), &swapchain)?;
        let draw_buffers = record_draw_buffers(
            gpu.device(),
            gpu.command_pool(),
            &pipeline,
            &swapchain,
            recorder,
        )?;

        Ok(Some(Self {
            swapchain,
            pipeline,
            draw_buffers,
        }))
    }

    /// Destroy the generation in dependency order: command buffers,
    /// then framebuffers and pipeline, then views and chain.
    ///
    /// # Safety
    /// The device must be idle.
    unsafe fn destroy(&self, gpu: &GpuContext, surface: &SurfaceContext) {
        gpu.device()
            .free_command_buffers(gpu.command_pool().handle(), &self.draw_buffers);
        self.pipeline.destroy(gpu.device());
        self.swapchain
            .destroy(gpu.device(), &surface.swapchain_loader);
    }
}

/// Drives the per-tick frame loop and swapchain recovery.
pub struct Renderer {
    slots: FrameSlots,
    image_fences: ImageFences,
    chain: Option<PresentChain>,
    resize_requested: bool,
}

impl Renderer {
    /// Create the renderer with `frames_in_flight` slots and an initial
    /// chain for the `width` x `height` framebuffer. A zero-area
    /// framebuffer leaves the chain absent until a later tick.
    pub fn new(
        gpu: &GpuContext,
        surface: &SurfaceContext,
        recorder: &mut dyn RecordDraw,
        frames_in_flight: usize,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let slots = unsafe { FrameSlots::new(gpu.device(), frames_in_flight) }?;
        let chain = unsafe { PresentChain::build(gpu, surface, recorder, width, height) }?;
        let image_count = chain.as_ref().map_or(0, |c| c.swapchain.images.len());

        Ok(Self {
            slots,
            image_fences: ImageFences::new(image_count),
            chain,
            resize_requested: false,
        })
    }

    /// Note a window resize. The chain is rebuilt at the end of the
    /// next presented frame rather than mid-flight.
    pub fn request_resize(&mut self) {
        self.resize_requested = true;
    }

    /// Run one frame: throttle on the slot fence, acquire, wait out any
    /// frame still using the image, submit, present, advance. Stale
    /// chains are rebuilt here; only fatal submission or presentation
    /// failures surface as errors.
    pub fn draw_frame(
        &mut self,
        gpu: &GpuContext,
        surface: &SurfaceContext,
        recorder: &mut dyn RecordDraw,
        width: u32,
        height: u32,
    ) -> Result<FrameOutcome> {
        // A zero-area surface earlier left us without a chain: retry
        // creation only, nothing else was torn down
        if self.chain.is_none() {
            self.chain = unsafe { PresentChain::build(gpu, surface, recorder, width, height) }?;
            if let Some(chain) = &self.chain {
                self.image_fences.reset(chain.swapchain.images.len());
            }
        }
        let Some(chain) = &self.chain else {
            return Ok(FrameOutcome::Suspended);
        };

        let device = gpu.device();
        let slot = self.slots.current();
        let image_available = slot.image_available;
        let render_finished = slot.render_finished;
        let in_flight = slot.in_flight;

        // Throttle to the ring: this slot's previous frame must be done
        unsafe { wait_for_fence(device, in_flight, u64::MAX) }?;

        let acquired =
            unsafe { chain.swapchain.acquire(&surface.swapchain_loader, image_available) }?;
        let (image_index, suboptimal) = match acquired {
            ImageAcquire::Ready { index, suboptimal } => (index, suboptimal),
            ImageAcquire::OutOfDate => {
                // Nothing was acquired and the slot's semaphore is
                // still unsignaled, so the cursor must not advance
                self.recreate(gpu, surface, recorder, width, height)?;
                return Ok(FrameOutcome::Skipped);
            }
        };
        let image = image_index as usize;

        // The image can still belong to an older frame when slots
        // outnumber images
        if let Some(pending) = self.image_fences.pending(image) {
            unsafe { wait_for_fence(device, pending, u64::MAX) }?;
        }
        self.image_fences.assign(image, in_flight);

        // Reset only once this slot is certain to submit
        unsafe { reset_fence(device, in_flight) }?;

        let command_buffers = [chain.draw_buffers[image]];
        let wait_semaphores = [image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [render_finished];
        unsafe {
            submit_command_buffers(
                device,
                gpu.graphics_queue(),
                &command_buffers,
                &wait_semaphores,
                &wait_stages,
                &signal_semaphores,
                in_flight,
            )
        }?;

        let present_wait = [render_finished];
        let needs_rebuild = unsafe {
            chain.swapchain.present(
                &surface.swapchain_loader,
                gpu.present_queue(),
                image_index,
                &present_wait,
            )
        }?;

        self.slots.advance();

        // The present itself succeeded; the chain is refreshed before
        // the next frame needs it
        if needs_rebuild || suboptimal || self.resize_requested {
            self.resize_requested = false;
            self.recreate(gpu, surface, recorder, width, height)?;
        }

        Ok(FrameOutcome::Presented)
    }

    /// Tear down the current generation and build the next one. While
    /// the surface reports zero area the chain stays absent and later
    /// ticks retry creation without tearing anything else down.
    fn recreate(
        &mut self,
        gpu: &GpuContext,
        surface: &SurfaceContext,
        recorder: &mut dyn RecordDraw,
        width: u32,
        height: u32,
    ) -> Result<()> {
        gpu.wait_idle()?;

        if let Some(chain) = self.chain.take() {
            unsafe { chain.destroy(gpu, surface) };
        }

        self.chain = unsafe { PresentChain::build(gpu, surface, recorder, width, height) }?;

        match &self.chain {
            Some(chain) => {
                // Fences recorded for the old generation must not leak
                // into the new one
                self.image_fences.reset(chain.swapchain.images.len());
                tracing::debug!(
                    "Present chain rebuilt: {} images",
                    chain.swapchain.images.len()
                );
            }
            None => {
                tracing::debug!("Surface has zero area, presentation suspended");
            }
        }

        Ok(())
    }

    /// Destroy everything the renderer owns. Slots are destroyed here
    /// and nowhere else.
    ///
    /// # Safety
    /// The device must be idle.
    pub unsafe fn destroy(&mut self, gpu: &GpuContext, surface: &SurfaceContext) {
        if let Some(chain) = self.chain.take() {
            chain.destroy(gpu, surface);
        }
        self.slots.destroy(gpu.device());
    }
}
