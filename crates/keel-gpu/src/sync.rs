//! Synchronization primitives and frame-pacing bookkeeping.

use crate::error::Result;
use ash::vk;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = device.create_semaphore(&create_info, None)?;
    Ok(semaphore)
}

/// Create a fence.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = device.create_fence(&create_info, None)?;
    Ok(fence)
}

/// Wait for a fence to be signaled.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(device: &ash::Device, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
    device.wait_for_fences(&[fence], true, timeout_ns)?;
    Ok(())
}

/// Reset a fence to unsignaled state.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    device.reset_fences(&[fence])?;
    Ok(())
}

/// Synchronization objects for one in-flight frame.
///
/// Slots are created once at startup and reused every N-th frame; a
/// swapchain rebuild never touches them.
pub struct FrameSlot {
    /// Signaled when the acquired image is ready to be rendered to.
    pub image_available: vk::Semaphore,
    /// Signaled when rendering commands for the frame have finished.
    pub render_finished: vk::Semaphore,
    /// Signaled when the frame's submission has fully completed.
    pub in_flight: vk::Fence,
}

impl FrameSlot {
    /// Create the slot's sync objects. The fence starts signaled so the
    /// first wait on a fresh slot passes immediately.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        Ok(Self {
            image_available: create_semaphore(device)?,
            render_finished: create_semaphore(device)?,
            in_flight: create_fence(device, true)?,
        })
    }

    /// Block until the slot's previous submission has completed.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self, device: &ash::Device) -> Result<()> {
        wait_for_fence(device, self.in_flight, u64::MAX)
    }

    /// Reset the fence before resubmitting the slot.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset(&self, device: &ash::Device) -> Result<()> {
        reset_fence(device, self.in_flight)
    }

    /// Destroy the slot's sync objects.
    ///
    /// # Safety
    /// The device must be valid and the slot must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_semaphore(self.image_available, None);
        device.destroy_semaphore(self.render_finished, None);
        device.destroy_fence(self.in_flight, None);
    }
}

/// The fixed ring of frame slots and the current-frame cursor.
pub struct FrameSlots {
    slots: Vec<FrameSlot>,
    current: usize,
}

impl FrameSlots {
    /// Create `frames_in_flight` slots.
    ///
    /// # Panics
    /// Panics when `frames_in_flight` is zero.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device, frames_in_flight: usize) -> Result<Self> {
        assert!(frames_in_flight > 0, "at least one frame in flight");

        let mut slots = Vec::with_capacity(frames_in_flight);
        for _ in 0..frames_in_flight {
            slots.push(FrameSlot::new(device)?);
        }

        Ok(Self { slots, current: 0 })
    }

    /// The current frame's slot.
    pub fn current(&self) -> &FrameSlot {
        &self.slots[self.current]
    }

    /// Advance the cursor to the next slot.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }

    /// The current frame index.
    pub fn current_frame(&self) -> usize {
        self.current
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the ring is empty. Construction forbids this.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Destroy all slots.
    ///
    /// # Safety
    /// The device must be valid and no slot may be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        for slot in &self.slots {
            slot.destroy(device);
        }
    }
}

/// Tracks, per swapchain image, the in-flight fence of the frame that
/// last submitted work for it.
///
/// With more frame slots than images (or out-of-order acquisition) an
/// image can come up for reuse while its previous frame is still
/// executing; the tracked fence is what the renderer waits on before
/// resubmitting that image.
pub struct ImageFences {
    fences: Vec<vk::Fence>,
}

impl ImageFences {
    /// Create a tracker for `image_count` images, all unassigned.
    pub fn new(image_count: usize) -> Self {
        Self {
            fences: vec![vk::Fence::null(); image_count],
        }
    }

    /// Resize to the new image count and clear every entry. Called
    /// after each swapchain rebuild; fences from the old generation
    /// must not leak into the new one.
    pub fn reset(&mut self, image_count: usize) {
        self.fences.clear();
        self.fences.resize(image_count, vk::Fence::null());
    }

    /// The fence still pending for `image_index`, if any.
    pub fn pending(&self, image_index: usize) -> Option<vk::Fence> {
        let fence = self.fences[image_index];
        (fence != vk::Fence::null()).then_some(fence)
    }

    /// Record that the frame owning `fence` is now using `image_index`.
    pub fn assign(&mut self, image_index: usize, fence: vk::Fence) {
        self.fences[image_index] = fence;
    }

    /// Number of tracked images.
    pub fn len(&self) -> usize {
        self.fences.len()
    }

    /// Whether the tracker is empty.
    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn tracker_starts_unassigned() {
        let tracker = ImageFences::new(3);
        assert_eq!(tracker.len(), 3);
        for index in 0..3 {
            assert!(tracker.pending(index).is_none());
        }
    }

    #[test]
    fn assigned_fence_is_reported_pending() {
        let fence = vk::Fence::from_raw(7);
        let mut tracker = ImageFences::new(2);

        tracker.assign(1, fence);
        assert_eq!(tracker.pending(1), Some(fence));
        assert!(tracker.pending(0).is_none());
    }

    #[test]
    fn reset_resizes_and_clears() {
        let mut tracker = ImageFences::new(2);
        tracker.assign(0, vk::Fence::from_raw(1));
        tracker.assign(1, vk::Fence::from_raw(2));

        tracker.reset(4);
        assert_eq!(tracker.len(), 4);
        for index in 0..4 {
            assert!(tracker.pending(index).is_none());
        }

        tracker.reset(1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.pending(0).is_none());
    }

    #[test]
    fn image_reuse_surfaces_the_prior_frame_fence() {
        // Two slots rotating over three images: frames 0..=3 use slots
        // 0,1,0,1 and acquire images 0,1,2,0.
        let slot_fences = [vk::Fence::from_raw(1), vk::Fence::from_raw(2)];
        let mut tracker = ImageFences::new(3);

        // Frames 0..=2: no image has a pending fence yet
        assert!(tracker.pending(0).is_none());
        tracker.assign(0, slot_fences[0]);
        assert!(tracker.pending(1).is_none());
        tracker.assign(1, slot_fences[1]);
        assert!(tracker.pending(2).is_none());
        tracker.assign(2, slot_fences[0]);

        // Frame 3 re-acquires image 0: frame 0's fence must be waited
        // on before the image is submitted again
        assert_eq!(tracker.pending(0), Some(slot_fences[0]));
        tracker.assign(0, slot_fences[1]);
        assert_eq!(tracker.pending(0), Some(slot_fences[1]));
    }
}
