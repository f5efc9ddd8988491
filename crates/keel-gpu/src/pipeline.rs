//! Render pass, graphics pipeline, and framebuffers.

use crate::error::{GpuError, Result};
use crate::swapchain::Swapchain;
use ash::vk;

/// The per-generation presentation pipeline: one render pass with a
/// single cleared color attachment, a fixed-function triangle pipeline,
/// and one framebuffer per swapchain image view.
///
/// Configuration is static; the bundle is rebuilt identically whenever
/// the swapchain is.
pub struct FramePipeline {
    pub render_pass: vk::RenderPass,
    pub layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
    pub framebuffers: Vec<vk::Framebuffer>,
}

impl FramePipeline {
    /// Build the bundle for the given swapchain.
    ///
    /// # Safety
    /// The device must be valid and the swapchain current.
    pub unsafe fn build(device: &ash::Device, swapchain: &Swapchain) -> Result<Self> {
        let render_pass = create_render_pass(device, swapchain.format)?;
        let (layout, pipeline) = create_pipeline(device, render_pass, swapchain.extent)?;
        let framebuffers = create_framebuffers(device, render_pass, swapchain)?;

        Ok(Self {
            render_pass,
            layout,
            pipeline,
            framebuffers,
        })
    }

    /// Destroy the bundle in dependency order: framebuffers before the
    /// render pass they reference.
    ///
    /// # Safety
    /// The device must be valid and nothing here may be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        for &framebuffer in &self.framebuffers {
            device.destroy_framebuffer(framebuffer, None);
        }
        device.destroy_pipeline(self.pipeline, None);
        device.destroy_pipeline_layout(self.layout, None);
        device.destroy_render_pass(self.render_pass, None);
    }
}

/// Create the render pass: a single color attachment cleared on load,
/// stored on end, transitioning UNDEFINED to presentable. The external
/// subpass dependency delays color writes until the attachment is
/// actually available, which lets image acquisition signal at
/// COLOR_ATTACHMENT_OUTPUT instead of blocking the whole pipe.
unsafe fn create_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

    let color_refs = [vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];

    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)];

    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        )];

    let attachments = [color_attachment];
    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    device
        .create_render_pass(&create_info, None)
        .map_err(|e| GpuError::PipelineCreation(e.to_string()))
}

/// Create the fixed-function triangle pipeline. The viewport and
/// scissor are baked to the swapchain extent; resizes go through a full
/// rebuild rather than dynamic state.
unsafe fn create_pipeline(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
) -> Result<(vk::PipelineLayout, vk::Pipeline)> {
    let vert_shader_info =
        vk::ShaderModuleCreateInfo::default().code(keel_shaders::triangle_vert());
    let vert_module = device
        .create_shader_module(&vert_shader_info, None)
        .map_err(|e| GpuError::ShaderCompilation(format!("Vertex: {e}")))?;

    let frag_shader_info =
        vk::ShaderModuleCreateInfo::default().code(keel_shaders::triangle_frag());
    let frag_module = device
        .create_shader_module(&frag_shader_info, None)
        .map_err(|e| GpuError::ShaderCompilation(format!("Fragment: {e}")))?;

    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vert_module)
            .name(c"main"),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(frag_module)
            .name(c"main"),
    ];

    // No vertex input: the triangle is embedded in the vertex shader
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewports = [vk::Viewport::default()
        .x(0.0)
        .y(0.0)
        .width(extent.width as f32)
        .height(extent.height as f32)
        .min_depth(0.0)
        .max_depth(1.0)];
    let scissors = [vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::CLOCKWISE)
        .depth_bias_enable(false)
        .line_width(1.0);

    let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1)
        .sample_shading_enable(false);

    let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(false)
        .color_write_mask(vk::ColorComponentFlags::RGBA)];

    let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&color_blend_attachments);

    // Nothing is bound: no descriptors, no push constants
    let layout_info = vk::PipelineLayoutCreateInfo::default();
    let layout = device
        .create_pipeline_layout(&layout_info, None)
        .map_err(|e| GpuError::PipelineCreation(e.to_string()))?;

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisampling)
        .color_blend_state(&color_blending)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = device
        .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        .map_err(|(_pipelines, e)| GpuError::PipelineCreation(e.to_string()))?;

    // Clean up shader modules (no longer needed)
    device.destroy_shader_module(vert_module, None);
    device.destroy_shader_module(frag_module, None);

    Ok((layout, pipelines[0]))
}

/// Create one framebuffer per swapchain image view.
unsafe fn create_framebuffers(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    swapchain: &Swapchain,
) -> Result<Vec<vk::Framebuffer>> {
    swapchain
        .image_views
        .iter()
        .map(|&view| {
            let attachments = [view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(swapchain.extent.width)
                .height(swapchain.extent.height)
                .layers(1);

            device
                .create_framebuffer(&create_info, None)
                .map_err(|e| GpuError::PipelineCreation(e.to_string()))
        })
        .collect()
}
