//! Shader compilation for the Keel engine.
//!
//! This crate contains GLSL shaders and their compiled SPIR-V bytecode.
//! Shaders are compiled at build time using shaderc.

use std::sync::OnceLock;

/// Embedded SPIR-V shader bytecode (raw bytes, may not be aligned).
mod spirv_bytes {
    /// Hardcoded triangle vertex shader (compiled SPIR-V).
    pub static TRIANGLE_VERT: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/triangle_vert.spv"));
    /// Interpolated vertex-color fragment shader (compiled SPIR-V).
    pub static TRIANGLE_FRAG: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/triangle_frag.spv"));
}

/// Convert byte slice to aligned u32 Vec (SPIR-V requires 4-byte alignment).
fn bytes_to_spirv(bytes: &[u8]) -> Vec<u32> {
    assert!(
        bytes.len() % 4 == 0,
        "SPIR-V bytecode must be 4-byte aligned"
    );
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

static TRIANGLE_VERT_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static TRIANGLE_FRAG_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();

/// Get the triangle vertex shader as u32 slice for Vulkan.
pub fn triangle_vert() -> &'static [u32] {
    TRIANGLE_VERT_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::TRIANGLE_VERT))
}

/// Get the triangle fragment shader as u32 slice for Vulkan.
pub fn triangle_frag() -> &'static [u32] {
    TRIANGLE_FRAG_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::TRIANGLE_FRAG))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_shader_loads() {
        let shader = triangle_vert();
        assert_eq!(shader[0], 0x0723_0203, "Invalid SPIR-V magic number");
        assert!(shader.len() > 20, "Shader too small");
    }

    #[test]
    fn fragment_shader_loads() {
        let shader = triangle_frag();
        assert_eq!(shader[0], 0x0723_0203, "Invalid SPIR-V magic number");
        assert!(shader.len() > 20, "Shader too small");
    }
}
