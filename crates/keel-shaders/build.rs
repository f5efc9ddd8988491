//! Build script to compile GLSL shaders to SPIR-V.

use shaderc::{CompileOptions, Compiler, ShaderKind};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let shader_dir = Path::new("shaders");

    // Rerun if shaders change
    println!("cargo:rerun-if-changed=shaders/");

    let compiler = Compiler::new().expect("Failed to create shader compiler");

    let mut options = CompileOptions::new().expect("Failed to create compile options");
    options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_1 as u32,
    );
    options.set_target_spirv(shaderc::SpirvVersion::V1_3);
    options.set_optimization_level(shaderc::OptimizationLevel::Performance);

    for (source, spv, kind) in [
        ("triangle.vert", "triangle_vert.spv", ShaderKind::Vertex),
        ("triangle.frag", "triangle_frag.spv", ShaderKind::Fragment),
    ] {
        compile_shader(
            &compiler,
            &options,
            &shader_dir.join(source),
            &out_dir.join(spv),
            kind,
        );
    }
}

fn compile_shader(
    compiler: &Compiler,
    options: &CompileOptions,
    input: &Path,
    output: &Path,
    kind: ShaderKind,
) {
    let source = fs::read_to_string(input)
        .unwrap_or_else(|e| panic!("Failed to read shader {input:?}: {e}"));

    let file_name = input.file_name().unwrap().to_str().unwrap();

    let result = compiler
        .compile_into_spirv(&source, kind, file_name, "main", Some(options))
        .unwrap_or_else(|e| panic!("Failed to compile shader {input:?}: {e}"));

    if result.get_num_warnings() > 0 {
        println!(
            "cargo:warning=Shader warnings in {input:?}: {}",
            result.get_warning_messages()
        );
    }

    fs::write(output, bytemuck::cast_slice::<u32, u8>(result.as_binary()))
        .unwrap_or_else(|e| panic!("Failed to write shader {output:?}: {e}"));

    println!("Compiled {input:?} -> {output:?}");
}
