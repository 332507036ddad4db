//! Render pipelines and the uniforms that feed them.

pub mod light;
pub mod mesh;
