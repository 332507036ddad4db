//! Viewer data structures: bounds, meshes, placements and the depth buffer.
//!
//! - `bounds` holds the axis-aligned box the assembly is accumulated into
//! - `model` contains vertex layouts, GPU meshes and the shared material
//! - `instance` holds the world placement of a mesh
//! - `depth` wraps the depth attachment

pub mod bounds;
pub mod depth;
pub mod instance;
pub mod model;
