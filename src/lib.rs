//! arm-viewer
//!
//! A small cross-platform viewer for assemblies of STL parts. All configured
//! parts are loaded concurrently, drawn with one shared material under a fixed
//! set of lights, and once every load has finished the camera is framed around
//! the whole assembly. The camera is steered with orbit controls. The same code
//! runs as a native window and, compiled to WASM, inside a browser canvas.
//!
//! High-level modules
//! - `camera`: camera, projection, framing and the orbit controller
//! - `config`: every tunable of the viewer with the robot arm defaults
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: bounding boxes, meshes, instances and the depth buffer
//! - `flow`: the event loop, window lifecycle and background loading
//! - `pipelines`: the mesh pipeline and the lighting uniforms
//! - `resources`: STL parsing and fetching model files
//! - `render`: drawing a frame
//! - `scene`: loaded meshes and the bookkeeping of outstanding loads
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::ViewerConfig;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
