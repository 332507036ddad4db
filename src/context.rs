//! GPU and window context.
//!
//! [`Context`] owns everything that lives as long as the window does: surface,
//! device and queue, the depth buffer, camera and light resources, the mesh
//! pipeline and the shared material. It is created once per window and passed
//! explicitly to whatever needs to draw or react to the window.

use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, CameraUniform, OrbitController, Projection},
    config::ViewerConfig,
    data_structures::{depth::DepthBuffer, model::Material},
    pipelines::{light::LightResources, mesh::mk_mesh_pipeline},
};

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth: DepthBuffer,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipeline: wgpu::RenderPipeline,
    pub material: Material,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating the window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("requesting the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader outputs linear colour, so an sRGB surface does the encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = Camera::new(viewer.camera.position, viewer.camera.target);
        let projection = Projection::new(
            config.width,
            config.height,
            viewer.camera.fovy,
            viewer.camera.znear,
            viewer.camera.zfar,
        );
        let mut controller =
            OrbitController::new(viewer.orbit.clone(), viewer.camera.fovy, viewer.camera.target);
        controller.set_viewport(config.width, config.height);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let light = LightResources::new(&device, &viewer.lighting);
        let material_layout = Material::bind_group_layout(&device);
        let material = Material::new(&device, &material_layout, viewer.mesh_color);
        let pipeline = mk_mesh_pipeline(
            &device,
            &config,
            &camera_bind_group_layout,
            &light.bind_group_layout,
            &material_layout,
        );

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth = DepthBuffer::new(&device, &config);

        Ok(Self {
            window,
            depth,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipeline,
            material,
            clear_colour: viewer.clear_colour,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Adapts surface, projection and depth buffer to a new window size.
    /// Zero-sized windows (minimized) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if !resize_targets(
            &mut self.config,
            &mut self.projection,
            &mut self.camera.controller,
            width,
            height,
        ) {
            return false;
        }
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::new(&self.device, &self.config);
        true
    }

    /// Runs the orbit controller and uploads the resulting view.
    pub fn update_camera(&mut self) -> bool {
        let camera = &mut self.camera;
        let moved = camera.controller.update(&mut camera.camera);
        camera.uniform.update_view_proj(&camera.camera, &self.projection);
        self.queue
            .write_buffer(&camera.buffer, 0, bytemuck::cast_slice(&[camera.uniform]));
        moved
    }
}

/// The CPU-side part of a resize: surface size, aspect ratio and the pixel
/// scale of the orbit controls.
pub fn resize_targets(
    config: &mut wgpu::SurfaceConfiguration,
    projection: &mut Projection,
    controller: &mut OrbitController,
    width: u32,
    height: u32,
) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    config.width = width;
    config.height = height;
    projection.resize(width, height);
    controller.set_viewport(width, height);
    true
}

#[cfg(test)]
mod tests {
    use cgmath::Deg;

    use super::*;
    use crate::config::OrbitConfig;

    fn surface_config(width: u32, height: u32) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Bgra8UnormSrgb,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    #[test]
    fn resize_updates_surface_and_aspect() {
        let mut config = surface_config(800, 600);
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        let mut controller =
            OrbitController::new(OrbitConfig::default(), Deg(75.0), [0.0; 3].into());

        assert!(resize_targets(&mut config, &mut projection, &mut controller, 1280, 720));
        assert_eq!((config.width, config.height), (1280, 720));
        assert!((projection.aspect - 1280.0 / 720.0).abs() < f32::EPSILON);
    }

    #[test]
    fn minimized_window_is_ignored() {
        let mut config = surface_config(800, 600);
        let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        let mut controller =
            OrbitController::new(OrbitConfig::default(), Deg(75.0), [0.0; 3].into());

        assert!(!resize_targets(&mut config, &mut projection, &mut controller, 0, 600));
        assert_eq!((config.width, config.height), (800, 600));
        assert!((projection.aspect - 800.0 / 600.0).abs() < f32::EPSILON);
    }
}
