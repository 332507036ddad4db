//! Camera, projection and the uniforms that carry them to the GPU.
//!
//! The camera is a look-at camera: a position, the point it looks at and a
//! fixed +Y up vector. Interactive movement lives in [`orbit`], the one-shot
//! placement on the loaded assembly in [`Framing`].

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};

use crate::data_structures::bounds::Aabb;

pub mod orbit;

pub use orbit::OrbitController;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new(position: impl Into<Point3<f32>>, target: impl Into<Point3<f32>>) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

/// Perspective projection; `aspect` follows the surface size.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera state together with its GPU buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Camera placement that brings a bounding box into view.
///
/// The camera is put on the +Z side at twice the largest box dimension,
/// level with the box centre, looking at the centre. Field of view and aspect
/// ratio are not taken into account, so very wide or tall assemblies may be
/// clipped at the edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Framing {
    pub target: Point3<f32>,
    pub position: Point3<f32>,
    pub distance: f32,
}

impl Framing {
    /// `None` for an empty or zero-sized box: there is nothing to frame and
    /// the current view is kept.
    pub fn from_bounds(bounds: &Aabb) -> Option<Self> {
        if bounds.is_empty() {
            return None;
        }
        let max_dimension = bounds.max_dimension();
        if !max_dimension.is_finite() || max_dimension <= f32::EPSILON {
            return None;
        }
        let center = bounds.center();
        let distance = max_dimension * 2.0;
        let position = Point3::new(center.x, center.y, distance);
        if (position - center).magnitude2() <= f32::EPSILON {
            // the box centre sits exactly where the camera would go
            return None;
        }
        Some(Self {
            target: center,
            position,
            distance,
        })
    }

    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.position;
        camera.look_at(self.target);
    }
}
