//! Viewer configuration.
//!
//! [`ViewerConfig`] collects every tunable of the viewer in one place: which
//! models are loaded, how they are shaded and lit, where the camera starts and
//! how the orbit controls behave. The defaults reproduce the robot arm
//! assembly this crate was written for.

use std::f32::consts::FRAC_PI_2;

/// The parts of the robot arm, relative to the asset root.
pub const DEFAULT_MODELS: [&str; 10] = [
    "models/fixfinger.stl",
    "models/forearm.stl",
    "models/movingfinger.stl",
    "models/shoulder.stl",
    "models/shoulder2arm.stl",
    "models/shoulderpitch.stl",
    "models/support.stl",
    "models/upperarm.stl",
    "models/wrist.stl",
    "models/wristhand.stl",
];

/// Converts a `0xRRGGBB` sRGB colour into linear RGB components.
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub position: cgmath::Point3<f32>,
    pub target: cgmath::Point3<f32>,
    pub fovy: cgmath::Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: cgmath::Point3::new(0.0, 0.0, 100.0),
            target: cgmath::Point3::new(0.0, 0.0, 0.0),
            fovy: cgmath::Deg(75.0),
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

/// Behaviour of the orbit controls.
#[derive(Clone, Debug)]
pub struct OrbitConfig {
    pub enable_damping: bool,
    /// Share of the pending motion applied per frame when damping is on.
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Polar angle limits in radians, measured from the up axis.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.25,
            enable_pan: false,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_polar_angle: 0.0,
            // never look at the model from below the horizon
            max_polar_angle: FRAC_PI_2,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirectionalLight {
    /// Direction pointing from the scene towards the light.
    pub direction: cgmath::Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn white(direction: impl Into<cgmath::Vector3<f32>>) -> Self {
        Self {
            direction: direction.into(),
            color: [1.0; 3],
            intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LightingConfig {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub directional: Vec<DirectionalLight>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: hex_to_linear(0x404040),
            ambient_intensity: 2.0,
            directional: vec![
                DirectionalLight::white([1.0, 1.0, 1.0]),
                DirectionalLight::white([1.0, 1.0, 1.0]),
                DirectionalLight::white([-1.0, 1.0, 1.0]),
                DirectionalLight::white([1.0, -1.0, 1.0]),
                DirectionalLight::white([1.0, 1.0, -1.0]),
            ],
        }
    }
}

/// Everything the viewer needs to know before the window opens.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub title: String,
    /// Directory (native) or URL path below the page origin (web) that model
    /// paths are resolved against.
    pub asset_root: String,
    pub models: Vec<String>,
    pub clear_colour: wgpu::Color,
    pub mesh_color: [f32; 3],
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub lighting: LightingConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "arm-viewer".to_string(),
            asset_root: "assets".to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            clear_colour: wgpu::Color::BLACK,
            mesh_color: hex_to_linear(0x0077ff),
            camera: CameraConfig::default(),
            orbit: OrbitConfig::default(),
            lighting: LightingConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn with_models<I, P>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<String>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_mesh_color(mut self, hex: u32) -> Self {
        self.mesh_color = hex_to_linear(hex);
        self
    }

    pub fn with_orbit(mut self, orbit: OrbitConfig) -> Self {
        self.orbit = orbit;
        self
    }
}
