use cgmath::InnerSpace;
use wgpu::util::DeviceExt;

use crate::config::LightingConfig;

pub const MAX_DIRECTIONAL_LIGHTS: usize = 8;

pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl std::fmt::Debug for LightResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightResources")
            .field("uniform", &self.uniform)
            .finish_non_exhaustive()
    }
}

impl LightResources {
    pub fn new(device: &wgpu::Device, lighting: &LightingConfig) -> Self {
        let uniform = LightUniform::from_config(lighting);
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

/// Ambient term plus up to [`MAX_DIRECTIONAL_LIGHTS`] directional lights.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// rgb premultiplied by intensity, w unused
    ambient: [f32; 4],
    directions: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    colors: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    count: u32,
    // Uniforms require 16 byte alignment
    _padding: [u32; 3],
}

impl LightUniform {
    pub fn from_config(lighting: &LightingConfig) -> Self {
        if lighting.directional.len() > MAX_DIRECTIONAL_LIGHTS {
            log::warn!(
                "{} directional lights configured, only the first {} are used",
                lighting.directional.len(),
                MAX_DIRECTIONAL_LIGHTS
            );
        }
        let [r, g, b] = lighting.ambient_color;
        let i = lighting.ambient_intensity;
        let mut uniform = Self {
            ambient: [r * i, g * i, b * i, 0.0],
            directions: [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS],
            colors: [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS],
            count: 0,
            _padding: [0; 3],
        };
        for light in lighting
            .directional
            .iter()
            .filter(|light| light.direction.magnitude2() > 0.0)
            .take(MAX_DIRECTIONAL_LIGHTS)
        {
            let slot = uniform.count as usize;
            let d = light.direction.normalize();
            let [r, g, b] = light.color;
            uniform.directions[slot] = [d.x, d.y, d.z, 0.0];
            uniform.colors[slot] = [
                r * light.intensity,
                g * light.intensity,
                b * light.intensity,
                0.0,
            ];
            uniform.count += 1;
        }
        uniform
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Light arriving at a surface with unit `normal`, as `fs_main` computes
    /// it. The fragment colour is the material colour times this.
    pub fn irradiance(&self, normal: [f32; 3]) -> [f32; 3] {
        let mut irradiance = [self.ambient[0], self.ambient[1], self.ambient[2]];
        for slot in 0..self.count as usize {
            let d = self.directions[slot];
            let lambert = (normal[0] * d[0] + normal[1] * d[1] + normal[2] * d[2]).max(0.0);
            for (channel, c) in irradiance.iter_mut().zip(self.colors[slot]) {
                *channel += c * lambert;
            }
        }
        irradiance
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectionalLight;

    #[test]
    fn uniform_layout_matches_the_shader() {
        // ambient + 2 arrays of 8 vec4 + count padded to 16 bytes
        assert_eq!(std::mem::size_of::<LightUniform>(), 16 + 128 + 128 + 16);
    }

    #[test]
    fn default_lighting_is_packed() {
        let uniform = LightUniform::from_config(&LightingConfig::default());
        assert_eq!(uniform.count(), 5);
        let d = uniform.directions[2];
        let expected = 1.0 / 3.0f32.sqrt();
        assert!((d[0] + expected).abs() < 1e-6);
        assert!((d[1] - expected).abs() < 1e-6);
        assert_eq!(uniform.colors[0], [1.0, 1.0, 1.0, 0.0]);
        // 0x404040 at intensity 2
        let ambient = 2.0 * crate::config::srgb_to_linear(64.0 / 255.0);
        assert!((uniform.ambient[0] - ambient).abs() < 1e-6);
    }

    #[test]
    fn head_on_light_is_not_scaled_by_pi() {
        let lighting = LightingConfig {
            ambient_color: [0.0; 3],
            ambient_intensity: 0.0,
            directional: vec![DirectionalLight::white([0.0, 0.0, 2.0])],
        };
        let uniform = LightUniform::from_config(&lighting);
        assert_eq!(uniform.irradiance([0.0, 0.0, 1.0]), [1.0, 1.0, 1.0]);
        // facing away receives nothing
        assert_eq!(uniform.irradiance([0.0, 0.0, -1.0]), [0.0, 0.0, 0.0]);

        let shader = include_str!("mesh_shader.wgsl");
        assert!(shader.contains("material.base_color.rgb * irradiance"));
    }

    #[test]
    fn excess_and_degenerate_lights_are_dropped() {
        let mut lighting = LightingConfig::default();
        lighting.directional = (0..12)
            .map(|i| DirectionalLight::white([i as f32, 1.0, 0.0]))
            .collect();
        lighting.directional.insert(0, DirectionalLight::white([0.0, 0.0, 0.0]));
        let uniform = LightUniform::from_config(&lighting);
        assert_eq!(uniform.count() as usize, MAX_DIRECTIONAL_LIGHTS);
        assert_eq!(uniform.directions[0], [0.0, 1.0, 0.0, 0.0]);
    }
}
