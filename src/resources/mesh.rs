use crate::{
    data_structures::{instance::Instance, model::Mesh},
    resources::stl::StlGeometry,
};

/// Uploads decoded STL geometry as a mesh placed at `instance`.
pub fn upload_geometry(
    device: &wgpu::Device,
    name: &str,
    geometry: &StlGeometry,
    instance: Instance,
) -> Mesh {
    let vertices = geometry.to_vertices();
    Mesh::new(device, name, &vertices, geometry.bounds(), instance)
}
