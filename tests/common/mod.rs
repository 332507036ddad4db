use std::path::{Path, PathBuf};

/// A scratch asset root below the system temp dir, removed on drop.
pub(crate) struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("arm-viewer-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("models")).unwrap();
        Self { root }
    }

    pub fn root(&self) -> &str {
        self.root.to_str().unwrap()
    }

    pub fn write(&self, file: &str, data: &[u8]) -> String {
        let relative = format!("models/{file}");
        std::fs::write(Path::new(&self.root).join(&relative), data).unwrap();
        relative
    }
}

impl Drop for AssetDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Binary STL with one triangle per entry and zeroed normals.
pub(crate) fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for triangle in triangles {
        data.extend_from_slice(&[0u8; 12]);
        for vertex in triangle {
            for c in vertex {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        data.extend_from_slice(&[0, 0]);
    }
    data
}

/// Single-facet ASCII STL.
pub(crate) fn ascii_stl(name: &str, triangle: [[f32; 3]; 3]) -> String {
    let mut text = format!("solid {name}\n  facet normal 0 0 1\n    outer loop\n");
    for [x, y, z] in triangle {
        text.push_str(&format!("      vertex {x} {y} {z}\n"));
    }
    text.push_str(&format!("    endloop\n  endfacet\nendsolid {name}\n"));
    text
}
