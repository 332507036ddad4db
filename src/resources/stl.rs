//! STL decoding, binary and ASCII.
//!
//! Both encodings decode into [`StlGeometry`]: a flat triangle list with one
//! normal per triangle. Facet normals that are missing (all zero) are replaced
//! by the normal computed from the winding of the triangle.

use anyhow::{Context, bail};
use cgmath::{InnerSpace, Vector3};
use nom::{
    IResult,
    bytes::complete::{tag, take_till},
    character::complete::{multispace0, multispace1},
    combinator::opt,
    multi::{many0, many1},
    number::complete::float,
    sequence::preceded,
};

use crate::data_structures::{bounds::Aabb, model::ModelVertex};

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Facet {
    pub normal: [f32; 3],
    pub vertices: [[f32; 3]; 3],
}

impl Facet {
    fn with_fallback_normal(mut self) -> Self {
        if self.normal == [0.0; 3] || self.normal.iter().any(|c| !c.is_finite()) {
            let [a, b, c] = self.vertices.map(Vector3::from);
            let n = (b - a).cross(c - a);
            self.normal = if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0; 3]
            };
        }
        self
    }
}

/// Decoded contents of an STL file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StlGeometry {
    pub name: Option<String>,
    pub facets: Vec<Facet>,
}

impl StlGeometry {
    pub fn triangle_count(&self) -> usize {
        self.facets.len()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.facets.iter().flat_map(|f| f.vertices))
    }

    /// Flat-shaded vertex list, three vertices per facet.
    pub fn to_vertices(&self) -> Vec<ModelVertex> {
        self.facets
            .iter()
            .flat_map(|f| {
                f.vertices.map(|position| ModelVertex {
                    position,
                    normal: f.normal,
                })
            })
            .collect()
    }
}

/// Decodes STL data of either encoding.
///
/// Binary files are allowed to start with `solid` as well, so ASCII is only
/// assumed if the whole file parses as such.
pub fn parse_stl(data: &[u8]) -> anyhow::Result<StlGeometry> {
    if data.trim_ascii_start().starts_with(b"solid") {
        // solid names written by CAD tools are not always UTF-8
        let text = String::from_utf8_lossy(data);
        match parse_ascii_stl(&text) {
            Ok(geometry) => return Ok(geometry),
            Err(e) => log::debug!("not an ASCII STL, trying binary: {e}"),
        }
    }
    parse_binary_stl(data)
}

pub fn parse_binary_stl(data: &[u8]) -> anyhow::Result<StlGeometry> {
    if data.len() < HEADER_LEN + 4 {
        bail!(
            "{} bytes is too small for an STL header and triangle count",
            data.len()
        );
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let body = &data[HEADER_LEN + 4..];
    let expected = count
        .checked_mul(TRIANGLE_LEN)
        .context("triangle count overflows")?;
    if body.len() < expected {
        bail!(
            "STL truncated: {} triangles need {} bytes, found {}",
            count,
            expected,
            body.len()
        );
    }

    let facets = body
        .chunks_exact(TRIANGLE_LEN)
        .take(count)
        .map(|chunk| {
            let v = |i: usize| read_vec3(&chunk[i * 12..]);
            Facet {
                normal: v(0),
                vertices: [v(1), v(2), v(3)],
            }
            .with_fallback_normal()
        })
        .collect();

    Ok(StlGeometry { name: None, facets })
}

fn read_vec3(bytes: &[u8]) -> [f32; 3] {
    let f = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    [f(0), f(4), f(8)]
}

/// Parses one or more `solid … endsolid` blocks. The facets of all solids are
/// concatenated, the name is taken from the first one.
pub fn parse_ascii_stl(input: &str) -> anyhow::Result<StlGeometry> {
    match many1(ascii_solid)(input) {
        Ok((rest, solids)) if rest.trim().is_empty() => {
            let mut solids = solids.into_iter();
            let mut geometry = solids.next().unwrap_or_default();
            for solid in solids {
                geometry.facets.extend(solid.facets);
            }
            Ok(geometry)
        }
        Ok((rest, _)) => {
            let context: String = rest.trim_start().chars().take(32).collect();
            bail!("unexpected content after endsolid: {context:?}")
        }
        Err(e) => bail!("failed to parse ASCII STL: {e}"),
    }
}

fn ascii_solid(input: &str) -> IResult<&str, StlGeometry> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, name) = take_till(|c| c == '\n' || c == '\r')(input)?;
    let (input, facets) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = opt(take_till(|c| c == '\n' || c == '\r'))(input)?;

    let name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
    Ok((input, StlGeometry { name, facets }))
}

fn ascii_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    let facet = Facet {
        normal,
        vertices: [a, b, c],
    };
    Ok((input, facet.with_fallback_normal()))
}

fn ascii_vertex(input: &str) -> IResult<&str, [f32; 3]> {
    preceded(preceded(multispace0, tag("vertex")), vector3)(input)
}

fn vector3(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, x) = preceded(multispace1, float)(input)?;
    let (input, y) = preceded(multispace1, float)(input)?;
    let (input, z) = preceded(multispace1, float)(input)?;
    Ok((input, [x, y, z]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRAHEDRON: &str = "solid tetra
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 1 0 0
    endloop
  endfacet
  facet normal 0 0 0
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 0 1
    endloop
  endfacet
endsolid tetra
";

    fn binary(facets: &[Facet], header: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data[..header.len()].copy_from_slice(header);
        data.extend_from_slice(&(facets.len() as u32).to_le_bytes());
        for f in facets {
            for v in std::iter::once(f.normal).chain(f.vertices) {
                for c in v {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    #[test]
    fn parses_ascii_solid() {
        let geometry = parse_stl(TETRAHEDRON.as_bytes()).unwrap();
        assert_eq!(geometry.name.as_deref(), Some("tetra"));
        assert_eq!(geometry.triangle_count(), 2);
        assert_eq!(geometry.facets[0].normal, [0.0, 0.0, -1.0]);
        assert_eq!(geometry.facets[0].vertices[2], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_normals_are_computed_from_winding() {
        let geometry = parse_ascii_stl(TETRAHEDRON).unwrap();
        // (1,0,0) x (0,0,1) = (0,-1,0)
        assert_eq!(geometry.facets[1].normal, [0.0, -1.0, 0.0]);
    }

    #[test]
    fn parses_binary_even_with_solid_header() {
        let facet = Facet {
            normal: [0.0, 0.0, 1.0],
            vertices: [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 3.0, 0.5]],
        };
        let data = binary(&[facet, facet], b"solid exported by a CAD tool");
        let geometry = parse_stl(&data).unwrap();
        assert_eq!(geometry.triangle_count(), 2);
        assert_eq!(geometry.facets[0], facet);
        assert_eq!(geometry.bounds(), Aabb::new([0.0, 0.0, 0.0], [2.0, 3.0, 0.5]));
    }

    #[test]
    fn empty_binary_file_has_no_triangles() {
        let data = binary(&[], b"");
        let geometry = parse_binary_stl(&data).unwrap();
        assert_eq!(geometry.triangle_count(), 0);
        assert!(geometry.bounds().is_empty());
    }

    #[test]
    fn truncated_binary_is_rejected() {
        let facet = Facet {
            normal: [0.0, 0.0, 1.0],
            vertices: [[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        };
        let mut data = binary(&[facet], b"");
        data.truncate(data.len() - 10);
        assert!(parse_stl(&data).is_err());
        assert!(parse_stl(&[0u8; 12]).is_err());
    }

    #[test]
    fn non_utf8_solid_names_still_parse_as_ascii() {
        let mut data = b"solid Teil_Gr\xf6sse\n".to_vec();
        data.extend_from_slice(TETRAHEDRON.trim_start_matches("solid tetra\n").as_bytes());
        let geometry = parse_stl(&data).unwrap();
        assert_eq!(geometry.triangle_count(), 2);
        assert_eq!(geometry.facets[0].vertices[1], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn facets_of_all_solids_are_collected() {
        let first = TETRAHEDRON.replace("tetra", "a");
        let second = TETRAHEDRON.replace("tetra", "b");
        let data = format!("{first}{second}");
        let geometry = parse_stl(data.as_bytes()).unwrap();
        assert_eq!(geometry.name.as_deref(), Some("a"));
        assert_eq!(geometry.triangle_count(), 4);
        assert_eq!(geometry.facets[2], geometry.facets[0]);
    }

    #[test]
    fn vertices_are_flat_shaded() {
        let geometry = parse_ascii_stl(TETRAHEDRON).unwrap();
        let vertices = geometry.to_vertices();
        assert_eq!(vertices.len(), 6);
        assert!(vertices[..3].iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
        assert!(vertices[3..].iter().all(|v| v.normal == [0.0, -1.0, 0.0]));
    }
}
