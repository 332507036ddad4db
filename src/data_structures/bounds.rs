//! Axis-aligned bounding boxes.
//!
//! [`Aabb`] is what the viewer folds every loaded part into. The empty box is
//! the identity of [`Aabb::union`], so boxes can be accumulated in any order
//! starting from [`Aabb::empty`].

use cgmath::{EuclideanSpace, Point3, Transform, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn new(min: impl Into<Point3<f32>>, max: impl Into<Point3<f32>>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Point3<f32>>,
    {
        points.into_iter().fold(Self::empty(), |mut aabb, p| {
            aabb.expand_by_point(p.into());
            aabb
        })
    }

    /// True until at least one point has been added.
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expand_by_point(&mut self, p: Point3<f32>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn expand_by_box(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.expand_by_point(other.min);
        self.expand_by_point(other.max);
    }

    pub fn union(mut self, other: &Aabb) -> Self {
        self.expand_by_box(other);
        self
    }

    /// Box around the eight transformed corners.
    ///
    /// For rotations this is larger than the tight bounds of the transformed
    /// geometry, never smaller.
    pub fn transformed(&self, matrix: &cgmath::Matrix4<f32>) -> Self {
        if self.is_empty() {
            return *self;
        }
        let corners = (0..8).map(|i| {
            Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        });
        Self::from_points(corners.map(|c| matrix.transform_point(c)))
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }

    pub fn max_dimension(&self) -> f32 {
        let size = self.size();
        size.x.max(size.y).max(size.z)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
