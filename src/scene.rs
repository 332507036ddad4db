//! The assembled model.
//!
//! [`Assembly`] is the bookkeeping half: it counts load outcomes against the
//! number of requested models, folds every loaded part's world bounds into one
//! box and reports completion exactly once. [`Scene`] pairs it with the GPU
//! meshes that are drawn every frame.

use crate::{
    data_structures::{bounds::Aabb, instance::Instance, model::Mesh},
    resources::{LoadOutcome, mesh::upload_geometry},
};

#[derive(Clone, Debug, PartialEq)]
pub struct LoadFailure {
    pub path: String,
    pub reason: String,
}

/// What became of the requested models once every load has reported back.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<LoadFailure>,
    pub bounds: Aabb,
}

impl LoadReport {
    /// One line naming the counts and, if any, the parts that are missing.
    pub fn summary(&self) -> String {
        let mut line = format!("{} loaded, {} failed", self.loaded.len(), self.failed.len());
        if !self.failed.is_empty() {
            let paths: Vec<&str> = self.failed.iter().map(|f| f.path.as_str()).collect();
            line.push_str(&format!(" ({})", paths.join(", ")));
        }
        line
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
    Pending { remaining: usize },
    Complete(LoadReport),
}

#[derive(Debug)]
pub struct Assembly {
    expected: usize,
    bounds: Aabb,
    loaded: Vec<String>,
    failed: Vec<LoadFailure>,
    completed: bool,
}

impl Assembly {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            bounds: Aabb::empty(),
            loaded: Vec::new(),
            failed: Vec::new(),
            completed: false,
        }
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn loaded(&self) -> &[String] {
        &self.loaded
    }

    pub fn failed(&self) -> &[LoadFailure] {
        &self.failed
    }

    pub fn remaining(&self) -> usize {
        self.expected.saturating_sub(self.loaded.len() + self.failed.len())
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    pub fn record_loaded(&mut self, path: &str, world_bounds: &Aabb) -> Progress {
        self.bounds.expand_by_box(world_bounds);
        self.loaded.push(path.to_string());
        self.poll()
    }

    pub fn record_failed(&mut self, path: &str, reason: &str) -> Progress {
        self.failed.push(LoadFailure {
            path: path.to_string(),
            reason: reason.to_string(),
        });
        self.poll()
    }

    /// Current progress. `Complete` is handed out once; outcomes arriving
    /// after that (which would mean a path was reported twice) only produce
    /// `Pending`. Polling an assembly that expects no models completes it
    /// right away.
    pub fn poll(&mut self) -> Progress {
        if self.completed || !self.is_complete() {
            return Progress::Pending {
                remaining: self.remaining(),
            };
        }
        self.completed = true;
        Progress::Complete(LoadReport {
            loaded: self.loaded.clone(),
            failed: self.failed.clone(),
            bounds: self.bounds,
        })
    }
}

/// Meshes on screen plus the bookkeeping of their loads.
#[derive(Debug)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub assembly: Assembly,
}

impl Scene {
    pub fn new(expected_models: usize) -> Self {
        Self {
            meshes: Vec::new(),
            assembly: Assembly::new(expected_models),
        }
    }

    /// Adds a successfully decoded model to the scene or records the failure.
    pub fn ingest(&mut self, device: &wgpu::Device, outcome: LoadOutcome) -> Progress {
        match outcome {
            LoadOutcome::Loaded { path, geometry } => {
                if geometry.triangle_count() == 0 {
                    log::warn!("{path} contains no triangles");
                    return self.assembly.record_loaded(&path, &Aabb::empty());
                }
                let mesh = upload_geometry(device, &path, &geometry, Instance::new());
                let progress = self.assembly.record_loaded(&path, &mesh.world_bounds());
                self.meshes.push(mesh);
                progress
            }
            LoadOutcome::Failed { path, reason } => self.assembly.record_failed(&path, &reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(min: [f32; 3], edge: f32) -> Aabb {
        Aabb::new(min, [min[0] + edge, min[1] + edge, min[2] + edge])
    }

    #[test]
    fn completes_after_every_outcome() {
        let mut assembly = Assembly::new(3);
        assert_eq!(
            assembly.record_loaded("a.stl", &cube([0.0; 3], 1.0)),
            Progress::Pending { remaining: 2 }
        );
        assert_eq!(
            assembly.record_failed("b.stl", "not found"),
            Progress::Pending { remaining: 1 }
        );
        let Progress::Complete(report) = assembly.record_loaded("c.stl", &cube([2.0; 3], 1.0))
        else {
            panic!("third outcome should complete the assembly");
        };
        assert_eq!(report.loaded, vec!["a.stl".to_string(), "c.stl".to_string()]);
        assert_eq!(
            report.failed,
            vec![LoadFailure {
                path: "b.stl".to_string(),
                reason: "not found".to_string()
            }]
        );
        assert_eq!(report.bounds, Aabb::new([0.0; 3], [3.0; 3]));
    }

    #[test]
    fn complete_is_reported_once() {
        let mut assembly = Assembly::new(1);
        assert!(matches!(
            assembly.record_failed("a.stl", "boom"),
            Progress::Complete(_)
        ));
        assert!(matches!(
            assembly.record_failed("a.stl", "boom"),
            Progress::Pending { remaining: 0 }
        ));
    }

    #[test]
    fn bounds_do_not_depend_on_arrival_order() {
        let parts = [
            ("base.stl", cube([-5.0, 0.0, -5.0], 10.0)),
            ("arm.stl", cube([0.0, 10.0, 0.0], 2.0)),
            ("hand.stl", cube([1.0, 12.0, -3.0], 1.0)),
        ];
        let run = |order: &[usize]| {
            let mut assembly = Assembly::new(parts.len());
            let mut last = None;
            for &i in order {
                last = Some(assembly.record_loaded(parts[i].0, &parts[i].1));
            }
            match last {
                Some(Progress::Complete(report)) => report.bounds,
                other => panic!("expected completion, got {:?}", other),
            }
        };
        let expected = parts
            .iter()
            .fold(Aabb::empty(), |acc, (_, b)| acc.union(b));
        for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]] {
            assert_eq!(run(&order), expected);
        }
    }

    #[test]
    fn only_failures_leave_the_box_empty() {
        let mut assembly = Assembly::new(2);
        assembly.record_failed("a.stl", "404");
        let Progress::Complete(report) = assembly.record_failed("b.stl", "404") else {
            panic!("expected completion");
        };
        assert!(report.loaded.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report.bounds.is_empty());
    }

    #[test]
    fn summary_names_each_failure_once() {
        let mut assembly = Assembly::new(3);
        assembly.record_loaded("a.stl", &cube([0.0; 3], 1.0));
        assembly.record_failed("b.stl", "404");
        let Progress::Complete(report) = assembly.record_failed("c.stl", "truncated") else {
            panic!("expected completion");
        };
        assert_eq!(report.summary(), "1 loaded, 2 failed (b.stl, c.stl)");

        let mut assembly = Assembly::new(1);
        let Progress::Complete(report) = assembly.record_loaded("a.stl", &cube([0.0; 3], 1.0))
        else {
            panic!("expected completion");
        };
        assert_eq!(report.summary(), "1 loaded, 0 failed");
    }

    #[test]
    fn nothing_requested_is_complete_immediately() {
        let mut assembly = Assembly::new(0);
        assert!(assembly.is_complete());
        assert!(matches!(assembly.poll(), Progress::Complete(_)));
        assert_eq!(assembly.poll(), Progress::Pending { remaining: 0 });
    }
}
