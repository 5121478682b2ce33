//! Pose clustering in a bounded 6D rotation/translation voxel grid.
//!
//! Each raw transform is a noisy vote for an underlying object pose.
//! Converting rotations to axis-angle form embeds every pose in a
//! six-dimensional space (three axis-angle coordinates bounded to
//! `[−π−ε, π+ε]`, three translation coordinates), which is voxelized so
//! near-duplicate votes land in the same cell. Averaging each occupied
//! cell's votes per model collapses them into one stable grouped
//! hypothesis, which is the central noise-rejection step of the pipeline.
//!
//! Only [`insert`](PoseSpace::insert) and [`drain`](PoseSpace::drain) are
//! public; cells and per-model entries are implementation detail.

use std::collections::HashMap;
use std::f64::consts::PI;

use log::warn;
use nalgebra::Vector3;

use crate::geometry::RigidTransform;
use crate::hypothesis::Hypothesis;
use crate::types::ModelId;

/// Guards axis-angle coordinates landing exactly on ±π.
const ROTATION_BOUND_EPS: f64 = 1e-9;

/// Per-model vote accumulator inside one pose cell.
#[derive(Debug, Clone, Default)]
struct Entry {
    axis_angle: Vector3<f64>,
    translation: Vector3<f64>,
    num_transforms: usize,
}

impl Entry {
    fn add(&mut self, axis_angle: Vector3<f64>, translation: Vector3<f64>) {
        self.axis_angle += axis_angle;
        self.translation += translation;
        self.num_transforms += 1;
    }

    /// Replace the running sums by their mean. Resets the count to 1, so
    /// averaging an already averaged entry is a no-op.
    fn average(&mut self) {
        if self.num_transforms < 2 {
            return;
        }
        let factor = 1.0 / self.num_transforms as f64;
        self.axis_angle *= factor;
        self.translation *= factor;
        self.num_transforms = 1;
    }
}

#[derive(Debug, Clone, Default)]
struct Cell {
    entries: HashMap<ModelId, Entry>,
}

/// The 6D pose voting grid.
pub struct PoseSpace {
    rotation_cell_width: f64,
    translation_cell_width: f64,
    cells: HashMap<[i64; 6], Cell>,
}

impl PoseSpace {
    /// Create an empty grid with the given cell edge lengths (radians for
    /// the three rotation axes, scene units for the three translation
    /// axes).
    pub fn new(rotation_cell_width: f64, translation_cell_width: f64) -> Self {
        Self {
            rotation_cell_width,
            translation_cell_width,
            cells: HashMap::new(),
        }
    }

    /// In-bounds check for an axis-angle vector against `[−π−ε, π+ε]³`.
    ///
    /// Every proper rotation decodes to a magnitude in `[0, π]`, so a
    /// rejection indicates corrupt input rather than an expected pose.
    fn rotation_in_bounds(axis_angle: &Vector3<f64>) -> bool {
        let bound = PI + ROTATION_BOUND_EPS;
        axis_angle.iter().all(|c| c.abs() <= bound)
    }

    /// Add one pose vote for `model`.
    ///
    /// Returns `false` (with a warning) if the transform's axis-angle form
    /// falls outside the bounded rotation domain; the vote is dropped and
    /// the pipeline continues.
    pub fn insert(&mut self, model: ModelId, transform: &RigidTransform) -> bool {
        let axis_angle = transform.axis_angle();
        if !Self::rotation_in_bounds(&axis_angle) {
            warn!(
                "axis-angle ({:.4}, {:.4}, {:.4}) outside the rotation-space bounds [-π, π]³; vote dropped",
                axis_angle.x, axis_angle.y, axis_angle.z
            );
            return false;
        }

        let t = transform.translation;
        let key = [
            (axis_angle.x / self.rotation_cell_width).floor() as i64,
            (axis_angle.y / self.rotation_cell_width).floor() as i64,
            (axis_angle.z / self.rotation_cell_width).floor() as i64,
            (t.x / self.translation_cell_width).floor() as i64,
            (t.y / self.translation_cell_width).floor() as i64,
            (t.z / self.translation_cell_width).floor() as i64,
        ];
        self.cells
            .entry(key)
            .or_default()
            .entries
            .entry(model)
            .or_default()
            .add(axis_angle, t);
        true
    }

    /// Average every occupied cell and emit one grouped hypothesis per
    /// (cell, model) pair, emptying the grid.
    pub fn drain(&mut self) -> Vec<Hypothesis> {
        let mut out = Vec::new();
        for cell in self.cells.values_mut() {
            for (&model, entry) in cell.entries.iter_mut() {
                entry.average();
                out.push(Hypothesis {
                    model,
                    transform: RigidTransform::from_axis_angle(entry.axis_angle, entry.translation),
                });
            }
        }
        self.cells.clear();
        out
    }

    /// Number of occupied cells (diagnostic).
    pub fn num_occupied_cells(&self) -> usize {
        self.cells.len()
    }
}
