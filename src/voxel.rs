//! Voxel summaries of surface point clouds.
//!
//! [`SurfaceGrid`] organizes a cloud into fixed-size cells and keeps one
//! averaged oriented sample per occupied cell ("full leaf"). Both the scene
//! and every registered model are summarized this way; all pair sampling and
//! hashing works on full leaves, never on raw points. [`ZProjection`]
//! flattens the scene grid along z into pixels with an occupied z-interval,
//! which the scorer uses both as the set of explainable scene elements and
//! as the free-space check.

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::types::{PixelId, SurfaceNormal, SurfacePoint};

/// Normal sums below this length carry no direction (opposing normals
/// cancelled inside one cell); such cells produce no leaf.
const MIN_NORMAL_NORM: f64 = 1e-9;

/// One occupied cell of a [`SurfaceGrid`]: the average of the samples that
/// fell into it.
#[derive(Debug, Clone)]
pub struct SurfaceLeaf {
    /// Mean position of the samples in the cell.
    pub point: SurfacePoint,
    /// Normalized mean of the sample normals.
    pub normal: SurfaceNormal,
}

#[derive(Default)]
struct CellAccumulator {
    point_sum: Vector3<f64>,
    normal_sum: Vector3<f64>,
    count: usize,
}

/// A uniform voxel grid over an oriented point cloud.
pub struct SurfaceGrid {
    cell_size: f64,
    origin: SurfacePoint,
    /// Occupied cell key → index into `leaves`.
    cells: HashMap<[i64; 3], usize>,
    leaves: Vec<SurfaceLeaf>,
}

impl SurfaceGrid {
    /// Voxelize `points`/`normals` at `cell_size`, enlarging the cloud
    /// bounds on every side by `bounds_enlargement` times the largest
    /// extent. Samples with unusable normals are dropped; cells whose
    /// normals cancel produce no leaf.
    ///
    /// Both slices must have equal length (validated by the caller).
    pub fn build(
        points: &[SurfacePoint],
        normals: &[SurfaceNormal],
        cell_size: f64,
        bounds_enlargement: f64,
    ) -> Self {
        let mut grid = Self {
            cell_size,
            origin: SurfacePoint::origin(),
            cells: HashMap::new(),
            leaves: Vec::new(),
        };
        if points.is_empty() {
            return grid;
        }

        let mut min = points[0];
        let mut max = points[0];
        for p in points {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        let largest_extent = (0..3).map(|i| max[i] - min[i]).fold(0.0, f64::max);
        let margin = bounds_enlargement * largest_extent;
        grid.origin = SurfacePoint::new(min.x - margin, min.y - margin, min.z - margin);

        let mut accumulators: HashMap<[i64; 3], CellAccumulator> = HashMap::new();
        for (p, n) in points.iter().zip(normals) {
            if n.norm() < MIN_NORMAL_NORM {
                continue;
            }
            let acc = accumulators.entry(grid.cell_of(p)).or_default();
            acc.point_sum += p.coords;
            acc.normal_sum += *n;
            acc.count += 1;
        }

        // Sort keys so leaf indices do not depend on hash iteration order.
        let mut keys: Vec<[i64; 3]> = accumulators.keys().copied().collect();
        keys.sort_unstable();
        for key in keys {
            let acc = &accumulators[&key];
            let normal_sum_norm = acc.normal_sum.norm();
            if normal_sum_norm < MIN_NORMAL_NORM {
                continue;
            }
            grid.cells.insert(key, grid.leaves.len());
            grid.leaves.push(SurfaceLeaf {
                point: SurfacePoint::from(acc.point_sum / acc.count as f64),
                normal: acc.normal_sum / normal_sum_norm,
            });
        }
        grid
    }

    /// Edge length of one cell.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// All occupied leaves, in a deterministic order.
    pub fn full_leaves(&self) -> &[SurfaceLeaf] {
        &self.leaves
    }

    fn cell_of(&self, p: &SurfacePoint) -> [i64; 3] {
        let rel = p - self.origin;
        [
            (rel.x / self.cell_size).floor() as i64,
            (rel.y / self.cell_size).floor() as i64,
            (rel.z / self.cell_size).floor() as i64,
        ]
    }

    /// Indices of full leaves whose cell cube intersects the *surface* of
    /// the sphere with the given center and radius.
    ///
    /// This is the spatial separation query behind pair sampling and model
    /// pair enumeration: candidates lie at distance ≈ `radius` (within one
    /// cell diagonal) from `center`.
    pub fn leaves_on_sphere(&self, center: &SurfacePoint, radius: f64) -> Vec<usize> {
        let mut out = Vec::new();
        if self.leaves.is_empty() || radius <= 0.0 {
            return out;
        }

        let lo = SurfacePoint::new(center.x - radius, center.y - radius, center.z - radius);
        let hi = SurfacePoint::new(center.x + radius, center.y + radius, center.z + radius);
        let lo_cell = self.cell_of(&lo);
        let hi_cell = self.cell_of(&hi);

        for kx in lo_cell[0]..=hi_cell[0] {
            for ky in lo_cell[1]..=hi_cell[1] {
                for kz in lo_cell[2]..=hi_cell[2] {
                    let key = [kx, ky, kz];
                    let Some(&leaf_idx) = self.cells.get(&key) else {
                        continue;
                    };
                    if self.cube_intersects_sphere(&key, center, radius) {
                        out.push(leaf_idx);
                    }
                }
            }
        }
        out
    }

    /// True if the cell cube intersects the sphere surface: the nearest
    /// point of the cube is inside the sphere and the farthest corner is
    /// outside (or on) it.
    fn cube_intersects_sphere(&self, key: &[i64; 3], center: &SurfacePoint, radius: f64) -> bool {
        let mut nearest_sq = 0.0;
        let mut farthest_sq = 0.0;
        for i in 0..3 {
            let cube_min = self.origin[i] + key[i] as f64 * self.cell_size;
            let cube_max = cube_min + self.cell_size;
            let c = center[i];
            let nearest = c.clamp(cube_min, cube_max) - c;
            let farthest = (c - cube_min).abs().max((c - cube_max).abs());
            nearest_sq += nearest * nearest;
            farthest_sq += farthest * farthest;
        }
        nearest_sq <= radius * radius && radius * radius <= farthest_sq
    }
}

/// One pixel of the scene z-projection: the z-interval occupied by scene
/// surface in one (x, y) column, extended by the configured z tolerance.
#[derive(Debug, Clone)]
pub struct Pixel {
    /// Stable scene-element identifier recorded in explained sets.
    pub id: PixelId,
    /// Lower end of the occupied z-interval (tolerance already applied).
    pub z_min: f64,
    /// Upper end of the occupied z-interval (tolerance already applied).
    pub z_max: f64,
}

/// Projection of a [`SurfaceGrid`] onto the xy-plane, which for range-scan
/// data roughly corresponds to the scanner's projection plane.
///
/// A transformed model point below a pixel's interval sits in space the
/// scanner saw through, i.e. known free space; inside the interval it touches
/// observed surface; columns with no pixel were never observed and count
/// neither way.
pub struct ZProjection {
    pixel_size: f64,
    origin_x: f64,
    origin_y: f64,
    pixels: HashMap<[i64; 2], Pixel>,
}

impl ZProjection {
    /// Project every occupied cell of `grid` onto the xy-plane, widening
    /// each column's z-interval by `z_tolerance` on both ends.
    pub fn build(grid: &SurfaceGrid, z_tolerance: f64) -> Self {
        let mut intervals: HashMap<[i64; 2], (f64, f64)> = HashMap::new();
        for key in grid.cells.keys() {
            let cell_z_min = grid.origin.z + key[2] as f64 * grid.cell_size;
            let cell_z_max = cell_z_min + grid.cell_size;
            intervals
                .entry([key[0], key[1]])
                .and_modify(|(z_min, z_max)| {
                    *z_min = z_min.min(cell_z_min);
                    *z_max = z_max.max(cell_z_max);
                })
                .or_insert((cell_z_min, cell_z_max));
        }

        let mut keys: Vec<[i64; 2]> = intervals.keys().copied().collect();
        keys.sort_unstable();
        let mut pixels = HashMap::with_capacity(keys.len());
        for (id, key) in keys.into_iter().enumerate() {
            let (z_min, z_max) = intervals[&key];
            pixels.insert(
                key,
                Pixel {
                    id,
                    z_min: z_min - z_tolerance,
                    z_max: z_max + z_tolerance,
                },
            );
        }

        Self {
            pixel_size: grid.cell_size,
            origin_x: grid.origin.x,
            origin_y: grid.origin.y,
            pixels,
        }
    }

    /// The pixel whose column contains `p`, if that column holds any scene
    /// surface.
    pub fn pixel_at(&self, p: &SurfacePoint) -> Option<&Pixel> {
        let key = [
            ((p.x - self.origin_x) / self.pixel_size).floor() as i64,
            ((p.y - self.origin_y) / self.pixel_size).floor() as i64,
        ];
        self.pixels.get(&key)
    }

    /// Number of occupied pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// True if the projection holds no occupied column.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}
