//! Oriented point-pair sampling from the scene surface.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::points_are_coplanar;
use crate::settings::RecognitionSettings;
use crate::types::{SurfaceNormal, SurfacePoint};
use crate::voxel::SurfaceGrid;

/// Probability that, given a first sample point on some object, a random
/// second point at pair-width distance belongs to the same object.
const P_SECOND_POINT_ON_OBJECT: f64 = 0.25;

/// Number of pair-sampling iterations needed to reach `success_probability`
/// of hitting at least one all-on-object pair, given the estimated fraction
/// of the object visible in the scene.
///
/// With `p = 0.25 · relative_object_size` the probability of failing every
/// one of `n` draws is `(1 − p)ⁿ`; solving for the target success
/// probability gives `n = ln(1 − P) / ln(1 − p)` (truncated after adding
/// one). A degenerate `p ≥ 1` needs a single draw.
pub fn number_of_iterations(success_probability: f64, relative_object_size: f64) -> usize {
    let p = P_SECOND_POINT_ON_OBJECT * relative_object_size;
    if 1.0 - p <= 0.0 {
        return 1;
    }
    ((1.0 - success_probability).ln() / (1.0 - p).ln() + 1.0) as usize
}

/// An oriented point pair sampled from the scene.
///
/// Positions and normals are leaf averages copied out of the scene grid, so
/// the pair stays valid after the grid of the originating `recognize` call
/// is gone. That is what lets diagnostic mode hand the sampled list back to
/// the caller.
#[derive(Debug, Clone, Copy)]
pub struct SampledPair {
    /// First sample position.
    pub p1: SurfacePoint,
    /// Normal at the first sample.
    pub n1: SurfaceNormal,
    /// Second sample position, at pair-width distance from the first.
    pub p2: SurfacePoint,
    /// Normal at the second sample.
    pub n2: SurfaceNormal,
}

/// Draws oriented point pairs subject to the pair-width separation
/// constraint.
pub struct PairSampler {
    rng: StdRng,
    pair_width: f64,
    max_coplanarity_angle: f64,
    ignore_coplanar_point_pairs: bool,
}

impl PairSampler {
    /// Create a sampler from the pipeline settings; a fixed seed makes
    /// sampling reproducible.
    pub fn new(settings: &RecognitionSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            pair_width: settings.pair_width,
            max_coplanarity_angle: settings.max_coplanarity_angle(),
            ignore_coplanar_point_pairs: settings.ignore_coplanar_point_pairs,
        }
    }

    /// Run `num_iterations` sampling attempts against the scene grid.
    ///
    /// Each attempt draws a random full leaf, then a random full leaf on the
    /// pair-width sphere around it. Attempts with no second candidate or
    /// with coplanar geometry (when the filter is on) are discarded but
    /// still consume the iteration budget, which keeps the total work
    /// bounded.
    pub fn sample(&mut self, grid: &SurfaceGrid, num_iterations: usize) -> Vec<SampledPair> {
        let leaves = grid.full_leaves();
        let mut out = Vec::new();
        if leaves.is_empty() {
            return out;
        }

        for _ in 0..num_iterations {
            let leaf1 = &leaves[self.rng.gen_range(0..leaves.len())];
            let candidates = grid.leaves_on_sphere(&leaf1.point, self.pair_width);
            if candidates.is_empty() {
                continue;
            }
            let leaf2 = &leaves[candidates[self.rng.gen_range(0..candidates.len())]];

            if self.ignore_coplanar_point_pairs
                && points_are_coplanar(
                    &leaf1.point,
                    &leaf1.normal,
                    &leaf2.point,
                    &leaf2.normal,
                    self.max_coplanarity_angle,
                )
            {
                continue;
            }

            out.push(SampledPair {
                p1: leaf1.point,
                n1: leaf1.normal,
                p2: leaf2.point,
                n2: leaf2.normal,
            });
        }
        out
    }
}
