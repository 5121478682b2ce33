//! Hypothesis types and raw-hypothesis generation.
//!
//! Hypotheses are plain values moved between pipeline stages: generation
//! produces [`RawHypothesis`] instances, the pose clusterer groups them into
//! [`Hypothesis`] instances, and scoring promotes survivors to
//! [`ScoredHypothesis`]. Dropping a container on an early return cleans up
//! the whole stage.

use std::collections::HashSet;

use crate::geometry::{pair_signature, transform_between_pairs, RigidTransform};
use crate::model_library::ModelLibrary;
use crate::sampler::SampledPair;
use crate::types::{ModelId, PixelId};

/// One ungrouped pose vote: a transform derived from a single scene-pair /
/// model-pair correspondence.
#[derive(Debug, Clone, Copy)]
pub struct RawHypothesis {
    /// Model the vote belongs to.
    pub model: ModelId,
    /// Transform mapping the model pair onto the scene pair.
    pub transform: RigidTransform,
}

/// A grouped (clustered but not yet scored) pose hypothesis.
#[derive(Debug, Clone, Copy)]
pub struct Hypothesis {
    /// Model the hypothesis proposes.
    pub model: ModelId,
    /// Averaged transform of the votes in one pose cell.
    pub transform: RigidTransform,
}

/// A hypothesis that survived scoring.
#[derive(Debug, Clone)]
pub struct ScoredHypothesis {
    /// Model the hypothesis proposes.
    pub model: ModelId,
    /// Pose of the proposed instance.
    pub transform: RigidTransform,
    /// Fraction of the model surface matched to the scene, in `(0, 1]`.
    pub confidence: f64,
    /// Scene elements (z-projection pixels) this hypothesis explains.
    pub explained: HashSet<PixelId>,
}

/// Turn sampled scene pairs into raw pose votes.
///
/// Each pair's signature selects a hash bucket; every model pair stored
/// there yields one candidate transform aligning the model pair onto the
/// scene pair. Pairs with degenerate geometry contribute nothing.
pub fn generate_hypotheses(pairs: &[SampledPair], library: &ModelLibrary) -> Vec<RawHypothesis> {
    let mut out = Vec::new();
    for pair in pairs {
        let Some(signature) = pair_signature(&pair.p1, &pair.n1, &pair.p2, &pair.n2) else {
            continue;
        };
        for entry in library.table().entries(&signature) {
            let grid = library.models()[entry.model].grid();
            let leaf1 = &grid.full_leaves()[entry.leaf1];
            let leaf2 = &grid.full_leaves()[entry.leaf2];
            let Some(transform) = transform_between_pairs(
                &leaf1.point,
                &leaf1.normal,
                &leaf2.point,
                &leaf2.normal,
                &pair.p1,
                &pair.n1,
                &pair.p2,
                &pair.n2,
            ) else {
                continue;
            };
            out.push(RawHypothesis {
                model: entry.model,
                transform,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::RecognitionSettings;
    use crate::types::{SurfaceNormal, SurfacePoint};
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn curved_patch() -> (Vec<SurfacePoint>, Vec<SurfaceNormal>) {
        let mut points = Vec::new();
        let mut normals = Vec::new();
        for i in 0..40 {
            for j in 0..40 {
                let x = i as f64 * 0.03;
                let y = j as f64 * 0.03;
                let z = 0.3 * (2.0 * x).sin() + 0.2 * (3.0 * y).cos();
                points.push(SurfacePoint::new(x, y, z));
                normals.push(
                    SurfaceNormal::new(-0.6 * (2.0 * x).cos(), 0.6 * (3.0 * y).sin(), 1.0)
                        .normalize(),
                );
            }
        }
        (points, normals)
    }

    #[test]
    fn model_pairs_vote_for_the_identity_on_themselves() {
        let settings = RecognitionSettings::new(0.4, 0.06);
        let (points, normals) = curved_patch();
        let mut library = ModelLibrary::new(&settings);
        library.add_model(&points, &normals, "patch", None).unwrap();

        // Feed a stored model pair back as a "scene" pair: the exact same
        // geometry must be found in its own bucket and vote for the
        // identity transform.
        let grid = library.model("patch").unwrap().grid();
        let leaves = grid.full_leaves();
        let max_angle = settings.max_coplanarity_angle();
        let (i, j, pair) = leaves
            .iter()
            .enumerate()
            .find_map(|(i, leaf1)| {
                grid.leaves_on_sphere(&leaf1.point, settings.pair_width)
                    .into_iter()
                    // Mirror the registration filter so the chosen pair is
                    // one the hash table actually stores.
                    .find(|&j| {
                        j != i
                            && !crate::geometry::points_are_coplanar(
                                &leaf1.point,
                                &leaf1.normal,
                                &leaves[j].point,
                                &leaves[j].normal,
                                max_angle,
                            )
                    })
                    .map(|j| {
                        (
                            i,
                            j,
                            SampledPair {
                                p1: leaf1.point,
                                n1: leaf1.normal,
                                p2: leaves[j].point,
                                n2: leaves[j].normal,
                            },
                        )
                    })
            })
            .expect("patch has pairs at pair-width distance");
        assert_ne!(i, j);

        let raw = generate_hypotheses(&[pair], &library);
        assert!(!raw.is_empty());

        let identity_votes = raw
            .iter()
            .filter(|h| {
                (h.transform.rotation - Matrix3::identity()).norm() < 1e-9
                    && h.transform.translation.norm() < 1e-9
            })
            .count();
        assert!(identity_votes >= 1, "the pair must at least match itself");
        for h in &raw {
            assert_eq!(h.model, 0);
            assert_relative_eq!(
                h.transform.rotation * h.transform.rotation.transpose(),
                Matrix3::identity(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn no_models_means_no_hypotheses() {
        let settings = RecognitionSettings::new(0.4, 0.06);
        let library = ModelLibrary::new(&settings);
        let pair = SampledPair {
            p1: SurfacePoint::new(0.0, 0.0, 0.0),
            n1: SurfaceNormal::new(0.0, 0.0, 1.0),
            p2: SurfacePoint::new(0.4, 0.0, 0.1),
            n2: SurfaceNormal::new(0.1, 0.0, 1.0).normalize(),
        };
        assert!(generate_hypotheses(&[pair], &library).is_empty());
    }
}
