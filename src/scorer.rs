//! Hypothesis scoring against the observed scene.

use std::collections::HashSet;

use log::debug;

use crate::hypothesis::{Hypothesis, ScoredHypothesis};
use crate::model_library::ModelLibrary;
use crate::settings::RecognitionSettings;
use crate::voxel::ZProjection;

/// Score each grouped hypothesis and keep the plausible ones.
///
/// Every full leaf of the hypothesis's model is transformed into the scene
/// and classified against the z-projection: a point whose column carries no
/// scene surface is ignored, a point below the column's occupied z-interval
/// sits in known free space and counts as a penalty ("illegal point"), and a
/// point inside the interval counts as a match, with the pixel recorded as
/// explained.
///
/// A hypothesis survives when its confidence (matched fraction of the model
/// surface) reaches `visibility` and its penalties stay within
/// `relative_num_of_illegal_points` of the model size. Everything else is
/// filtered silently; low confidence is an expected condition, not an
/// error.
pub fn score_hypotheses(
    hypotheses: Vec<Hypothesis>,
    library: &ModelLibrary,
    projection: &ZProjection,
    settings: &RecognitionSettings,
) -> Vec<ScoredHypothesis> {
    let num_grouped = hypotheses.len();
    let mut accepted = Vec::new();

    for hypothesis in hypotheses {
        let leaves = library.models()[hypothesis.model].grid().full_leaves();
        if leaves.is_empty() {
            continue;
        }

        let mut matches = 0usize;
        let mut penalty = 0usize;
        let mut explained = HashSet::new();

        for leaf in leaves {
            let q = hypothesis.transform.transform_point(&leaf.point);
            let Some(pixel) = projection.pixel_at(&q) else {
                continue;
            };
            if q.z < pixel.z_min {
                penalty += 1;
            } else if q.z <= pixel.z_max {
                matches += 1;
                explained.insert(pixel.id);
            }
        }

        let total = leaves.len() as f64;
        let confidence = matches as f64 / total;
        if confidence < settings.visibility {
            continue;
        }
        if penalty as f64 > settings.relative_num_of_illegal_points * total {
            continue;
        }

        accepted.push(ScoredHypothesis {
            model: hypothesis.model,
            transform: hypothesis.transform,
            confidence,
            explained,
        });
    }

    debug!(
        "scoring kept {} of {} grouped hypotheses",
        accepted.len(),
        num_grouped
    );
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RigidTransform;
    use crate::types::{SurfaceNormal, SurfacePoint};
    use crate::voxel::SurfaceGrid;
    use nalgebra::Vector3;

    /// Library with one bumpy sheet model; scene grid built from the same
    /// cloud.
    fn fixture() -> (RecognitionSettings, ModelLibrary, ZProjection) {
        let mut points = Vec::new();
        let mut normals = Vec::new();
        for i in 0..40 {
            for j in 0..40 {
                let x = i as f64 * 0.03;
                let y = j as f64 * 0.03;
                let z = 0.2 * (2.0 * x).sin() + 0.1 * (3.0 * y).sin();
                points.push(SurfacePoint::new(x, y, z));
                normals.push(
                    SurfaceNormal::new(-0.4 * (2.0 * x).cos(), -0.3 * (3.0 * y).cos(), 1.0)
                        .normalize(),
                );
            }
        }

        let settings = RecognitionSettings::new(0.4, 0.06);
        let mut library = ModelLibrary::new(&settings);
        library.add_model(&points, &normals, "sheet", None).unwrap();

        let scene = SurfaceGrid::build(
            &points,
            &normals,
            settings.voxel_size,
            settings.scene_bounds_enlargement_factor,
        );
        let projection = ZProjection::build(&scene, settings.abs_zdist_thresh());
        (settings, library, projection)
    }

    #[test]
    fn identity_pose_on_its_own_scene_scores_fully() {
        let (settings, library, projection) = fixture();
        let hypothesis = Hypothesis {
            model: 0,
            transform: RigidTransform::identity(),
        };

        let scored = score_hypotheses(vec![hypothesis], &library, &projection, &settings);
        assert_eq!(scored.len(), 1);
        assert!(scored[0].confidence > 0.99);
        assert!(!scored[0].explained.is_empty());
    }

    #[test]
    fn pose_in_free_space_is_discarded_for_illegal_points() {
        let (settings, library, projection) = fixture();
        // Same footprint, far below the observed surface: every point lands
        // in space the scanner saw through.
        let hypothesis = Hypothesis {
            model: 0,
            transform: RigidTransform::new(
                nalgebra::Matrix3::identity(),
                Vector3::new(0.0, 0.0, -10.0),
            ),
        };
        assert!(score_hypotheses(vec![hypothesis], &library, &projection, &settings).is_empty());
    }

    #[test]
    fn pose_outside_the_scene_is_discarded_for_low_confidence() {
        let (settings, library, projection) = fixture();
        let hypothesis = Hypothesis {
            model: 0,
            transform: RigidTransform::new(
                nalgebra::Matrix3::identity(),
                Vector3::new(100.0, 100.0, 0.0),
            ),
        };
        assert!(score_hypotheses(vec![hypothesis], &library, &projection, &settings).is_empty());
    }
}
