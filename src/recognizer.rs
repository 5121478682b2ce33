//! The end-to-end recognition pipeline.

use log::debug;

use crate::conflict::resolve_conflicts;
use crate::error::RecognitionError;
use crate::geometry::RigidTransform;
use crate::hypothesis::{generate_hypotheses, ScoredHypothesis};
use crate::model_library::{ModelLibrary, UserData};
use crate::pose_space::PoseSpace;
use crate::sampler::{number_of_iterations, PairSampler, SampledPair};
use crate::scorer::score_hypotheses;
use crate::settings::{RecognitionMode, RecognitionSettings};
use crate::types::{SurfaceNormal, SurfacePoint};
use crate::voxel::{SurfaceGrid, ZProjection};

/// One recognized object instance.
#[derive(Debug, Clone)]
pub struct Output {
    /// The name the model was registered under.
    pub object_name: String,
    /// Pose mapping model coordinates into scene coordinates.
    pub transform: RigidTransform,
    /// Fraction of the model surface explained by the scene.
    pub confidence: f64,
    /// The opaque data attached when the model was registered.
    pub user_data: Option<UserData>,
}

/// RANSAC-based recognizer for rigid objects in range scans.
///
/// Models are registered once up front; [`Recognizer::recognize`] can then
/// be called repeatedly with different scenes. After a run in
/// [`RecognitionMode::SamplePairsOnly`] or
/// [`RecognitionMode::TestHypotheses`] the intermediate results of the
/// stopped pipeline are available through [`Recognizer::sampled_pairs`] and
/// [`Recognizer::accepted_hypotheses`].
pub struct Recognizer {
    settings: RecognitionSettings,
    library: ModelLibrary,
    sampled_pairs: Vec<SampledPair>,
    accepted_hypotheses: Vec<ScoredHypothesis>,
}

impl Recognizer {
    pub fn new(settings: RecognitionSettings) -> Self {
        let library = ModelLibrary::new(&settings);
        Self {
            settings,
            library,
            sampled_pairs: Vec::new(),
            accepted_hypotheses: Vec::new(),
        }
    }

    pub fn settings(&self) -> &RecognitionSettings {
        &self.settings
    }

    /// Register an object model under a unique name.
    pub fn add_model(
        &mut self,
        points: &[SurfacePoint],
        normals: &[SurfaceNormal],
        name: &str,
        user_data: Option<UserData>,
    ) -> Result<(), RecognitionError> {
        self.library.add_model(points, normals, name, user_data)
    }

    /// Look up a registered model by name.
    pub fn model(&self, name: &str) -> Option<&crate::model_library::Model> {
        self.library.model(name)
    }

    /// Number of registered models.
    pub fn num_models(&self) -> usize {
        self.library.models().len()
    }

    /// The point pairs drawn from the scene during the last run.
    pub fn sampled_pairs(&self) -> &[SampledPair] {
        &self.sampled_pairs
    }

    /// The hypotheses that survived scoring during the last run.
    pub fn accepted_hypotheses(&self) -> &[ScoredHypothesis] {
        &self.accepted_hypotheses
    }

    /// Run recognition on a scene range scan.
    ///
    /// `success_probability` is the desired probability of detecting an
    /// object that occupies at least `relative_object_size` of the scene;
    /// it steers the number of sampling iterations. Values of `1.0` or more
    /// are clamped to `0.99`.
    ///
    /// Depending on [`RecognitionSettings::mode`] the pipeline may stop
    /// early and return no outputs; the partial results are then exposed on
    /// the recognizer itself.
    pub fn recognize(
        &mut self,
        scene_points: &[SurfacePoint],
        scene_normals: &[SurfaceNormal],
        success_probability: f64,
    ) -> Result<Vec<Output>, RecognitionError> {
        if scene_points.len() != scene_normals.len() {
            return Err(RecognitionError::MismatchedClouds {
                points: scene_points.len(),
                normals: scene_normals.len(),
            });
        }

        self.sampled_pairs.clear();
        self.accepted_hypotheses.clear();

        if scene_points.is_empty() || self.library.is_empty() {
            return Ok(Vec::new());
        }

        let scene = SurfaceGrid::build(
            scene_points,
            scene_normals,
            self.settings.voxel_size,
            self.settings.scene_bounds_enlargement_factor,
        );
        let projection = ZProjection::build(&scene, self.settings.abs_zdist_thresh());

        let success_probability = if success_probability >= 1.0 {
            0.99
        } else {
            success_probability
        };
        let iterations = number_of_iterations(success_probability, self.settings.relative_object_size)
            .min(scene.full_leaves().len());
        debug!(
            "sampling {} pairs from {} occupied scene leaves",
            iterations,
            scene.full_leaves().len()
        );

        let mut sampler = PairSampler::new(&self.settings);
        self.sampled_pairs = sampler.sample(&scene, iterations);
        if self.settings.mode == RecognitionMode::SamplePairsOnly {
            return Ok(Vec::new());
        }

        let raw = generate_hypotheses(&self.sampled_pairs, &self.library);
        debug!(
            "{} raw hypotheses from {} sampled pairs",
            raw.len(),
            self.sampled_pairs.len()
        );

        let mut pose_space = PoseSpace::new(
            self.settings.rotation_cell_width(),
            self.settings.translation_cell_width,
        );
        let mut dropped = 0usize;
        for hypothesis in &raw {
            if !pose_space.insert(hypothesis.model, &hypothesis.transform) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("{} hypotheses fell outside the rotation domain", dropped);
        }
        let grouped = pose_space.drain();
        debug!("{} pose clusters after grouping", grouped.len());

        self.accepted_hypotheses =
            score_hypotheses(grouped, &self.library, &projection, &self.settings);
        if self.settings.mode == RecognitionMode::TestHypotheses {
            return Ok(Vec::new());
        }

        let kept = resolve_conflicts(
            self.accepted_hypotheses.clone(),
            self.settings.intersection_fraction,
        );

        let outputs = kept
            .into_iter()
            .map(|h| {
                let model = &self.library.models()[h.model];
                Output {
                    object_name: model.name().to_owned(),
                    transform: h.transform,
                    confidence: h.confidence,
                    user_data: model.user_data().cloned(),
                }
            })
            .collect();
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_scene_clouds_are_rejected() {
        let mut recognizer = Recognizer::new(RecognitionSettings::new(0.4, 0.06));
        let points = vec![SurfacePoint::origin()];
        let result = recognizer.recognize(&points, &[], 0.99);
        assert!(matches!(
            result,
            Err(RecognitionError::MismatchedClouds {
                points: 1,
                normals: 0
            })
        ));
    }

    #[test]
    fn empty_scene_yields_no_outputs() {
        let mut recognizer = Recognizer::new(RecognitionSettings::new(0.4, 0.06));
        let outputs = recognizer.recognize(&[], &[], 0.99).unwrap();
        assert!(outputs.is_empty());
    }
}
