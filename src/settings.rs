//! Configuration for the recognition pipeline.

/// Pipeline mode selector.
///
/// The two diagnostic modes stop the pipeline early and retain intermediate
/// results on the [`Recognizer`](crate::Recognizer) for inspection. They are
/// debugging entry points, not part of the production contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecognitionMode {
    /// Run the full pipeline and return final detections.
    #[default]
    Full,
    /// Stop after oriented-pair sampling; the sampled pairs are exposed via
    /// [`Recognizer::sampled_pairs`](crate::Recognizer::sampled_pairs).
    SamplePairsOnly,
    /// Stop after hypothesis scoring, before conflict resolution; the scored
    /// hypotheses are exposed via
    /// [`Recognizer::accepted_hypotheses`](crate::Recognizer::accepted_hypotheses).
    TestHypotheses,
}

/// Parameters of the recognition pipeline.
///
/// `pair_width` and `voxel_size` have no sensible universal defaults (they
/// are scene-scale dependent) and are therefore required by [`new`]; the
/// remaining fields start at defaults that work for typical range-scanner
/// data and can be adjusted before the first
/// [`add_model`](crate::Recognizer::add_model) call.
///
/// `pair_width` should be roughly half the extent of the visible object
/// part: for each object point there should be at least one point of the
/// same object at that distance. Smaller values tolerate more occlusion but
/// align less precisely. `voxel_size` is the surface discretization step;
/// larger values are faster but blur object detail.
///
/// [`new`]: RecognitionSettings::new
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecognitionSettings {
    /// Characteristic sampling distance between the two points of a pair.
    pub pair_width: f64,
    /// Edge length of the surface voxel grid leaves.
    pub voxel_size: f64,
    /// Pairs whose normals are parallel and orthogonal to the chord within
    /// this angle (degrees) are treated as coplanar.
    pub max_coplanarity_angle_deg: f64,
    /// Skip coplanar pairs during model preprocessing and scene sampling.
    /// Coplanar pairs carry no rotational constraint and dominate false
    /// matches on flat surfaces.
    pub ignore_coplanar_point_pairs: bool,
    /// Fraction of the largest scene extent added on each side of the scene
    /// bounds before voxelization.
    pub scene_bounds_enlargement_factor: f64,
    /// Estimated fraction of an object's surface visible in the scene;
    /// calibrates the number of sampling iterations.
    pub relative_object_size: f64,
    /// Minimum match confidence for a hypothesis to survive scoring.
    pub visibility: f64,
    /// Maximum fraction of model points allowed to fall into known free
    /// space before a hypothesis is discarded.
    pub relative_num_of_illegal_points: f64,
    /// Two hypotheses conflict when their shared explained scene elements
    /// exceed this fraction of the smaller explained set.
    pub intersection_fraction: f64,
    /// Edge length (degrees) of a rotation cell of the pose clustering grid.
    pub rotation_cell_width_deg: f64,
    /// Edge length of a translation cell of the pose clustering grid.
    pub translation_cell_width: f64,
    /// Pipeline mode (full run or a diagnostic stop).
    pub mode: RecognitionMode,
    /// Fixed RNG seed for reproducible sampling. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl RecognitionSettings {
    /// Create settings for the given pair width and voxel size, with all
    /// other parameters at their defaults.
    pub fn new(pair_width: f64, voxel_size: f64) -> Self {
        Self {
            pair_width,
            voxel_size,
            max_coplanarity_angle_deg: 3.0,
            ignore_coplanar_point_pairs: true,
            scene_bounds_enlargement_factor: 0.25,
            relative_object_size: 0.05,
            visibility: 0.06,
            relative_num_of_illegal_points: 0.02,
            intersection_fraction: 0.03,
            rotation_cell_width_deg: 6.0,
            translation_cell_width: 5.0 * voxel_size,
            mode: RecognitionMode::Full,
            seed: None,
        }
    }

    /// Maximum coplanarity angle in radians.
    pub fn max_coplanarity_angle(&self) -> f64 {
        self.max_coplanarity_angle_deg.to_radians()
    }

    /// Rotation cell edge length in radians.
    pub fn rotation_cell_width(&self) -> f64 {
        self.rotation_cell_width_deg.to_radians()
    }

    /// Tolerance along z when matching transformed model points against the
    /// scene surface.
    pub fn abs_zdist_thresh(&self) -> f64 {
        1.5 * self.voxel_size
    }
}
