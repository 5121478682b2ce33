//! Model registration and the pair-signature hash table.
//!
//! Registering a model voxelizes its surface, enumerates every ordered leaf
//! pair at chord distance ≈ pair width, and files each pair's signature in a
//! discretized hash table. At recognition time the generator looks up a
//! scene pair's signature bucket and gets back all candidate model pairs
//! with near-identical geometry in one step, instead of searching models
//! exhaustively.

use std::any::Any;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use log::debug;

use crate::error::RecognitionError;
use crate::geometry::{pair_signature, points_are_coplanar};
use crate::settings::RecognitionSettings;
use crate::types::{ModelId, SurfaceNormal, SurfacePoint};
use crate::voxel::SurfaceGrid;

/// Opaque caller data attached to a model and passed through unchanged into
/// every [`Output`](crate::Output) that detects it.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Number of hash bins per signature angle over `[0, π]`.
const SIGNATURE_BINS: usize = 60;

/// A registered object model.
pub struct Model {
    name: String,
    grid: SurfaceGrid,
    user_data: Option<UserData>,
}

impl Model {
    /// The unique name the model was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The model's voxelized surface.
    pub fn grid(&self) -> &SurfaceGrid {
        &self.grid
    }

    /// The opaque data attached at registration, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }
}

/// One candidate correspondence stored in the hash table: an ordered pair of
/// full-leaf indices of one model.
#[derive(Debug, Clone, Copy)]
pub struct PairEntry {
    /// Owning model.
    pub model: ModelId,
    /// First leaf of the pair (index into the model grid's full leaves).
    pub leaf1: usize,
    /// Second leaf of the pair.
    pub leaf2: usize,
}

/// Hash table keyed by the discretized 3-angle pair signature.
///
/// Lookup is exact-bucket: signatures of corresponding model and scene pairs
/// agree within one bin in the common case, and the pose clusterer absorbs
/// the votes lost at bin boundaries.
#[derive(Default)]
pub struct SignatureTable {
    bins: HashMap<[usize; 3], Vec<PairEntry>>,
    len: usize,
}

impl SignatureTable {
    fn bucket(signature: &[f64; 3]) -> [usize; 3] {
        let width = PI / SIGNATURE_BINS as f64;
        let mut key = [0usize; 3];
        for (k, angle) in key.iter_mut().zip(signature) {
            let clamped = angle.clamp(0.0, PI);
            *k = ((clamped / width) as usize).min(SIGNATURE_BINS - 1);
        }
        key
    }

    fn insert(&mut self, signature: &[f64; 3], entry: PairEntry) {
        self.bins.entry(Self::bucket(signature)).or_default().push(entry);
        self.len += 1;
    }

    /// All model pairs filed under the same bucket as `signature`.
    pub fn entries(&self, signature: &[f64; 3]) -> &[PairEntry] {
        self.bins
            .get(&Self::bucket(signature))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of stored pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no pairs are stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Owns the registered models and their shared signature hash table.
pub struct ModelLibrary {
    pair_width: f64,
    voxel_size: f64,
    max_coplanarity_angle: f64,
    ignore_coplanar_point_pairs: bool,
    models: Vec<Model>,
    table: SignatureTable,
}

impl ModelLibrary {
    /// Create an empty library using the pipeline settings.
    pub fn new(settings: &RecognitionSettings) -> Self {
        Self {
            pair_width: settings.pair_width,
            voxel_size: settings.voxel_size,
            max_coplanarity_angle: settings.max_coplanarity_angle(),
            ignore_coplanar_point_pairs: settings.ignore_coplanar_point_pairs,
            models: Vec::new(),
            table: SignatureTable::default(),
        }
    }

    /// Register a model under a unique `name`.
    ///
    /// Fails with [`RecognitionError::DuplicateModelName`] if the name is
    /// taken (the library is left unchanged) and with
    /// [`RecognitionError::MismatchedClouds`] if `points` and `normals`
    /// differ in length.
    pub fn add_model(
        &mut self,
        points: &[SurfacePoint],
        normals: &[SurfaceNormal],
        name: &str,
        user_data: Option<UserData>,
    ) -> Result<(), RecognitionError> {
        if points.len() != normals.len() {
            return Err(RecognitionError::MismatchedClouds {
                points: points.len(),
                normals: normals.len(),
            });
        }
        if self.models.iter().any(|m| m.name == name) {
            return Err(RecognitionError::DuplicateModelName(name.to_string()));
        }

        let grid = SurfaceGrid::build(points, normals, self.voxel_size, 0.0);
        let model_id: ModelId = self.models.len();
        let leaves = grid.full_leaves();

        let mut num_pairs = 0usize;
        for (i, leaf1) in leaves.iter().enumerate() {
            for j in grid.leaves_on_sphere(&leaf1.point, self.pair_width) {
                if i == j {
                    continue;
                }
                let leaf2 = &leaves[j];
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
                let Some(signature) =
                    pair_signature(&leaf1.point, &leaf1.normal, &leaf2.point, &leaf2.normal)
                else {
                    continue;
                };
                self.table.insert(
                    &signature,
                    PairEntry {
                        model: model_id,
                        leaf1: i,
                        leaf2: j,
                    },
                );
                num_pairs += 1;
            }
        }

        debug!(
            "registered model `{}`: {} full leaves, {} hashed pairs",
            name,
            leaves.len(),
            num_pairs
        );
        self.models.push(Model {
            name: name.to_string(),
            grid,
            user_data,
        });
        Ok(())
    }

    /// All registered models, in registration order ([`ModelId`] indexes
    /// this slice).
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Look up a model by its registered name.
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// The shared signature hash table.
    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    /// True if no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A curved strip: signatures vary, so pairs survive the coplanarity
    /// filter.
    fn wavy_strip() -> (Vec<SurfacePoint>, Vec<SurfaceNormal>) {
        let mut points = Vec::new();
        let mut normals = Vec::new();
        for i in 0..60 {
            for j in 0..12 {
                let x = i as f64 * 0.02;
                let y = j as f64 * 0.02;
                let z = 0.25 * (3.0 * x).sin();
                points.push(SurfacePoint::new(x, y, z));
                normals.push(SurfaceNormal::new(-0.75 * (3.0 * x).cos(), 0.0, 1.0).normalize());
            }
        }
        (points, normals)
    }

    fn settings() -> RecognitionSettings {
        RecognitionSettings::new(0.4, 0.06)
    }

    #[test]
    fn registration_fills_the_hash_table() {
        let (points, normals) = wavy_strip();
        let mut library = ModelLibrary::new(&settings());
        library.add_model(&points, &normals, "strip", None).unwrap();

        assert_eq!(library.models().len(), 1);
        assert!(library.model("strip").is_some());
        assert!(!library.table().is_empty());

        // A stored signature looks itself up.
        let model = library.model("strip").unwrap();
        let leaves = model.grid().full_leaves();
        let partners = model.grid().leaves_on_sphere(&leaves[0].point, 0.4);
        assert!(!partners.is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected_without_mutation() {
        let (points, normals) = wavy_strip();
        let mut library = ModelLibrary::new(&settings());
        library.add_model(&points, &normals, "cup", None).unwrap();
        let pairs_before = library.table().len();

        let err = library.add_model(&points, &normals, "cup", None).unwrap_err();
        assert!(matches!(err, RecognitionError::DuplicateModelName(_)));
        assert_eq!(library.models().len(), 1);
        assert_eq!(library.table().len(), pairs_before);
    }

    #[test]
    fn mismatched_clouds_are_rejected() {
        let (points, normals) = wavy_strip();
        let mut library = ModelLibrary::new(&settings());
        let err = library
            .add_model(&points, &normals[..normals.len() - 1], "strip", None)
            .unwrap_err();
        assert!(matches!(err, RecognitionError::MismatchedClouds { .. }));
        assert!(library.is_empty());
    }

    #[test]
    fn bucket_clamps_to_the_angle_domain() {
        // Angles exactly at π and slightly past it land in the last bin.
        let top = SignatureTable::bucket(&[PI, PI + 1e-9, 0.0]);
        assert_eq!(top, [SIGNATURE_BINS - 1, SIGNATURE_BINS - 1, 0]);
    }
}
