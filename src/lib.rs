//! RANSAC-based recognition of rigid 3D objects in range scans.
//!
//! Object models are registered as oriented point clouds and compiled into a
//! hash table of point-pair signatures. At recognition time, oriented point
//! pairs sampled from the scene vote for candidate poses through that table.
//! The votes are clustered in a discretized pose space, the cluster averages
//! are scored against the scene's z-projection, and conflicting survivors
//! are resolved greedily by confidence.
//!
//! ```
//! use pairvote::{RecognitionSettings, Recognizer, SurfaceNormal, SurfacePoint};
//!
//! // A curved patch standing in for a scanned object.
//! let mut points = Vec::new();
//! let mut normals = Vec::new();
//! for i in 0..30 {
//!     for j in 0..30 {
//!         let x = i as f64 * 0.02;
//!         let y = j as f64 * 0.02;
//!         points.push(SurfacePoint::new(x, y, 0.1 * (4.0 * x).sin()));
//!         normals.push(SurfaceNormal::new(-0.4 * (4.0 * x).cos(), 0.0, 1.0).normalize());
//!     }
//! }
//!
//! let mut settings = RecognitionSettings::new(0.3, 0.04);
//! settings.seed = Some(42);
//! let mut recognizer = Recognizer::new(settings);
//! recognizer.add_model(&points, &normals, "widget", None).unwrap();
//!
//! // The model's own cloud as the scene: the object must be found.
//! let outputs = recognizer.recognize(&points, &normals, 0.99).unwrap();
//! assert!(!outputs.is_empty());
//! assert_eq!(outputs[0].object_name, "widget");
//! ```

pub mod conflict;
pub mod error;
pub mod geometry;
pub mod hypothesis;
pub mod model_library;
pub mod pose_space;
pub mod recognizer;
pub mod sampler;
pub mod scorer;
pub mod settings;
pub mod types;
pub mod voxel;

pub use error::RecognitionError;
pub use geometry::RigidTransform;
pub use hypothesis::{Hypothesis, ScoredHypothesis};
pub use model_library::{Model, ModelLibrary, UserData};
pub use recognizer::{Output, Recognizer};
pub use sampler::SampledPair;
pub use settings::{RecognitionMode, RecognitionSettings};
pub use types::{ModelId, PixelId, SurfaceNormal, SurfacePoint};
pub use voxel::{SurfaceGrid, ZProjection};
