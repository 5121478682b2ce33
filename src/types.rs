//! Shared types for the recognition pipeline.
//!
//! Surface samples are plain `nalgebra` points and vectors; models and scene
//! elements are referred to by small copyable ids so pipeline stages never
//! borrow into each other.

/// A surface sample position.
pub type SurfacePoint = nalgebra::Point3<f64>;

/// A unit surface normal.
pub type SurfaceNormal = nalgebra::Vector3<f64>;

/// Index of a registered model inside the [`ModelLibrary`](crate::ModelLibrary).
pub type ModelId = usize;

/// Identifier of a scene element: a pixel of the scene z-projection.
///
/// Hypotheses record the set of pixel ids they explain; the conflict
/// resolver compares these sets.
pub type PixelId = usize;
