//! Error type for model registration and recognition.

use thiserror::Error;

/// Errors reported by [`Recognizer`](crate::Recognizer) and
/// [`ModelLibrary`](crate::ModelLibrary).
///
/// Expected run-time conditions (bad point pairs, low-confidence hypotheses,
/// empty result sets) are not errors; they are filtered by threshold checks
/// and terminate normally with an empty detection list.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// A model with this name is already registered. The library is left
    /// unchanged.
    #[error("model `{0}` is already registered")]
    DuplicateModelName(String),

    /// A point cloud and its normal cloud differ in length.
    #[error("point cloud and normal cloud differ in length ({points} points, {normals} normals)")]
    MismatchedClouds {
        /// Number of points in the cloud.
        points: usize,
        /// Number of normals in the cloud.
        normals: usize,
    },
}
