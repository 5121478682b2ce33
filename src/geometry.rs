//! Signature and transform math for oriented point pairs.
//!
//! Pure functions only: the 3-angle signature used as hash key, the
//! closed-form rigid transform aligning one oriented pair to another, and
//! the coplanarity test used to reject rotationally unconstrained pairs.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::types::{SurfaceNormal, SurfacePoint};

/// Vectors shorter than this are treated as degenerate and refuse to
/// normalize (coincident sample points, normals parallel to the chord).
const MIN_VECTOR_NORM: f64 = 1e-9;

/// A rigid-body transform: rotation followed by translation.
///
/// The rotation block is kept orthonormal by construction; every way of
/// building a `RigidTransform` in this crate goes through an orthonormal
/// frame product or an axis-angle decode. The 12-float layout returned by
/// [`to_array`](RigidTransform::to_array) (9 rotation entries in row-major
/// order, then 3 translation entries) is a stable part of the API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    /// Row-major 3×3 rotation.
    pub rotation: Matrix3<f64>,
    /// Translation applied after the rotation.
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    /// Build from a rotation matrix and a translation vector.
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    /// Decode an axis-angle rotation (axis scaled by the angle) and a
    /// translation into a transform.
    pub fn from_axis_angle(axis_angle: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Self::new(
            Rotation3::from_scaled_axis(axis_angle).into_inner(),
            translation,
        )
    }

    /// Axis-angle encoding of the rotation block. The axis is scaled by the
    /// rotation angle, so the magnitude lies in `[0, π]`.
    pub fn axis_angle(&self) -> Vector3<f64> {
        Rotation3::from_matrix_unchecked(self.rotation).scaled_axis()
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, p: &SurfacePoint) -> SurfacePoint {
        SurfacePoint::from(self.rotation * p.coords + self.translation)
    }

    /// Rotate a direction vector (normals transform without translation).
    pub fn rotate_vector(&self, v: &SurfaceNormal) -> SurfaceNormal {
        self.rotation * v
    }

    /// Flatten into the documented 12-float layout: rotation in row-major
    /// order, then translation.
    pub fn to_array(&self) -> [f64; 12] {
        let r = &self.rotation;
        [
            r[(0, 0)],
            r[(0, 1)],
            r[(0, 2)],
            r[(1, 0)],
            r[(1, 1)],
            r[(1, 2)],
            r[(2, 0)],
            r[(2, 1)],
            r[(2, 2)],
            self.translation.x,
            self.translation.y,
            self.translation.z,
        ]
    }

    /// Rebuild from the 12-float layout produced by
    /// [`to_array`](RigidTransform::to_array).
    pub fn from_array(a: &[f64; 12]) -> Self {
        Self::new(
            Matrix3::new(a[0], a[1], a[2], a[3], a[4], a[5], a[6], a[7], a[8]),
            Vector3::new(a[9], a[10], a[11]),
        )
    }
}

/// Normalize `v`, or `None` if it is too short to carry a direction.
fn normalized(v: Vector3<f64>) -> Option<Vector3<f64>> {
    let norm = v.norm();
    if norm < MIN_VECTOR_NORM {
        return None;
    }
    Some(v / norm)
}

/// Project `v` onto the plane orthogonal to the unit vector `axis`.
fn project_off_axis(v: &Vector3<f64>, axis: &Vector3<f64>) -> Vector3<f64> {
    v - axis * v.dot(axis)
}

/// Signature of the oriented point pair `((p1, n1), (p2, n2))`: the angles
/// between `n1` and `p2 − p1`, between `n2` and `p1 − p2`, and between `n1`
/// and `n2`, each in `[0, π]`.
///
/// Dot products are clamped to `[−1, 1]` before `acos` so floating round-off
/// cannot produce an out-of-domain argument. Returns `None` for coincident
/// points, which cannot define a chord direction.
pub fn pair_signature(
    p1: &SurfacePoint,
    n1: &SurfaceNormal,
    p2: &SurfacePoint,
    n2: &SurfaceNormal,
) -> Option<[f64; 3]> {
    let chord = normalized(p2 - p1)?;
    Some([
        n1.dot(&chord).clamp(-1.0, 1.0).acos(),
        n2.dot(&-chord).clamp(-1.0, 1.0).acos(),
        n1.dot(n2).clamp(-1.0, 1.0).acos(),
    ])
}

/// True if the pair is (nearly) coplanar: both normals orthogonal to the
/// chord and parallel to each other, all within `max_angle` radians.
///
/// Coplanar pairs constrain translation but not rotation about the common
/// normal, so they are optionally excluded from hashing and sampling.
pub fn points_are_coplanar(
    p1: &SurfacePoint,
    n1: &SurfaceNormal,
    p2: &SurfacePoint,
    n2: &SurfaceNormal,
    max_angle: f64,
) -> bool {
    let Some([a0, a1, a2]) = pair_signature(p1, n1, p2, n2) else {
        return false;
    };
    (a0 - std::f64::consts::FRAC_PI_2).abs() <= max_angle
        && (a1 - std::f64::consts::FRAC_PI_2).abs() <= max_angle
        && a2 <= max_angle
}

/// Compute the rigid transform mapping the oriented pair
/// `((a1, a1_n), (b1, b1_n))` onto `((a2, a2_n), (b2, b2_n))`.
///
/// Each pair defines an orthonormal frame: origin at the pair midpoint,
/// x-axis along the unit chord, y-axis the normalized sum of both normals
/// projected off the chord, z-axis their cross product. With `F1` and `F2`
/// the frame matrices, the rotation is `F2 · F1ᵀ` (the frame matrices are
/// orthonormal, so the inverse of `F1` is its transpose) and the translation
/// maps the first origin onto the second.
///
/// The construction is exact for truly corresponding pairs and a local
/// estimate otherwise; it is not a least-squares fit. Returns `None` for
/// degenerate geometry (coincident points, or a normal pair that cancels
/// when projected off the chord).
#[allow(clippy::too_many_arguments)]
pub fn transform_between_pairs(
    a1: &SurfacePoint,
    a1_n: &SurfaceNormal,
    b1: &SurfacePoint,
    b1_n: &SurfaceNormal,
    a2: &SurfacePoint,
    a2_n: &SurfaceNormal,
    b2: &SurfacePoint,
    b2_n: &SurfaceNormal,
) -> Option<RigidTransform> {
    let o1 = 0.5 * (a1.coords + b1.coords);
    let o2 = 0.5 * (a2.coords + b2.coords);

    let x1 = normalized(b1 - a1)?;
    let x2 = normalized(b2 - a2)?;

    // Averaging the two projected normals spreads normal noise across both
    // points of the pair.
    let y1 = normalized(
        normalized(project_off_axis(a1_n, &x1))? + normalized(project_off_axis(b1_n, &x1))?,
    )?;
    let y2 = normalized(
        normalized(project_off_axis(a2_n, &x2))? + normalized(project_off_axis(b2_n, &x2))?,
    )?;

    let z1 = x1.cross(&y1);
    let z2 = x2.cross(&y2);

    let frame1 = Matrix3::from_columns(&[x1, y1, z1]);
    let frame2 = Matrix3::from_columns(&[x2, y2, z2]);

    let rotation = frame2 * frame1.transpose();
    let translation = o2 - rotation * o1;

    Some(RigidTransform::new(rotation, translation))
}
