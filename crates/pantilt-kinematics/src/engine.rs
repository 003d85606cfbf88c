//! The kinematics engine.
//!
//! Maintains the fixed mounting geometry of a pan-tilt camera and evaluates,
//! per joint-angle pair, the homogeneous transform that carries points from
//! the base frame into the camera frame.  Every operation is a pure function
//! of the angles: the engine holds no mutable state after construction and is
//! safe to share across threads.

use nalgebra::{Matrix3, Matrix4, Quaternion, Vector3};
use tracing::warn;

// ────────────────────────────────────────────────────────────────────────────
// Mounting geometry
// ────────────────────────────────────────────────────────────────────────────

/// Fixed mounting offsets of the camera relative to the base frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountOffsets {
    /// Horizontal offset between the tilt axis and the camera centre, metres.
    pub a: f64,
    /// Vertical offset along the pan axis, metres.
    pub d: f64,
}

impl MountOffsets {
    /// Create a new offset pair.
    pub fn new(a: f64, d: f64) -> Self {
        Self { a, d }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PanTiltKinematics
// ────────────────────────────────────────────────────────────────────────────

/// Forward-kinematics evaluator for a two-axis pan-tilt mount.
///
/// Pan rotates about the vertical base axis, tilt about the horizontal axis
/// atop the pan stage.  An optional alignment correction — a fixed 4×4
/// transform applied *after* the pan/tilt geometry, i.e. in the camera frame —
/// re-aligns the ideal camera frame with the physically mounted sensor.  The
/// correction defaults to identity and is owned per instance.
///
/// Angles are radians and unrestricted: the trigonometry is periodic and no
/// range check or wraparound normalization is performed.
#[derive(Debug, Clone)]
pub struct PanTiltKinematics {
    offsets: MountOffsets,
    alignment: Matrix4<f64>,
}

impl PanTiltKinematics {
    /// Create an engine with the given mounting offsets and an identity
    /// alignment correction.
    pub fn new(offsets: MountOffsets) -> Self {
        Self {
            offsets,
            alignment: Matrix4::identity(),
        }
    }

    /// Replace the alignment correction.
    ///
    /// The matrix is taken as-is; no orthogonality or validity check is
    /// performed — supplying a rotation block that is not proper orthonormal
    /// voids the unit-norm guarantee on [`quaternion`][Self::quaternion].
    pub fn with_alignment(mut self, alignment: Matrix4<f64>) -> Self {
        self.alignment = alignment;
        self
    }

    /// Replace the alignment correction from dynamically shaped rows, e.g.
    /// parsed configuration.
    ///
    /// An override that is not exactly 4×4 is rejected with a logged warning
    /// and the identity default is kept; this is not an error.
    pub fn with_alignment_rows(self, rows: &[Vec<f64>]) -> Self {
        match matrix_from_rows(rows) {
            Some(m) => self.with_alignment(m),
            None => {
                warn!(
                    rows = rows.len(),
                    "alignment override is not a 4x4 matrix; keeping identity"
                );
                self
            }
        }
    }

    /// The mounting offsets this engine was built with.
    pub fn offsets(&self) -> MountOffsets {
        self.offsets
    }

    /// The active alignment correction.
    pub fn alignment(&self) -> &Matrix4<f64> {
        &self.alignment
    }

    /// Homogeneous transform from the base frame to the camera frame at the
    /// given pan and tilt angles (radians).
    ///
    /// The result is built fresh on every call.  The pan/tilt geometry is
    /// applied first, the alignment correction second, so the correction acts
    /// in the already-transformed camera frame.
    pub fn transform(&self, pan: f64, tilt: f64) -> Matrix4<f64> {
        let MountOffsets { a, d } = self.offsets;
        let (sp, cp) = pan.sin_cos();
        let (st, ct) = tilt.sin_cos();

        let geometry = Matrix4::new(
            cp * ct, -st * cp, sp, a * ct * cp,
            sp * ct, -st * sp, -cp, a * ct * sp,
            st, ct, 0.0, a * st + d,
            0.0, 0.0, 0.0, 1.0,
        );
        geometry * self.alignment
    }

    /// Translation from the base-frame origin to the camera-frame origin.
    pub fn translation(&self, pan: f64, tilt: f64) -> Vector3<f64> {
        let m = self.transform(pan, tilt);
        Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
    }

    /// Rotation carrying base-frame directions into the camera frame.
    pub fn rotation(&self, pan: f64, tilt: f64) -> Matrix3<f64> {
        self.transform(pan, tilt).fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// The rotation block as a unit quaternion, trace-based extraction.
    ///
    /// Component magnitudes come from the diagonal, component signs from the
    /// off-diagonal differences (a zero difference maps to `+`).  Radicands
    /// are clamped at zero before the square root, so the result is finite for
    /// any input — including alignment corrections whose rotation block has
    /// drifted below a trace of −1.
    pub fn quaternion(&self, pan: f64, tilt: f64) -> Quaternion<f64> {
        let r = self.rotation(pan, tilt);
        let trace = r[(0, 0)] + r[(1, 1)] + r[(2, 2)];

        let w = 0.5 * sqrt_clamped(1.0 + trace);
        let x = apply_sign(
            0.5 * sqrt_clamped(1.0 + r[(0, 0)] - r[(1, 1)] - r[(2, 2)]),
            r[(2, 1)] - r[(1, 2)],
        );
        let y = apply_sign(
            0.5 * sqrt_clamped(1.0 - r[(0, 0)] + r[(1, 1)] - r[(2, 2)]),
            r[(0, 2)] - r[(2, 0)],
        );
        let z = apply_sign(
            0.5 * sqrt_clamped(1.0 - r[(0, 0)] - r[(1, 1)] + r[(2, 2)]),
            r[(1, 0)] - r[(0, 1)],
        );

        Quaternion::new(w, x, y, z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Square root with the radicand clamped at zero.
///
/// Rounding can push a radicand slightly negative for near-degenerate
/// rotations; the clamp keeps the root real.
fn sqrt_clamped(radicand: f64) -> f64 {
    radicand.max(0.0).sqrt()
}

/// Magnitude of `magnitude` with the sign of `sign`; a zero (or signed-zero)
/// `sign` maps to positive so the result is deterministic across platforms.
fn apply_sign(magnitude: f64, sign: f64) -> f64 {
    if sign < 0.0 { -magnitude } else { magnitude }
}

/// Interpret `rows` as a row-major 4×4 matrix, if the shape matches.
fn matrix_from_rows(rows: &[Vec<f64>]) -> Option<Matrix4<f64>> {
    if rows.len() != 4 || rows.iter().any(|r| r.len() != 4) {
        return None;
    }
    Some(Matrix4::from_fn(|r, c| rows[r][c]))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
