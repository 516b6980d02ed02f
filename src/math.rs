// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Math primitives
//!
//! Vectors and matrices come from `glam`; this module adds the scalar helpers
//! the engine relies on and inversion that reports degenerate transforms
//! instead of producing NaNs.

pub use glam::{Affine2, Mat2, Vec2};

use crate::error::{EngineError, Result};

pub const PI: f32 = std::f32::consts::PI;
pub const TWO_PI: f32 = std::f32::consts::TAU;
pub const PI_OVER_2: f32 = std::f32::consts::FRAC_PI_2;
pub const PI_OVER_4: f32 = std::f32::consts::FRAC_PI_4;

/// Tolerance used by [`approximately_equal`]
pub const EPSILON: f32 = 1e-6;

/// Clamp `value` into `[min, max]`; `min` wins when the range is inverted.
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    min.max(value.min(max))
}

/// Clamp into `[0, 1]`
#[inline]
pub fn saturate(value: f32) -> f32 {
    clamp(value, 0.0, 1.0)
}

/// Linear interpolation with `t` clamped into `[0, 1]`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    lerp_unclamped(a, b, saturate(t))
}

#[inline]
pub fn lerp_unclamped(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Vector lerp with `t` clamped into `[0, 1]`
#[inline]
pub fn lerp_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a.lerp(b, saturate(t))
}

/// Hermite smooth step between `edge0` and `edge1`
pub fn smooth_step(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = saturate((x - edge0) / (edge1 - edge0));
    t * t * (3.0 - 2.0 * t)
}

/// Wrap an angle in radians into `[-PI, PI)`
pub fn normalize_angle(angle: f32) -> f32 {
    let mut wrapped = angle - TWO_PI * (angle / TWO_PI).round();
    if wrapped < -PI {
        wrapped += TWO_PI;
    }
    if wrapped >= PI {
        wrapped -= TWO_PI;
    }
    wrapped
}

#[inline]
pub fn approximately_equal(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

#[inline]
pub fn square(value: f32) -> f32 {
    value * value
}

/// Invert a 2x2 matrix, failing with [`EngineError::Singular`] when the
/// determinant is (numerically) zero.
pub fn try_inverse_mat2(matrix: &Mat2) -> Result<Mat2> {
    if matrix.determinant().abs() < f32::EPSILON {
        return Err(EngineError::Singular);
    }
    Ok(matrix.inverse())
}

/// Invert an affine transform, failing with [`EngineError::Singular`] when its
/// linear part cannot be inverted.
pub fn try_inverse(transform: &Affine2) -> Result<Affine2> {
    if transform.matrix2.determinant().abs() < f32::EPSILON {
        return Err(EngineError::Singular);
    }
    Ok(transform.inverse())
}

/// Rotation angle encoded in an affine transform's x axis
#[inline]
pub fn rotation_of(transform: &Affine2) -> f32 {
    let x_axis = transform.matrix2.x_axis;
    x_axis.y.atan2(x_axis.x)
}

/// Per-axis scale encoded in an affine transform
#[inline]
pub fn scale_of(transform: &Affine2) -> Vec2 {
    Vec2::new(
        transform.matrix2.x_axis.length(),
        transform.matrix2.y_axis.length(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_and_saturate() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(saturate(0.25), 0.25);
        // inverted range collapses to min
        assert_eq!(clamp(3.0, 2.0, 1.0), 2.0);
    }

    #[test]
    fn test_lerp_clamps_t() {
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(0.0, 10.0, 2.0), 10.0);
        assert_eq!(lerp_unclamped(0.0, 10.0, 2.0), 20.0);
    }

    #[test]
    fn test_smooth_step_edges() {
        assert_eq!(smooth_step(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smooth_step(0.0, 1.0, 2.0), 1.0);
        assert!(approximately_equal(smooth_step(0.0, 1.0, 0.5), 0.5));
    }

    #[test]
    fn test_normalize_angle_range() {
        for raw in [-10.0f32, -PI, -1.0, 0.0, 1.0, PI, 3.5 * PI, 100.0] {
            let n = normalize_angle(raw);
            assert!((-PI..PI).contains(&n), "{raw} -> {n}");
            assert!((n.sin() - raw.sin()).abs() < 1e-3);
            assert!((n.cos() - raw.cos()).abs() < 1e-3);
        }
        assert!(approximately_equal(normalize_angle(PI), -PI));
    }

    #[test]
    fn test_try_inverse_singular() {
        let degenerate = Affine2::from_scale(Vec2::new(0.0, 1.0));
        assert_eq!(try_inverse(&degenerate), Err(EngineError::Singular));
        assert_eq!(
            try_inverse_mat2(&Mat2::from_cols(Vec2::ONE, Vec2::ONE)),
            Err(EngineError::Singular)
        );
    }

    #[test]
    fn test_try_inverse_roundtrip() -> Result<()> {
        let t = Affine2::from_scale_angle_translation(
            Vec2::new(2.0, 3.0),
            0.7,
            Vec2::new(5.0, -4.0),
        );
        let inv = try_inverse(&t)?;
        let p = Vec2::new(1.5, -2.5);
        let back = inv.transform_point2(t.transform_point2(p));
        assert!((back - p).length() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_decompose_rotation_and_scale() {
        let t = Affine2::from_scale_angle_translation(Vec2::new(2.0, 4.0), 0.5, Vec2::ZERO);
        assert!((rotation_of(&t) - 0.5).abs() < 1e-5);
        assert!((scale_of(&t) - Vec2::new(2.0, 4.0)).length() < 1e-5);
    }
}
