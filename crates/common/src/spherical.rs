//! Spherical-coordinate helpers for the camera rig.
//!
//! `theta` is the azimuth around +Y measured from +Z towards +X, `phi` the
//! polar angle measured from +Y.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Lowest polar angle ever produced by [`normalize_phi`].
pub const PHI_EPSILON: f32 = 1e-3;

/// A point expressed as distance, azimuth and polar angle (radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spherical {
    pub d: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub const fn new(d: f32, theta: f32, phi: f32) -> Self {
        Self { d, theta, phi }
    }

    /// Build from angles given in degrees, as vehicle descriptors store them.
    pub fn from_degrees(d: f32, theta_deg: f32, phi_deg: f32) -> Self {
        Self::new(d, deg_to_rad(theta_deg), deg_to_rad(phi_deg))
    }

    pub fn to_cartesian(self) -> Vec3 {
        to_cartesian(self.d, self.theta, self.phi)
    }
}

pub fn to_cartesian(d: f32, theta: f32, phi: f32) -> Vec3 {
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Vec3::new(d * sin_phi * sin_theta, d * cos_phi, d * sin_phi * cos_theta)
}

/// Inverse of [`to_cartesian`]. `theta` comes back in `(-π, π]`.
pub fn to_spherical(v: Vec3) -> Spherical {
    let d = v.length();
    if d <= f32::EPSILON {
        return Spherical::new(0.0, 0.0, PHI_EPSILON);
    }
    Spherical::new(d, v.x.atan2(v.z), (v.y / d).clamp(-1.0, 1.0).acos())
}

/// Wrap an azimuth into `[0, 2π)`.
pub fn normalize_theta(theta: f32) -> f32 {
    theta.rem_euclid(TAU)
}

/// Reflect a polar angle into `[0, π]` and keep it off the pole.
pub fn normalize_phi(phi: f32) -> f32 {
    let phi = (phi % TAU).abs();
    let phi = if phi > PI { TAU - phi } else { phi };
    phi.clamp(PHI_EPSILON, PI)
}

pub fn deg_to_rad(d: f32) -> f32 {
    d * PI / 180.0
}

pub fn rad_to_deg(r: f32) -> f32 {
    r * 180.0 / PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn angular_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).rem_euclid(TAU);
        d.min(TAU - d)
    }

    #[test]
    fn cartesian_axes() {
        let up = to_cartesian(2.0, 0.0, 0.0);
        assert!((up - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-6);

        let front = to_cartesian(1.0, 0.0, PI / 2.0);
        assert!((front - Vec3::Z).length() < 1e-6);

        let side = to_cartesian(1.0, PI / 2.0, PI / 2.0);
        assert!((side - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn degenerate_vector_is_finite() {
        let s = to_spherical(Vec3::ZERO);
        assert_eq!(s.d, 0.0);
        assert!(s.phi.is_finite());
    }

    #[test]
    fn phi_floor_at_pole() {
        assert_eq!(normalize_phi(0.0), PHI_EPSILON);
        assert_eq!(normalize_phi(-0.0), PHI_EPSILON);
        assert_eq!(normalize_phi(TAU), PHI_EPSILON);
    }

    #[test]
    fn phi_reflects_past_pi() {
        let reflected = normalize_phi(PI + 0.5);
        assert!((reflected - (PI - 0.5)).abs() < 1e-5);
    }

    #[test]
    fn degree_conversions() {
        assert!((deg_to_rad(180.0) - PI).abs() < 1e-6);
        assert!((rad_to_deg(PI / 2.0) - 90.0).abs() < 1e-4);
        let s = Spherical::from_degrees(3.0, 90.0, 45.0);
        assert!((s.theta - PI / 2.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn theta_is_periodic(theta in -100.0f32..100.0, n in -20i32..20) {
            let shifted = theta + TAU * n as f32;
            let a = normalize_theta(theta);
            let b = normalize_theta(shifted);
            prop_assert!(angular_distance(a, b) < 1e-3);
            prop_assert!((0.0..=TAU).contains(&a));
        }

        #[test]
        fn phi_stays_in_range(phi in -1000.0f32..1000.0) {
            let p = normalize_phi(phi);
            prop_assert!((PHI_EPSILON..=PI).contains(&p));
        }

        #[test]
        fn spherical_round_trip(
            d in 0.1f32..100.0,
            theta in -3.1f32..3.1,
            phi in 0.05f32..3.09,
        ) {
            let s = to_spherical(to_cartesian(d, theta, phi));
            prop_assert!((s.d - d).abs() < 1e-3 * d.max(1.0));
            prop_assert!(angular_distance(s.theta, theta) < 1e-3);
            prop_assert!((s.phi - phi).abs() < 1e-3);
        }
    }
}
