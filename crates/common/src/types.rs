use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Handle to a mesh registered in the asset store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(pub u64);

/// Spatial transform of a render part: translation, Euler rotation, scale.
///
/// Rotations are radians and compose as Y, then Z, then X. When a
/// `rotation_center` is set the rotation pivots around that local point
/// instead of the part origin (wheels spin around their hub).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartTransform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub rotation_center: Option<Vec3>,
}

impl Default for PartTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation_center: None,
        }
    }
}

impl PartTransform {
    /// Local-to-parent matrix.
    pub fn matrix(&self) -> Mat4 {
        let rotation = Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z)
            * Mat4::from_rotation_x(self.rotation.x);
        let pivoted = match self.rotation_center {
            Some(c) => Mat4::from_translation(c) * rotation * Mat4::from_translation(-c),
            None => rotation,
        };
        Mat4::from_translation(self.translation) * pivoted * Mat4::from_scale(self.scale)
    }
}

/// A drawable piece of a vehicle or scene: a mesh plus its transform.
///
/// Parts are built by the asset layer; simulation code only mutates the
/// transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub mesh: MeshId,
    pub transform: PartTransform,
}

impl Part {
    pub fn new(mesh: MeshId, transform: PartTransform) -> Self {
        Self { mesh, transform }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn transform_default_is_identity() {
        let t = PartTransform::default();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translation_then_yaw() {
        let t = PartTransform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            rotation: Vec3::new(0.0, FRAC_PI_2, 0.0),
            ..PartTransform::default()
        };
        // +X rotated a quarter turn around Y lands on -Z, then shifts by +X.
        let p = t.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn rotation_center_is_fixed_point() {
        let center = Vec3::new(0.0, 0.5, 0.0);
        let t = PartTransform {
            rotation: Vec3::new(0.0, 0.0, 1.3),
            rotation_center: Some(center),
            ..PartTransform::default()
        };
        let p = t.matrix().transform_point3(center);
        assert!((p - center).length() < 1e-5);
    }
}
