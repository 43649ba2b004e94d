//! Vehicle descriptors: the JSON files a catalog points at.
//!
//! A descriptor names up to seven sections (`chassis`, `front_wheel_dx`,
//! `front_wheel_sx`, `back_wheel_dx`, `back_wheel_sx`, `sus_edge_dx`,
//! `sus_edge_sx`). Every box of a section becomes one part sharing the
//! section's transform. Angles are degrees on disk and radians in memory.

use glam::Vec3;
use rally_common::spherical::deg_to_rad;
use rally_common::{Part, PartTransform, Spherical};
use rally_kernel::{CockpitView, VehicleModel, VehicleParts, VehicleTuning};
use serde::{Deserialize, Serialize};

use crate::store::{AssetStore, BoxMesh};

/// Part transform as written in a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDescriptor {
    pub translation: Vec3,
    /// Degrees around X, Y and Z.
    pub rotation: Vec3,
    pub scale: Vec3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_center: Option<Vec3>,
}

impl Default for TransformDescriptor {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation_center: None,
        }
    }
}

impl TransformDescriptor {
    pub fn to_transform(&self) -> PartTransform {
        PartTransform {
            translation: self.translation,
            rotation: Vec3::new(
                deg_to_rad(self.rotation.x),
                deg_to_rad(self.rotation.y),
                deg_to_rad(self.rotation.z),
            ),
            scale: self.scale,
            rotation_center: self.rotation_center,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    #[serde(default)]
    pub transforms: TransformDescriptor,
    pub boxes: Vec<BoxMesh>,
}

impl SectionDescriptor {
    fn parts(&self, store: &mut AssetStore) -> Vec<Part> {
        let transform = self.transforms.to_transform();
        self.boxes
            .iter()
            .map(|b| Part::new(store.register_box(*b), transform))
            .collect()
    }
}

/// Spherical coordinates with angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalDegrees {
    pub d: f32,
    pub theta: f32,
    pub phi: f32,
}

impl SphericalDegrees {
    pub fn to_spherical(self) -> Spherical {
        Spherical::from_degrees(self.d, self.theta, self.phi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CockpitDescriptor {
    pub eye: SphericalDegrees,
    pub target: SphericalDegrees,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    pub name: String,
    #[serde(default)]
    pub tuning: VehicleTuning,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cockpit: Option<CockpitDescriptor>,
    pub chassis: SectionDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_wheel_dx: Option<SectionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_wheel_sx: Option<SectionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_wheel_dx: Option<SectionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_wheel_sx: Option<SectionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sus_edge_dx: Option<SectionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sus_edge_sx: Option<SectionDescriptor>,
}

impl VehicleDescriptor {
    /// Reasons this descriptor cannot produce a drivable vehicle.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.chassis.boxes.is_empty() {
            problems.push("chassis has no boxes".to_string());
        }
        let t = &self.tuning;
        if !(0.0..1.0).contains(&t.steer_return) {
            problems.push(format!("steer_return {} not in [0, 1)", t.steer_return));
        }
        if t.front_wheel_radius <= 0.0 || t.rear_wheel_radius <= 0.0 {
            problems.push("wheel radii must be positive".to_string());
        }
        if let Some(c) = &self.cockpit {
            if c.eye.d <= 0.0 || c.target.d <= 0.0 {
                problems.push("cockpit distances must be positive".to_string());
            }
            if c.target.phi <= 0.0 || c.target.phi >= 180.0 {
                problems.push("cockpit target phi must be in (0, 180)".to_string());
            }
        }
        for (name, section) in self.sections() {
            for b in &section.boxes {
                if b.size.min_element() <= 0.0 {
                    problems.push(format!("{name}: box with non-positive size"));
                }
            }
        }
        problems
    }

    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &SectionDescriptor)> {
        [
            ("chassis", Some(&self.chassis)),
            ("front_wheel_dx", self.front_wheel_dx.as_ref()),
            ("front_wheel_sx", self.front_wheel_sx.as_ref()),
            ("back_wheel_dx", self.back_wheel_dx.as_ref()),
            ("back_wheel_sx", self.back_wheel_sx.as_ref()),
            ("sus_edge_dx", self.sus_edge_dx.as_ref()),
            ("sus_edge_sx", self.sus_edge_sx.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, s)| s.map(|s| (name, s)))
    }

    /// Register the meshes and build a vehicle at rest.
    pub fn build(&self, store: &mut AssetStore) -> VehicleModel {
        let mut pair = |a: &Option<SectionDescriptor>, b: &Option<SectionDescriptor>| {
            a.iter()
                .chain(b.iter())
                .flat_map(|s| s.parts(store))
                .collect::<Vec<_>>()
        };
        let front_wheels = pair(&self.front_wheel_dx, &self.front_wheel_sx);
        let back_wheels = pair(&self.back_wheel_dx, &self.back_wheel_sx);
        let suspension_edges = pair(&self.sus_edge_dx, &self.sus_edge_sx);
        let parts = VehicleParts {
            chassis: self.chassis.parts(store),
            front_wheels,
            back_wheels,
            suspension_edges,
        };
        let cockpit = self
            .cockpit
            .map(|c| CockpitView {
                eye: c.eye.to_spherical(),
                target: c.target.to_spherical(),
            })
            .unwrap_or_default();
        VehicleModel::new(self.name.clone(), self.tuning, cockpit, parts)
    }

    /// A small box car, used when no catalog is given.
    pub fn demo() -> Self {
        let wheel = |x: f32, z: f32| SectionDescriptor {
            transforms: TransformDescriptor {
                translation: Vec3::new(x, 0.0, z),
                rotation_center: Some(Vec3::new(0.0, 0.35, 0.0)),
                ..TransformDescriptor::default()
            },
            boxes: vec![
                BoxMesh::new(Vec3::new(0.7, 0.7, 0.3), [0.08, 0.08, 0.08])
                    .with_center(Vec3::new(0.0, 0.35, 0.0)),
            ],
        };
        Self {
            name: "Demo".to_string(),
            tuning: VehicleTuning::default(),
            cockpit: Some(CockpitDescriptor {
                eye: SphericalDegrees {
                    d: 1.2,
                    theta: 0.0,
                    phi: 35.0,
                },
                target: SphericalDegrees {
                    d: 1.0,
                    theta: -90.0,
                    phi: 90.0,
                },
            }),
            chassis: SectionDescriptor {
                transforms: TransformDescriptor::default(),
                boxes: vec![
                    BoxMesh::new(Vec3::new(3.2, 0.45, 1.5), [0.75, 0.12, 0.1])
                        .with_center(Vec3::new(0.0, 0.55, 0.0)),
                    BoxMesh::new(Vec3::new(1.4, 0.45, 1.2), [0.15, 0.2, 0.3])
                        .with_center(Vec3::new(0.3, 1.0, 0.0)),
                ],
            },
            front_wheel_dx: Some(wheel(-1.1, 0.8)),
            front_wheel_sx: Some(wheel(-1.1, -0.8)),
            back_wheel_dx: Some(wheel(1.1, 0.8)),
            back_wheel_sx: Some(wheel(1.1, -0.8)),
            sus_edge_dx: None,
            sus_edge_sx: None,
        }
    }
}

/// List of descriptor paths, relative to the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleCatalog {
    pub paths: Vec<String>,
}
