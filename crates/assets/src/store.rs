use std::collections::BTreeMap;
use std::path::Path;

use glam::Vec3;
use rally_common::MeshId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::AssetError;

/// An axis-aligned, flat-coloured box. The only mesh primitive the scene uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxMesh {
    /// Full extents along X, Y and Z.
    pub size: Vec3,
    /// Box centre in the part's local frame.
    #[serde(default)]
    pub center: Vec3,
    /// Linear RGB.
    pub color: [f32; 3],
}

/// One vertex of a triangulated mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Outward normals and the two in-face axes of each box face.
const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

impl BoxMesh {
    pub fn new(size: Vec3, color: [f32; 3]) -> Self {
        Self {
            size,
            center: Vec3::ZERO,
            color,
        }
    }

    pub fn with_center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    /// 24 vertices and 36 counter-clockwise indices.
    pub fn triangulate(&self) -> (Vec<MeshVertex>, Vec<u16>) {
        let half = self.size * 0.5;
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in FACES {
            let base = vertices.len() as u16;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = self.center + (normal + u * su + v * sv) * half;
                vertices.push(MeshVertex {
                    position: p.to_array(),
                    normal: normal.to_array(),
                    color: self.color,
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        (vertices, indices)
    }

    fn content_hash(&self) -> MeshId {
        let mut hasher = Sha256::new();
        for v in [self.size, self.center] {
            for c in v.to_array() {
                hasher.update(c.to_le_bytes());
            }
        }
        for c in self.color {
            hasher.update(c.to_le_bytes());
        }
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[..8]);
        MeshId(u64::from_le_bytes(bytes))
    }
}

/// Content-addressed mesh registry.
///
/// Identical box definitions share one `MeshId`, so a vehicle with four equal
/// wheels uploads one wheel mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetStore {
    meshes: BTreeMap<MeshId, BoxMesh>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_box(&mut self, mesh: BoxMesh) -> MeshId {
        let id = mesh.content_hash();
        self.meshes.entry(id).or_insert(mesh);
        id
    }

    pub fn get(&self, id: MeshId) -> Option<&BoxMesh> {
        self.meshes.get(&id)
    }

    pub fn contains(&self, id: MeshId) -> bool {
        self.meshes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &BoxMesh)> {
        self.meshes.iter().map(|(id, m)| (*id, m))
    }

    /// Save the registry to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| AssetError::io(path, e))?;
        serde_json::to_writer_pretty(file, self).map_err(|e| AssetError::json(path, e))?;
        Ok(())
    }

    /// Load a registry from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| AssetError::io(path, e))?;
        serde_json::from_reader(file).map_err(|e| AssetError::json(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel() -> BoxMesh {
        BoxMesh::new(Vec3::new(0.5, 0.5, 0.3), [0.1, 0.1, 0.1])
    }

    #[test]
    fn identical_boxes_share_an_id() {
        let mut store = AssetStore::new();
        let a = store.register_box(wheel());
        let b = store.register_box(wheel());
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn any_field_changes_the_id() {
        let mut store = AssetStore::new();
        let base = store.register_box(wheel());
        let moved = store.register_box(wheel().with_center(Vec3::Y));
        let mut red = wheel();
        red.color = [1.0, 0.0, 0.0];
        let red = store.register_box(red);
        assert_ne!(base, moved);
        assert_ne!(base, red);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn triangulated_box_spans_its_extents() {
        let mesh = BoxMesh::new(Vec3::new(2.0, 1.0, 4.0), [1.0; 3]).with_center(Vec3::X);
        let (vertices, indices) = mesh.triangulate();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        let (min, max) = vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(lo, hi), v| {
                let p = Vec3::from_array(v.position);
                (lo.min(p), hi.max(p))
            },
        );
        assert!((min - Vec3::new(0.0, -0.5, -2.0)).length() < 1e-6);
        assert!((max - Vec3::new(2.0, 0.5, 2.0)).length() < 1e-6);
    }

    #[test]
    fn faces_wind_outward() {
        let (vertices, indices) = BoxMesh::new(Vec3::ONE, [1.0; 3]).triangulate();
        for tri in indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(vertices[i as usize].position));
            let n = Vec3::from_array(vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0);
        }
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut store = AssetStore::new();
        let id = store.register_box(wheel());
        store.save(tmp.path()).unwrap();

        let loaded = AssetStore::load(tmp.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(id), Some(&wheel()));
    }
}
