//! Asset layer: the content-addressed mesh registry and vehicle loading.
//!
//! Meshes are identified by the SHA-256 of their definition. The renderer
//! consumes meshes by `MeshId`, never by file path.
//!
//! # Layout
//! A catalog JSON lists descriptor paths relative to itself; each descriptor
//! declares the boxes and transforms of one vehicle.

use std::path::{Path, PathBuf};

pub mod descriptor;
pub mod source;
pub mod store;

pub use descriptor::{
    CockpitDescriptor, SectionDescriptor, SphericalDegrees, TransformDescriptor, VehicleCatalog,
    VehicleDescriptor,
};
pub use source::{JsonVehicleSource, MemoryVehicleSource, VehicleSource};
pub use store::{AssetStore, BoxMesh, MeshVertex};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid vehicle descriptor {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
    #[error("catalog {0} lists no vehicles")]
    EmptyCatalog(PathBuf),
    #[error("no vehicle at index {index} (catalog has {count})")]
    NoSuchVehicle { index: usize, count: usize },
}

impl AssetError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        AssetError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        AssetError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}
