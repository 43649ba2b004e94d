//! Shared types and pure math used by every rally crate.
//!
//! # Invariants
//! - Spherical conversions use one axis convention everywhere:
//!   `x = d·sinφ·sinθ`, `y = d·cosφ`, `z = d·sinφ·cosθ`.
//! - Part transforms store rotations in radians.

pub mod spherical;
pub mod types;

pub use spherical::Spherical;
pub use types::{MeshId, Part, PartTransform};
