//! Rally kernel: authoritative simulation state for the driving scene.
//!
//! Holds the vehicle integrator and the collectible field. Nothing here
//! knows about windows, GPUs or files.
//!
//! # Invariants
//! - `VehicleModel::step` clamps its delta to `[0, MAX_FRAME_TIME]`; a
//!   non-finite delta integrates nothing.
//! - Steering stays within `±VehicleTuning::max_steering`.
//! - With no drive key held the vehicle reaches exact rest in finite steps.
//! - Part transforms are rewritten only on steps that change something visible.

pub mod coins;
pub mod vehicle;

pub use coins::{CoinConfig, CoinEvent, CoinField};
pub use vehicle::{
    ControlKey, CockpitView, MAX_FRAME_TIME, REFERENCE_FPS, VehicleModel, VehicleParts,
    VehicleTuning,
};
