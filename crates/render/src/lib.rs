//! Rendering adapter: the camera rig and a backend-agnostic frame interface.
//!
//! # Invariants
//! - Renderers read transforms and matrices; they never mutate simulation state.
//! - Camera matrices are rebuilt only in `Camera::recompute_if_dirty`, and only
//!   when a spherical parameter or the follow transform changed.
//! - The sky is drawn last with `DepthCompare::LessEqual`.

pub mod camera;
mod renderer;

pub use camera::{Camera, CameraMode, FAR_PLANE, NEAR_PLANE};
pub use renderer::{
    DepthCompare, DrawCall, FrameRenderer, FrameUniforms, RecordedFrame, RecordingRenderer,
};
