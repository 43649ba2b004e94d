//! wgpu render backend for the rally scene.
//!
//! Draws lit box meshes, one instance per draw call, and a sky at the far
//! plane. Mesh buffers come from the asset store; the draw order comes from
//! the scene through [`rally_render::FrameRenderer`].
//!
//! # Invariants
//! - Renderer never mutates simulation state.
//! - Draws of meshes that were never uploaded are skipped, not fatal.
//! - A frame's command buffer is returned unsubmitted.

mod gpu;
mod shaders;

pub use gpu::{GpuFrame, WgpuRenderer};
