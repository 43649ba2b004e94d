use std::fmt;

use glam::{Mat4, Vec3};
use rally_common::MeshId;

/// Depth test used for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DepthCompare {
    /// Regular opaque geometry.
    Less,
    /// Lets the sky, drawn at the far plane, pass where nothing was drawn.
    LessEqual,
}

/// Values shared by every draw in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    /// Unit vector pointing towards the light.
    pub light_direction: Vec3,
    pub ambient: f32,
    pub view: Mat4,
    pub projection: Mat4,
    pub eye_position: Vec3,
}

/// Backend-agnostic frame sink.
///
/// The scene calls these in a fixed order each rendered frame:
/// `begin_frame`, `set_frame_uniforms`, any number of `draw_mesh`,
/// `draw_skybox` last, then `end_frame`. Renderers never touch simulation
/// state.
pub trait FrameRenderer {
    /// What a finished frame produces.
    type Output;

    fn begin_frame(&mut self, clear_color: [f32; 4]);

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms);

    fn draw_mesh(&mut self, mesh: MeshId, world: Mat4);

    fn draw_skybox(&mut self, inverse_view_direction_projection: Mat4, depth: DepthCompare);

    fn end_frame(&mut self) -> Self::Output;
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear([f32; 4]),
    Uniforms(FrameUniforms),
    Mesh { mesh: MeshId, world: Mat4 },
    Skybox { matrix: Mat4, depth: DepthCompare },
}

/// The calls of one frame, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedFrame {
    pub index: u64,
    pub calls: Vec<DrawCall>,
}

impl RecordedFrame {
    pub fn mesh_draws(&self) -> impl Iterator<Item = (MeshId, Mat4)> + '_ {
        self.calls.iter().filter_map(|c| match c {
            DrawCall::Mesh { mesh, world } => Some((*mesh, *world)),
            _ => None,
        })
    }

    pub fn uniforms(&self) -> Option<&FrameUniforms> {
        self.calls.iter().find_map(|c| match c {
            DrawCall::Uniforms(u) => Some(u),
            _ => None,
        })
    }
}

impl fmt::Display for RecordedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Frame {} ({} calls) ===", self.index, self.calls.len())?;
        for call in &self.calls {
            match call {
                DrawCall::Clear(c) => {
                    writeln!(f, "clear ({:.2}, {:.2}, {:.2}, {:.2})", c[0], c[1], c[2], c[3])?
                }
                DrawCall::Uniforms(u) => {
                    let e = u.eye_position;
                    writeln!(f, "uniforms eye=({:.2}, {:.2}, {:.2})", e.x, e.y, e.z)?
                }
                DrawCall::Mesh { mesh, world } => {
                    let p = world.w_axis;
                    writeln!(
                        f,
                        "  mesh {:016x} at ({:.2}, {:.2}, {:.2})",
                        mesh.0, p.x, p.y, p.z
                    )?
                }
                DrawCall::Skybox { depth, .. } => writeln!(f, "skybox depth={depth:?}")?,
            }
        }
        Ok(())
    }
}

/// Renderer that records every call instead of drawing.
///
/// Used headless by the CLI and by tests that check draw ordering.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    current: RecordedFrame,
    frames: u64,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames finished so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl FrameRenderer for RecordingRenderer {
    type Output = RecordedFrame;

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.current = RecordedFrame {
            index: self.frames,
            calls: vec![DrawCall::Clear(clear_color)],
        };
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.current.calls.push(DrawCall::Uniforms(*uniforms));
    }

    fn draw_mesh(&mut self, mesh: MeshId, world: Mat4) {
        self.current.calls.push(DrawCall::Mesh { mesh, world });
    }

    fn draw_skybox(&mut self, matrix: Mat4, depth: DepthCompare) {
        self.current.calls.push(DrawCall::Skybox { matrix, depth });
    }

    fn end_frame(&mut self) -> RecordedFrame {
        self.frames += 1;
        std::mem::take(&mut self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms() -> FrameUniforms {
        FrameUniforms {
            light_direction: Vec3::Y,
            ambient: 0.2,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            eye_position: Vec3::new(0.0, 3.0, 5.0),
        }
    }

    #[test]
    fn records_calls_in_order() {
        let mut r = RecordingRenderer::new();
        r.begin_frame([0.1, 0.2, 0.3, 1.0]);
        r.set_frame_uniforms(&uniforms());
        r.draw_mesh(MeshId(7), Mat4::from_translation(Vec3::X));
        r.draw_skybox(Mat4::IDENTITY, DepthCompare::LessEqual);
        let frame = r.end_frame();

        assert_eq!(frame.index, 0);
        assert_eq!(frame.calls.len(), 4);
        assert!(matches!(frame.calls[0], DrawCall::Clear(_)));
        assert!(matches!(
            frame.calls[3],
            DrawCall::Skybox {
                depth: DepthCompare::LessEqual,
                ..
            }
        ));
        assert_eq!(frame.mesh_draws().count(), 1);
        assert_eq!(frame.uniforms().map(|u| u.ambient), Some(0.2));
        assert_eq!(r.frame_count(), 1);
    }

    #[test]
    fn frames_are_independent() {
        let mut r = RecordingRenderer::new();
        r.begin_frame([0.0; 4]);
        r.draw_mesh(MeshId(1), Mat4::IDENTITY);
        r.end_frame();
        r.begin_frame([0.0; 4]);
        let second = r.end_frame();
        assert_eq!(second.index, 1);
        assert_eq!(second.mesh_draws().count(), 0);
    }

    #[test]
    fn display_lists_meshes() {
        let mut r = RecordingRenderer::new();
        r.begin_frame([0.0; 4]);
        r.draw_mesh(MeshId(0xabc), Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let text = r.end_frame().to_string();
        assert!(text.contains("Frame 0"));
        assert!(text.contains("0000000000000abc"));
        assert!(text.contains("(1.00, 2.00, 3.00)"));
    }
}
