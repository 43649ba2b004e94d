use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use rally_assets::{AssetStore, BoxMesh};
use rally_common::MeshId;
use rally_render::{DepthCompare, FrameRenderer, FrameUniforms};
use wgpu::util::DeviceExt;

use crate::shaders;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_INSTANCES: u32 = 256;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct FrameData {
    view_proj: [[f32; 4]; 4],
    light: [f32; 4],
    eye: [f32; 4],
}

impl FrameData {
    fn from_uniforms(u: &FrameUniforms) -> Self {
        Self {
            view_proj: (u.projection * u.view).to_cols_array_2d(),
            light: u.light_direction.extend(u.ambient).to_array(),
            eye: u.eye_position.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct SkyData {
    inverse_view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    color: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
}

impl InstanceData {
    fn new(world: Mat4) -> Self {
        Self {
            model: world.to_cols_array_2d(),
        }
    }
}

fn mesh_vertices(mesh: &BoxMesh) -> (Vec<Vertex>, Vec<u16>) {
    let (verts, indices) = mesh.triangulate();
    let verts = verts
        .into_iter()
        .map(|v| Vertex {
            position: v.position,
            normal: v.normal,
            color: v.color,
        })
        .collect();
    (verts, indices)
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// wgpu backend for the scene's draw calls.
///
/// Mesh buffers are uploaded from the [`AssetStore`] with
/// [`WgpuRenderer::sync_meshes`]; a frame is opened with
/// [`WgpuRenderer::frame`] and produces a command buffer for the caller to
/// submit.
pub struct WgpuRenderer {
    mesh_pipeline: wgpu::RenderPipeline,
    pipeline_layout: wgpu::PipelineLayout,
    sky_shader: wgpu::ShaderModule,
    /// Sky pipelines by depth test, built on first use.
    sky_pipelines: BTreeMap<DepthCompare, wgpu::RenderPipeline>,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    sky_buffer: wgpu::Buffer,
    sky_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    max_instances: u32,
    meshes: BTreeMap<MeshId, GpuMesh>,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame_uniform_buffer"),
            contents: bytemuck::bytes_of(&FrameData::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = uniform_bind_group(device, &bind_group_layout, &frame_buffer, "frame");

        let sky_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sky_uniform_buffer"),
            contents: bytemuck::bytes_of(&SkyData {
                inverse_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sky_bind_group = uniform_bind_group(device, &bind_group_layout, &sky_buffer, "sky");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MESH_SHADER.into()),
        });

        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                            2 => Float32x3,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: compare_function(DepthCompare::Less),
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let sky_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sky_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SKY_SHADER.into()),
        });
        let mut sky_pipelines = BTreeMap::new();
        sky_pipelines.insert(
            DepthCompare::LessEqual,
            sky_pipeline(
                device,
                &pipeline_layout,
                &sky_shader,
                surface_format,
                DepthCompare::LessEqual,
            ),
        );

        let max_instances = INITIAL_INSTANCES;
        let instance_buffer = instance_buffer(device, max_instances);
        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            mesh_pipeline,
            pipeline_layout,
            sky_shader,
            sky_pipelines,
            frame_buffer,
            frame_bind_group,
            sky_buffer,
            sky_bind_group,
            instance_buffer,
            max_instances,
            meshes: BTreeMap::new(),
            depth_texture,
            surface_format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Upload every mesh in `store` that has no GPU buffers yet. Returns how
    /// many were uploaded.
    pub fn sync_meshes(&mut self, device: &wgpu::Device, store: &AssetStore) -> usize {
        let mut uploaded = 0;
        for (id, mesh) in store.iter() {
            if self.meshes.contains_key(&id) {
                continue;
            }
            let (verts, indices) = mesh_vertices(mesh);
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertex_buffer"),
                contents: bytemuck::cast_slice(&verts),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_index_buffer"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            self.meshes.insert(
                id,
                GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: indices.len() as u32,
                },
            );
            uploaded += 1;
        }
        if uploaded > 0 {
            tracing::debug!(uploaded, total = self.meshes.len(), "uploaded meshes");
        }
        uploaded
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Open a frame that draws into `target`.
    pub fn frame<'a>(
        &'a mut self,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        target: &'a wgpu::TextureView,
    ) -> GpuFrame<'a> {
        GpuFrame {
            renderer: self,
            device,
            queue,
            target,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            draws: Vec::new(),
            sky: None,
        }
    }

    fn ensure_sky_pipeline(&mut self, device: &wgpu::Device, depth: DepthCompare) {
        if self.sky_pipelines.contains_key(&depth) {
            return;
        }
        tracing::debug!(?depth, "building sky pipeline");
        let pipeline = sky_pipeline(
            device,
            &self.pipeline_layout,
            &self.sky_shader,
            self.surface_format,
            depth,
        );
        self.sky_pipelines.insert(depth, pipeline);
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, needed: u32) {
        if needed <= self.max_instances {
            return;
        }
        self.max_instances = needed.next_power_of_two();
        self.instance_buffer = instance_buffer(device, self.max_instances);
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

fn uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

fn instance_buffer(device: &wgpu::Device, capacity: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("instance_buffer"),
        size: (capacity as u64) * std::mem::size_of::<InstanceData>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn compare_function(depth: DepthCompare) -> wgpu::CompareFunction {
    match depth {
        DepthCompare::Less => wgpu::CompareFunction::Less,
        DepthCompare::LessEqual => wgpu::CompareFunction::LessEqual,
    }
}

fn sky_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
    depth: DepthCompare,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("sky_pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_sky"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_sky"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: compare_function(depth),
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

/// One frame in flight. Draws are collected and encoded by `end_frame`,
/// which returns the command buffer unsubmitted so overlays can be added.
pub struct GpuFrame<'a> {
    renderer: &'a mut WgpuRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    target: &'a wgpu::TextureView,
    clear_color: [f32; 4],
    draws: Vec<(MeshId, Mat4)>,
    sky: Option<DepthCompare>,
}

impl FrameRenderer for GpuFrame<'_> {
    type Output = wgpu::CommandBuffer;

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.clear_color = clear_color;
        self.draws.clear();
        self.sky = None;
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.queue.write_buffer(
            &self.renderer.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameData::from_uniforms(uniforms)),
        );
    }

    fn draw_mesh(&mut self, mesh: MeshId, world: Mat4) {
        self.draws.push((mesh, world));
    }

    fn draw_skybox(&mut self, inverse_view_direction_projection: Mat4, depth: DepthCompare) {
        self.queue.write_buffer(
            &self.renderer.sky_buffer,
            0,
            bytemuck::bytes_of(&SkyData {
                inverse_view_proj: inverse_view_direction_projection.to_cols_array_2d(),
            }),
        );
        self.sky = Some(depth);
    }

    fn end_frame(&mut self) -> wgpu::CommandBuffer {
        let draws: Vec<(MeshId, Mat4)> = std::mem::take(&mut self.draws)
            .into_iter()
            .filter(|(mesh, _)| {
                let known = self.renderer.meshes.contains_key(mesh);
                if !known {
                    tracing::trace!(?mesh, "skipping draw of unknown mesh");
                }
                known
            })
            .collect();
        let instances: Vec<InstanceData> =
            draws.iter().map(|(_, world)| InstanceData::new(*world)).collect();

        self.renderer
            .ensure_instance_capacity(self.device, instances.len() as u32);
        if let Some(depth) = self.sky {
            self.renderer.ensure_sky_pipeline(self.device, depth);
        }
        if !instances.is_empty() {
            self.queue.write_buffer(
                &self.renderer.instance_buffer,
                0,
                bytemuck::cast_slice(&instances),
            );
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene_encoder"),
            });
        {
            let [r, g, b, a] = self.clear_color.map(f64::from);
            let renderer = &*self.renderer;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &renderer.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if !draws.is_empty() {
                pass.set_pipeline(&renderer.mesh_pipeline);
                pass.set_bind_group(0, &renderer.frame_bind_group, &[]);
                pass.set_vertex_buffer(1, renderer.instance_buffer.slice(..));
                for (i, (mesh, _)) in draws.iter().enumerate() {
                    let Some(gpu) = renderer.meshes.get(mesh) else {
                        continue;
                    };
                    let i = i as u32;
                    pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                    pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..gpu.index_count, 0, i..i + 1);
                }
            }

            if let Some(pipeline) = self.sky.and_then(|d| renderer.sky_pipelines.get(&d)) {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &renderer.sky_bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }
        encoder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn frame_data_packs_ambient_into_light() {
        let u = FrameUniforms {
            light_direction: Vec3::Y,
            ambient: 0.25,
            view: Mat4::IDENTITY,
            projection: Mat4::from_scale(Vec3::splat(2.0)),
            eye_position: Vec3::new(1.0, 2.0, 3.0),
        };
        let d = FrameData::from_uniforms(&u);
        assert_eq!(d.light, [0.0, 1.0, 0.0, 0.25]);
        assert_eq!(d.eye, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(d.view_proj[0][0], 2.0);
    }

    #[test]
    fn gpu_layouts_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
        assert_eq!(std::mem::size_of::<InstanceData>(), 64);
        assert_eq!(std::mem::size_of::<FrameData>(), 96);
    }

    #[test]
    fn mesh_vertices_keep_color_and_indices() {
        let mesh = BoxMesh::new(Vec3::ONE, [0.5, 0.1, 0.9]);
        let (verts, indices) = mesh_vertices(&mesh);
        assert_eq!(verts.len(), 24);
        assert_eq!(indices.len(), 36);
        assert!(verts.iter().all(|v| v.color == [0.5, 0.1, 0.9]));
        assert!(indices.iter().all(|&i| (i as usize) < verts.len()));
    }

    #[test]
    fn depth_modes_map_to_compare_functions() {
        assert_eq!(
            compare_function(DepthCompare::Less),
            wgpu::CompareFunction::Less
        );
        assert_eq!(
            compare_function(DepthCompare::LessEqual),
            wgpu::CompareFunction::LessEqual
        );
    }

    #[test]
    fn instance_is_column_major() {
        let world = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        let inst = InstanceData::new(world);
        assert_eq!(inst.model[3], [4.0, 5.0, 6.0, 1.0]);
    }
}
