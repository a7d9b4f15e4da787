use std::collections::BTreeMap;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use voxelbox_common::OPENGL_TO_WGPU_MATRIX;
use voxelbox_render::{MeshHandle, RenderError, Renderer, ShaderHandle, validate_mesh};
use voxelbox_terrain::VertexLayout;
use wgpu::util::DeviceExt;

use crate::shaders;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const TEXTURED_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

const SKY: wgpu::Color = wgpu::Color {
    r: 0.53,
    g: 0.72,
    b: 0.92,
    a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    projection: [[f32; 4]; 4],
    model_view: [[f32; 4]; 4],
}

impl Uniforms {
    fn new(projection: &Mat4, model_view: &Mat4) -> Self {
        Self {
            projection: (OPENGL_TO_WGPU_MATRIX * *projection).to_cols_array_2d(),
            model_view: model_view.to_cols_array_2d(),
        }
    }
}

fn vertex_layout(layout: VertexLayout) -> wgpu::VertexBufferLayout<'static> {
    let attributes: &'static [wgpu::VertexAttribute] = match layout {
        VertexLayout::Position => &POSITION_ATTRIBUTES,
        VertexLayout::PositionUv => &TEXTURED_ATTRIBUTES,
    };
    wgpu::VertexBufferLayout {
        array_stride: (layout.floats_per_vertex() * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

fn vertex_entry_point(layout: VertexLayout) -> &'static str {
    match layout {
        VertexLayout::Position => "vs_position",
        VertexLayout::PositionUv => "vs_textured",
    }
}

/// GPU resources for one uploaded mesh.
struct GpuMesh {
    layout: VertexLayout,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// wgpu-based chunk renderer.
///
/// Owns the device and queue. Each mesh carries its own uniform buffer, so a
/// mesh drawn more than once in a frame is drawn with the last matrices given.
pub struct WgpuRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: BTreeMap<VertexLayout, wgpu::RenderPipeline>,
    programs: BTreeMap<ShaderHandle, VertexLayout>,
    meshes: BTreeMap<MeshHandle, GpuMesh>,
    queued: Vec<MeshHandle>,
    depth_texture: wgpu::TextureView,
    next_id: u64,
}

impl WgpuRenderer {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("chunk_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::CHUNK_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("chunk_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("chunk_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let depth_texture = Self::create_depth_texture(&device, width, height);

        Self {
            device,
            queue,
            surface_format,
            shader,
            bind_group_layout,
            pipeline_layout,
            pipelines: BTreeMap::new(),
            programs: BTreeMap::new(),
            meshes: BTreeMap::new(),
            queued: Vec::new(),
            depth_texture,
            next_id: 0,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(&self.device, width, height);
    }

    /// Encode and submit every draw queued since `begin_frame` into `target`.
    /// Returns the number of meshes drawn.
    pub fn render_frame(&mut self, target: &wgpu::TextureView) -> usize {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("chunk_encoder"),
            });

        let mut drawn = 0;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("chunk_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(SKY),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for handle in self.queued.drain(..) {
                // Released after being queued.
                let Some(mesh) = self.meshes.get(&handle) else {
                    continue;
                };
                let Some(pipeline) = self.pipelines.get(&mesh.layout) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &mesh.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                drawn += 1;
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        drawn
    }

    fn create_pipeline(&self, layout: VertexLayout) -> wgpu::RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("chunk_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some(vertex_entry_point(layout)),
                    compilation_options: Default::default(),
                    buffers: &[vertex_layout(layout)],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
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

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Renderer for WgpuRenderer {
    fn begin_frame(&mut self) {
        self.queued.clear();
    }

    fn compile_program(&mut self, layout: VertexLayout) -> Result<ShaderHandle, RenderError> {
        if let Some((&handle, _)) = self.programs.iter().find(|(_, l)| **l == layout) {
            return Ok(handle);
        }
        if !self.pipelines.contains_key(&layout) {
            let pipeline = self.create_pipeline(layout);
            self.pipelines.insert(layout, pipeline);
            tracing::debug!(?layout, "created chunk pipeline");
        }
        let handle = ShaderHandle(self.next_id());
        self.programs.insert(handle, layout);
        Ok(handle)
    }

    fn create_mesh(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
        layout: VertexLayout,
        shader: ShaderHandle,
    ) -> Result<MeshHandle, RenderError> {
        let program_layout = *self
            .programs
            .get(&shader)
            .ok_or(RenderError::UnknownProgram(shader))?;
        if program_layout != layout {
            return Err(RenderError::InvalidMesh(format!(
                "{layout:?} mesh used with a {program_layout:?} program"
            )));
        }
        validate_mesh(vertices, indices, layout)?;
        let index_count = u32::try_from(indices.len())
            .map_err(|_| RenderError::InvalidMesh(format!("{} indices", indices.len())))?;

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("chunk_vertex_buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("chunk_index_buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("chunk_uniform_buffer"),
                contents: bytemuck::bytes_of(&Uniforms::new(&Mat4::IDENTITY, &Mat4::IDENTITY)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("chunk_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let handle = MeshHandle(self.next_id());
        self.meshes.insert(
            handle,
            GpuMesh {
                layout,
                vertex_buffer,
                index_buffer,
                index_count,
                uniform_buffer,
                bind_group,
            },
        );
        Ok(handle)
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if let Some(mesh) = self.meshes.remove(&handle) {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
            mesh.uniform_buffer.destroy();
        }
    }

    fn draw(
        &mut self,
        handle: MeshHandle,
        projection: &Mat4,
        model_view: &Mat4,
    ) -> Result<(), RenderError> {
        let mesh = self
            .meshes
            .get(&handle)
            .ok_or(RenderError::UnknownMesh(handle))?;
        self.queue.write_buffer(
            &mesh.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms::new(projection, model_view)),
        );
        self.queued.push(handle);
        Ok(())
    }
}
