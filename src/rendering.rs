//! Rendering system: uploads a scene frame and draws it with additive blending.
//!
//! Three pipelines cover everything a scene can emit: point sprites (drawn
//! as instanced quads), line strips, and indexed triangle meshes.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

use crate::scenes::{ColorVertex, PointVertex, SceneFrame, SpriteKind};

/// Uniform buffer shared by all pipelines
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Uniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Camera basis for world-sized billboards (w unused)
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    /// Surface size in pixels
    pub viewport: [f32; 2],
    /// Pixel-size multiplier for screen-sized sprites
    pub point_scale: f32,
    pub time: f32,
}

impl Uniforms {
    pub fn new(view_proj: Mat4, view: Mat4, viewport: (u32, u32), point_scale: f32, time: f32) -> Self {
        // rows of the view rotation are the camera axes in world space
        let right = Vec3::new(view.x_axis.x, view.y_axis.x, view.z_axis.x);
        let up = Vec3::new(view.x_axis.y, view.y_axis.y, view.z_axis.y);
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_right: right.extend(0.0).to_array(),
            camera_up: up.extend(0.0).to_array(),
            viewport: [viewport.0.max(1) as f32, viewport.1.max(1) as f32],
            point_scale,
            time,
        }
    }
}

/// Background behind the additive geometry
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.067,
    g: 0.063,
    b: 0.114,
    a: 1.0,
};

/// Additive: src * src_alpha + dst
const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Flattened frame ready for upload
#[derive(Debug, Default)]
pub struct FrameBatches {
    pub points: Vec<PointVertex>,
    pub point_ranges: Vec<(SpriteKind, Range<u32>)>,
    pub lines: Vec<ColorVertex>,
    pub line_ranges: Vec<Range<u32>>,
    pub mesh_vertices: Vec<ColorVertex>,
    pub mesh_indices: Vec<u32>,
    /// (index range, base vertex) per mesh
    pub mesh_ranges: Vec<(Range<u32>, i32)>,
}

impl FrameBatches {
    pub fn flatten(&mut self, frame: &SceneFrame) {
        self.points.clear();
        self.point_ranges.clear();
        self.lines.clear();
        self.line_ranges.clear();
        self.mesh_vertices.clear();
        self.mesh_indices.clear();
        self.mesh_ranges.clear();

        for batch in &frame.points {
            let start = self.points.len() as u32;
            self.points.extend_from_slice(&batch.points);
            if !batch.points.is_empty() {
                self.point_ranges.push((batch.kind, start..self.points.len() as u32));
            }
        }
        for strip in &frame.strips {
            let start = self.lines.len() as u32;
            self.lines.extend_from_slice(&strip.vertices);
            if strip.vertices.len() >= 2 {
                self.line_ranges.push(start..self.lines.len() as u32);
            }
        }
        for mesh in &frame.meshes {
            let base = self.mesh_vertices.len() as i32;
            let start = self.mesh_indices.len() as u32;
            self.mesh_vertices.extend_from_slice(&mesh.vertices);
            self.mesh_indices.extend_from_slice(&mesh.indices);
            if !mesh.indices.is_empty() {
                self.mesh_ranges.push((start..self.mesh_indices.len() as u32, base));
            }
        }
    }
}

/// GPU buffer that grows to fit
struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    usage: wgpu::BufferUsages,
    label: &'static str,
}

impl DynamicBuffer {
    fn new(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages) -> Self {
        let capacity = 4096;
        Self {
            buffer: Self::allocate(device, label, usage, capacity),
            capacity,
            usage,
            label,
        }
    }

    fn allocate(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let needed = bytes.len() as u64;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            debug!("Growing {} to {} bytes", self.label, self.capacity);
            self.buffer = Self::allocate(device, self.label, self.usage, self.capacity);
        }
        queue.write_buffer(&self.buffer, 0, bytes);
    }
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    bokeh_pipeline: wgpu::RenderPipeline,
    soft_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    mesh_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    point_buffer: DynamicBuffer,
    line_buffer: DynamicBuffer,
    mesh_vertex_buffer: DynamicBuffer,
    mesh_index_buffer: DynamicBuffer,
    batches: FrameBatches,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(window: Arc<winit::window::Window>) -> Result<Self, String> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance
            .create_surface(window)
            .map_err(|e| format!("Failed to create surface: {}", e))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("Failed to find suitable GPU adapter")?;
        info!("GPU: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to request device: {}", e))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or("Surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let point_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/points.wgsl").into()),
        });
        let geometry_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Geometry Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/geometry.wgsl").into()),
        });

        let uniforms = Uniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, (config.width, config.height), 1.0, 0.0);
        let uniform_buffer = wgpu::util::DeviceExt::create_buffer_init(
            &device,
            &wgpu::util::BufferInitDescriptor {
                label: Some("Uniform Buffer"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let point_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![
                0 => Float32x3,
                1 => Float32,
                2 => Float32x4,
                3 => Float32x4
            ],
        };
        let color_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColorVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![
                0 => Float32x3,
                1 => Float32,
                2 => Float32x4
            ],
        };

        let pipeline = |label: &str,
                        module: &wgpu::ShaderModule,
                        vs: &str,
                        fs: &str,
                        buffer: wgpu::VertexBufferLayout,
                        topology: wgpu::PrimitiveTopology| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(vs),
                    buffers: &[buffer],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: config.format,
                        blend: Some(ADDITIVE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                // additive geometry is order independent; no depth buffer
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        use wgpu::PrimitiveTopology::{LineStrip, TriangleList};
        let bokeh_pipeline = pipeline("Bokeh Pipeline", &point_shader, "vs_bokeh", "fs_bokeh", point_layout.clone(), TriangleList);
        let soft_pipeline = pipeline("Soft Pipeline", &point_shader, "vs_soft", "fs_soft", point_layout, TriangleList);
        let line_pipeline = pipeline("Line Pipeline", &geometry_shader, "vs_main", "fs_line", color_layout.clone(), LineStrip);
        let mesh_pipeline = pipeline("Mesh Pipeline", &geometry_shader, "vs_main", "fs_mesh", color_layout, TriangleList);

        let point_buffer = DynamicBuffer::new(&device, "Point Buffer", wgpu::BufferUsages::VERTEX);
        let line_buffer = DynamicBuffer::new(&device, "Line Buffer", wgpu::BufferUsages::VERTEX);
        let mesh_vertex_buffer = DynamicBuffer::new(&device, "Mesh Vertex Buffer", wgpu::BufferUsages::VERTEX);
        let mesh_index_buffer = DynamicBuffer::new(&device, "Mesh Index Buffer", wgpu::BufferUsages::INDEX);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            bokeh_pipeline,
            soft_pipeline,
            line_pipeline,
            mesh_pipeline,
            uniform_buffer,
            uniform_bind_group,
            point_buffer,
            line_buffer,
            mesh_vertex_buffer,
            mesh_index_buffer,
            batches: FrameBatches::default(),
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Reconfigure after the surface was lost or outdated
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn update_uniforms(&self, uniforms: &Uniforms) {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }

    /// Upload and draw one scene frame
    pub fn render(&mut self, frame: &SceneFrame) -> Result<(), wgpu::SurfaceError> {
        self.batches.flatten(frame);
        let b = &self.batches;
        self.point_buffer
            .write(&self.device, &self.queue, bytemuck::cast_slice(&b.points));
        self.line_buffer
            .write(&self.device, &self.queue, bytemuck::cast_slice(&b.lines));
        self.mesh_vertex_buffer
            .write(&self.device, &self.queue, bytemuck::cast_slice(&b.mesh_vertices));
        self.mesh_index_buffer
            .write(&self.device, &self.queue, bytemuck::cast_slice(&b.mesh_indices));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            if !b.mesh_ranges.is_empty() {
                render_pass.set_pipeline(&self.mesh_pipeline);
                render_pass.set_vertex_buffer(0, self.mesh_vertex_buffer.buffer.slice(..));
                render_pass.set_index_buffer(
                    self.mesh_index_buffer.buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                for (indices, base) in &b.mesh_ranges {
                    render_pass.draw_indexed(indices.clone(), *base, 0..1);
                }
            }

            if !b.line_ranges.is_empty() {
                render_pass.set_pipeline(&self.line_pipeline);
                render_pass.set_vertex_buffer(0, self.line_buffer.buffer.slice(..));
                for range in &b.line_ranges {
                    render_pass.draw(range.clone(), 0..1);
                }
            }

            if !b.point_ranges.is_empty() {
                render_pass.set_vertex_buffer(0, self.point_buffer.buffer.slice(..));
                for (kind, range) in &b.point_ranges {
                    let pipeline = match kind {
                        SpriteKind::Bokeh => &self.bokeh_pipeline,
                        SpriteKind::Soft => &self.soft_pipeline,
                    };
                    render_pass.set_pipeline(pipeline);
                    // six corners per sprite, one instance per point
                    render_pass.draw(0..6, range.clone());
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::{LineStrip, Mesh, PointBatch};

    fn vertex(x: f32) -> ColorVertex {
        ColorVertex {
            position: [x, 0.0, 0.0],
            edge: 0.0,
            color: [1.0; 4],
        }
    }

    #[test]
    fn test_flatten_ranges() {
        let frame = SceneFrame {
            points: vec![
                PointBatch {
                    kind: SpriteKind::Bokeh,
                    points: vec![PointVertex::zeroed(); 3],
                },
                PointBatch {
                    kind: SpriteKind::Soft,
                    points: vec![],
                },
                PointBatch {
                    kind: SpriteKind::Soft,
                    points: vec![PointVertex::zeroed(); 2],
                },
            ],
            strips: vec![
                LineStrip {
                    vertices: vec![vertex(0.0), vertex(1.0)],
                },
                LineStrip {
                    vertices: vec![vertex(2.0)],
                },
                LineStrip {
                    vertices: vec![vertex(3.0), vertex(4.0), vertex(5.0)],
                },
            ],
            meshes: vec![
                Mesh {
                    vertices: vec![vertex(0.0); 3],
                    indices: vec![0, 1, 2],
                },
                Mesh {
                    vertices: vec![vertex(1.0); 4],
                    indices: vec![0, 1, 2, 2, 1, 3],
                },
            ],
        };

        let mut batches = FrameBatches::default();
        batches.flatten(&frame);
        assert_eq!(
            batches.point_ranges,
            vec![(SpriteKind::Bokeh, 0..3), (SpriteKind::Soft, 3..5)]
        );
        // single-vertex strips are skipped but their vertices still counted
        assert_eq!(batches.line_ranges, vec![0..2, 3..6]);
        assert_eq!(batches.mesh_ranges, vec![(0..3, 0), (3..9, 3)]);

        // flattening again starts from scratch
        batches.flatten(&SceneFrame::default());
        assert!(batches.points.is_empty() && batches.line_ranges.is_empty());
    }

    #[test]
    fn test_uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 112);
        assert_eq!(std::mem::size_of::<PointVertex>(), 48);
        assert_eq!(std::mem::size_of::<ColorVertex>(), 32);
    }

    #[test]
    fn test_camera_axes_from_view() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 8.0), Vec3::ZERO, Vec3::Y);
        let u = Uniforms::new(Mat4::IDENTITY, view, (1280, 720), 1.0, 0.0);
        assert!((Vec3::from_slice(&u.camera_right[..3]) - Vec3::X).length() < 1e-6);
        assert!((Vec3::from_slice(&u.camera_up[..3]) - Vec3::Y).length() < 1e-6);
    }
}
