//! wgpu renderer for a [`FrameView`].
//!
//! Everything is simulated on the CPU, so the GPU side only uploads the
//! frame's nodes, label markers and connection lines and draws them:
//! nodes and markers as camera-facing glow billboards, connections and the
//! boundary sphere as a line list.

mod camera;
pub mod connections;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::window::Window;

pub use camera::RenderCamera;
use connections::LineRenderer;

use crate::error::GpuError;
use crate::session::FrameView;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Glow blending: colors add up where nodes and lines overlap.
pub(crate) const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

const NODE_COLOR: [f32; 4] = [0.1, 1.0, 0.85, 1.0];
const NODE_SIZE: f32 = 4.0;
const SELECTED_COLOR: [f32; 4] = [1.0, 0.95, 0.3, 1.0];
const SELECTED_SIZE: f32 = 8.0;
const LABEL_COLOR: [f32; 4] = [1.0, 0.25, 0.8, 0.9];
const LABEL_SIZE: f32 = 2.0;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    camera_right: [f32; 4],
    camera_up: [f32; 4],
}

/// One billboard.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BillboardInstance {
    pub center: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
}

/// Billboards for every node.
pub fn node_instances(view: &FrameView<'_>) -> Vec<BillboardInstance> {
    view.nodes
        .iter()
        .map(|n| {
            let selected = view.selected == Some(n.id);
            BillboardInstance {
                center: n.position.to_array(),
                size: if selected { SELECTED_SIZE } else { NODE_SIZE },
                color: if selected { SELECTED_COLOR } else { NODE_COLOR },
            }
        })
        .collect()
}

/// Markers at the anchors of visible labels.
pub fn label_instances(view: &FrameView<'_>) -> Vec<BillboardInstance> {
    view.labels
        .visible()
        .map(|l| BillboardInstance {
            center: l.anchor.to_array(),
            size: LABEL_SIZE,
            color: LABEL_COLOR,
        })
        .collect()
}

/// Vertex buffer that grows to fit whatever is uploaded.
pub(crate) struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    count: u32,
    label: &'static str,
}

impl DynamicBuffer {
    pub(crate) fn new(device: &wgpu::Device, label: &'static str, capacity: u64) -> Self {
        Self {
            buffer: create_vertex_buffer(device, label, capacity),
            capacity,
            count: 0,
            label,
        }
    }

    /// Replace the contents with `items`, reallocating when they do not fit.
    pub(crate) fn upload<T: Pod>(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, items: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(items);
        let needed = bytes.len() as u64;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            self.buffer = create_vertex_buffer(device, self.label, self.capacity);
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
        self.count = items.len() as u32;
    }

    #[inline]
    pub(crate) fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }
}

fn create_vertex_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Window surface, device and the swarm's pipelines.
pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    billboard_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_texture: wgpu::TextureView,
    nodes: DynamicBuffer,
    labels: DynamicBuffer,
    lines: LineRenderer,
    pub camera: RenderCamera,
}

impl GpuState {
    pub async fn new(window: Arc<Window>, camera: RenderCamera, sphere_radius: f32) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using GPU adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        let uniforms = Uniforms {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            camera_right: [1.0, 0.0, 0.0, 0.0],
            camera_up: [0.0, 1.0, 0.0, 0.0],
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let billboard_pipeline = create_billboard_pipeline(&device, &uniform_bind_group_layout, config.format);
        let lines = LineRenderer::new(&device, &uniform_bind_group_layout, config.format, sphere_radius);
        let nodes = DynamicBuffer::new(&device, "Node Instance Buffer", 16 * 1024);
        let labels = DynamicBuffer::new(&device, "Label Instance Buffer", 4 * 1024);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            billboard_pipeline,
            uniform_buffer,
            uniform_bind_group,
            depth_texture,
            nodes,
            labels,
            lines,
            camera,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    /// Reconfigure the surface at its current size, after it was lost.
    pub fn reconfigure(&mut self) {
        let size = winit::dpi::PhysicalSize::new(self.config.width, self.config.height);
        self.resize(size);
    }

    fn update_uniforms(&mut self, view: &FrameView<'_>) {
        let aspect = self.config.width as f32 / self.config.height as f32;
        let view_proj = self.camera.view_proj(&view.pose, aspect);
        let (right, up) = RenderCamera::billboard_axes(&view.pose);

        let uniforms = Uniforms {
            view_proj: view_proj.to_cols_array_2d(),
            camera_right: right.extend(0.0).to_array(),
            camera_up: up.extend(0.0).to_array(),
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Upload and draw one frame.
    pub fn render(&mut self, view: &FrameView<'_>) -> Result<(), wgpu::SurfaceError> {
        self.update_uniforms(view);
        self.nodes.upload(&self.device, &self.queue, &node_instances(view));
        self.labels.upload(&self.device, &self.queue, &label_instances(view));
        self.lines.upload(&self.device, &self.queue, view.connections, view.nodes);

        let output = self.surface.get_current_texture()?;
        let target = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.02,
                            a: 1.0,
                        }),
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
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.lines.draw(&mut render_pass, &self.uniform_bind_group);

            render_pass.set_pipeline(&self.billboard_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            for buffer in [&self.nodes, &self.labels] {
                if buffer.count() > 0 {
                    render_pass.set_vertex_buffer(0, buffer.slice());
                    render_pass.draw(0..6, 0..buffer.count());
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_billboard_pipeline(
    device: &wgpu::Device,
    uniform_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Billboard Shader"),
        source: wgpu::ShaderSource::Wgsl(BILLBOARD_SHADER.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Billboard Pipeline Layout"),
        bind_group_layouts: &[uniform_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Billboard Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<BillboardInstance>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(ADDITIVE_BLEND),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_depth_texture(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

pub const BILLBOARD_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) center: vec3<f32>,
    @location(1) size: f32,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vertex_index];
    let world = center
        + uniforms.camera_right.xyz * (corner.x * size)
        + uniforms.camera_up.xyz * (corner.y * size);

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(world, 1.0);
    out.uv = corner;
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let d = length(in.uv);
    if d > 1.0 {
        discard;
    }
    let core = 1.0 - smoothstep(0.0, 0.35, d);
    let glow = (1.0 - d) * (1.0 - d);
    return vec4<f32>(in.color.rgb * (core + glow), in.color.a * max(core, glow));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraPose;
    use crate::config::{ConnectionConfig, LabelConfig};
    use crate::connections::ConnectionGraph;
    use crate::labels::LabelField;
    use crate::nodes::Node;
    use crate::session::FrameMode;
    use crate::spawn::SwarmRng;
    use crate::Vec3;

    #[test]
    fn test_instances_follow_view() {
        let nodes = vec![
            Node { id: 0, position: Vec3::new(0.0, 50.0, 300.0), velocity: Vec3::ZERO },
            Node { id: 1, position: Vec3::new(0.0, 0.0, -900.0), velocity: Vec3::ZERO },
        ];
        let mut labels = LabelField::new(&nodes, &LabelConfig::default(), SwarmRng::seeded(61));
        let pose = CameraPose::default();
        labels.tick(&nodes, pose.position);
        let graph = ConnectionGraph::new(&ConnectionConfig::default());

        let view = FrameView {
            nodes: &nodes,
            connections: &graph,
            labels: &labels,
            pose,
            mode: FrameMode::FirstPerson,
            sphere_radius: 1500.0,
            selected: Some(1),
        };

        let nodes = node_instances(&view);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].center, [0.0, 0.0, -900.0]);
        assert_eq!(nodes[0].color, NODE_COLOR);
        assert_eq!(nodes[1].color, SELECTED_COLOR);

        let markers = label_instances(&view);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].center, [10.0, 60.0, 300.0]);
    }

    #[test]
    fn test_instance_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<BillboardInstance>(), 32);
        assert_eq!(std::mem::size_of::<Uniforms>(), 96);
    }
}
