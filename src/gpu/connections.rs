//! Line rendering for connections and the boundary sphere.
//!
//! Connections change every frame and are re-uploaded as a plain line list.
//! The boundary wireframe is built once from the sphere radius.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::f32::consts::{PI, TAU};
use wgpu::util::DeviceExt;

use super::{DynamicBuffer, ADDITIVE_BLEND, DEPTH_FORMAT};
use crate::connections::ConnectionGraph;
use crate::nodes::Node;

/// Connection with a running sticky timer.
const STICKY_COLOR: [f32; 4] = [0.0, 0.95, 1.0, 0.55];
/// Connection whose timer ran out.
const LINK_COLOR: [f32; 4] = [0.35, 0.45, 1.0, 0.25];
const BOUNDARY_COLOR: [f32; 4] = [0.4, 0.6, 1.0, 0.05];

const BOUNDARY_RINGS: u32 = 16;
const BOUNDARY_SEGMENTS: u32 = 32;

/// One end of a line segment.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl LineVertex {
    fn new(position: Vec3, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            color,
        }
    }
}

/// Vertex pairs for every live connection.
pub fn connection_vertices(graph: &ConnectionGraph, nodes: &[Node]) -> Vec<LineVertex> {
    let mut vertices = Vec::with_capacity(graph.len() * 2);
    for (a, b, sticky) in graph.segments(nodes) {
        let color = if sticky { STICKY_COLOR } else { LINK_COLOR };
        vertices.push(LineVertex::new(a, color));
        vertices.push(LineVertex::new(b, color));
    }
    vertices
}

/// Latitude rings and meridians of a sphere, as line-list segments.
pub fn sphere_wireframe(radius: f32, rings: u32, segments: u32) -> Vec<Vec3> {
    let point = |lat: f32, lon: f32| {
        Vec3::new(
            radius * lat.sin() * lon.cos(),
            radius * lat.cos(),
            radius * lat.sin() * lon.sin(),
        )
    };

    let mut lines = Vec::new();
    for ring in 1..rings {
        let lat = PI * ring as f32 / rings as f32;
        for seg in 0..segments {
            let lon0 = TAU * seg as f32 / segments as f32;
            let lon1 = TAU * (seg + 1) as f32 / segments as f32;
            lines.push(point(lat, lon0));
            lines.push(point(lat, lon1));
        }
    }
    for seg in 0..segments {
        let lon = TAU * seg as f32 / segments as f32;
        for ring in 0..rings {
            let lat0 = PI * ring as f32 / rings as f32;
            let lat1 = PI * (ring + 1) as f32 / rings as f32;
            lines.push(point(lat0, lon));
            lines.push(point(lat1, lon));
        }
    }
    lines
}

/// GPU resources for all line drawing.
pub struct LineRenderer {
    pipeline: wgpu::RenderPipeline,
    boundary: wgpu::Buffer,
    boundary_count: u32,
    connections: DynamicBuffer,
}

impl LineRenderer {
    pub fn new(
        device: &wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        sphere_radius: f32,
    ) -> Self {
        let boundary_vertices: Vec<LineVertex> = sphere_wireframe(sphere_radius, BOUNDARY_RINGS, BOUNDARY_SEGMENTS)
            .into_iter()
            .map(|p| LineVertex::new(p, BOUNDARY_COLOR))
            .collect();

        let boundary = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Boundary Buffer"),
            contents: bytemuck::cast_slice(&boundary_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let connections = DynamicBuffer::new(device, "Connection Buffer", 4096);

        Self {
            pipeline: create_pipeline(device, uniform_layout, surface_format),
            boundary,
            boundary_count: boundary_vertices.len() as u32,
            connections,
        }
    }

    /// Upload this frame's connection segments.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, graph: &ConnectionGraph, nodes: &[Node]) {
        let vertices = connection_vertices(graph, nodes);
        self.connections.upload(device, queue, &vertices);
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, uniforms: &wgpu::BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, uniforms, &[]);

        pass.set_vertex_buffer(0, self.boundary.slice(..));
        pass.draw(0..self.boundary_count, 0..1);

        if self.connections.count() > 0 {
            pass.set_vertex_buffer(0, self.connections.slice());
            pass.draw(0..self.connections.count(), 0..1);
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    uniform_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Line Shader"),
        source: wgpu::ShaderSource::Wgsl(LINE_SHADER.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Line Pipeline Layout"),
        bind_group_layouts: &[uniform_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Line Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4],
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
            topology: wgpu::PrimitiveTopology::LineList,
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

pub const LINE_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::spawn::SwarmRng;

    #[test]
    fn test_wireframe_lies_on_sphere() {
        let lines = sphere_wireframe(1500.0, 16, 32);
        assert_eq!(lines.len() % 2, 0);
        // 15 rings and 32 meridians of 32 and 16 segments
        assert_eq!(lines.len(), 2 * (15 * 32 + 32 * 16));
        for p in lines {
            assert!((p.length() - 1500.0).abs() < 0.5);
        }
    }

    #[test]
    fn test_connection_vertices_pair_up() {
        let mut rng = SwarmRng::seeded(51);
        let mut graph = ConnectionGraph::new(&ConnectionConfig::default());
        let mut nodes = vec![
            Node { id: 0, position: Vec3::ZERO, velocity: Vec3::ZERO },
            Node { id: 1, position: Vec3::new(0.0, 10.0, 0.0), velocity: Vec3::ZERO },
            Node { id: 2, position: Vec3::new(0.0, 0.0, 1000.0), velocity: Vec3::ZERO },
        ];
        graph.tick(&mut nodes, &mut rng);

        let vertices = connection_vertices(&graph, &nodes);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[1].position, [0.0, 10.0, 0.0]);
        assert_eq!(vertices[0].color, STICKY_COLOR);
    }
}
