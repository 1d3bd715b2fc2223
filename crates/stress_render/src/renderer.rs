//! Instanced cube renderer
//!
//! One pipeline, one indexed draw per frame. Per-instance model matrices
//! and colors live in two instance-rate vertex buffers; the camera, mesh
//! rotation, lights and material share one uniform block.

use crate::backend::{probe_capabilities, required_features, required_limits};
use crate::overlay::OverlayPainter;
use crate::timestamp::WgpuTimerQueries;
use crate::RenderError;
use glam::Mat4;
use std::sync::Arc;
use stress_core::scene::CubeGeometry;
use stress_core::{FrameView, RenderInfo, Renderer, Scene, SurfaceSize};
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

type GpuMatrix = [[f32; 4]; 4];

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: GpuMatrix,
    mesh: GpuMatrix,
    camera_pos: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    base_color: [f32; 4],
    material: [f32; 4],
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_rgb(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(srgb_to_linear)
}

fn extend(rgb: [f32; 3], w: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], w]
}

impl Uniforms {
    fn from_scene(scene: &Scene) -> Self {
        let light = &scene.directional;
        let ambient = &scene.ambient;
        let material = &scene.material;
        Self {
            view_proj: scene.camera.view_projection().to_cols_array_2d(),
            mesh: scene.mesh_matrix().to_cols_array_2d(),
            camera_pos: scene.camera.position.extend(1.0).to_array(),
            light_dir: light.direction.normalize_or_zero().extend(light.intensity).to_array(),
            light_color: extend(linear_rgb(light.color), 1.0),
            ambient: extend(linear_rgb(ambient.color), ambient.intensity),
            base_color: extend(linear_rgb(material.base_color), 1.0),
            material: [material.metalness, material.roughness, 0.0, 0.0],
        }
    }
}

/// Counters for a frame drawing `instances` cubes.
fn frame_info(instances: u32) -> RenderInfo {
    RenderInfo {
        draw_calls: u32::from(instances > 0),
        triangles: u64::from(instances) * u64::from(CubeGeometry::TRIANGLES),
        points: 0,
        lines: 0,
    }
}

/// Instances whose matrices fit in one buffer of at most `max_buffer_size` bytes.
fn drawable_instances(count: usize, max_buffer_size: u64) -> usize {
    let per_instance = std::mem::size_of::<GpuMatrix>() as u64;
    let fits = max_buffer_size / per_instance;
    usize::try_from((count as u64).min(fits)).unwrap_or(count)
}

fn select_present_mode(supported: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|mode| supported.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

fn create_depth_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
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

/// Geometry and instance data uploaded by `prepare`.
struct MeshBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    matrices: wgpu::Buffer,
    colors: wgpu::Buffer,
    instance_count: u32,
    clear: wgpu::Color,
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    overlay: OverlayPainter,
    mesh: Option<MeshBuffers>,
}

pub struct WgpuRenderer {
    gpu: Option<GpuState>,
    timer: Option<WgpuTimerQueries>,
    scratch: Vec<GpuMatrix>,
}

impl WgpuRenderer {
    /// Acquire a device and configure the window surface at `size`.
    pub async fn new(window: Arc<Window>, size: SurfaceSize, vsync: bool) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
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
            .ok_or(RenderError::NoAdapter)?;
        let capabilities = probe_capabilities(&adapter);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Stress Device"),
                    required_features: required_features(&capabilities),
                    required_limits: required_limits(&capabilities),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::IncompatibleSurface)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: select_present_mode(&surface_caps.present_modes, vsync),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::info!(
            ?format,
            present_mode = ?config.present_mode,
            width = config.width,
            height = config.height,
            "surface configured"
        );

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Instanced Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/instanced.wgsl").into()),
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniforms"),
            size: std::mem::size_of::<Uniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
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
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Instanced Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Instanced Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<GpuMatrix>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![6 => Float32x3],
                    },
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let depth_view = create_depth_view(&device, &config);
        let overlay = OverlayPainter::new(&device, config.format);
        let timer = capabilities
            .supports_timestamp_query
            .then(|| WgpuTimerQueries::new(device.clone(), queue.clone()));

        Ok(Self {
            gpu: Some(GpuState {
                surface,
                device,
                queue,
                config,
                pipeline,
                uniforms,
                bind_group,
                depth_view,
                overlay,
                mesh: None,
            }),
            timer,
            scratch: Vec::new(),
        })
    }
}

impl Renderer for WgpuRenderer {
    type Timer = WgpuTimerQueries;

    fn take_timer_queries(&mut self) -> Option<WgpuTimerQueries> {
        self.timer.take()
    }

    fn prepare(&mut self, scene: &Scene) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let device = &gpu.device;

        let vertices: Vec<GpuVertex> = scene
            .geometry
            .vertices()
            .into_iter()
            .map(|v| GpuVertex {
                position: v.position,
                normal: v.normal,
            })
            .collect();
        let indices = scene.geometry.indices();

        let requested = scene.instances.len();
        let count = drawable_instances(requested, device.limits().max_buffer_size);
        if count < requested {
            tracing::warn!(
                requested,
                drawn = count,
                "instance buffer exceeds the device buffer limit, drawing fewer instances"
            );
        }
        // Zero-sized vertex buffers are invalid; keep room for one instance.
        let capacity = count.max(1);
        let mut matrices: Vec<GpuMatrix> = scene.instances.transforms()[..count]
            .iter()
            .map(|t| t.matrix().to_cols_array_2d())
            .collect();
        matrices.resize(capacity, Mat4::IDENTITY.to_cols_array_2d());
        let mut colors: Vec<[f32; 3]> = scene.instances.colors()[..count]
            .iter()
            .copied()
            .map(linear_rgb)
            .collect();
        colors.resize(capacity, [1.0; 3]);

        let [r, g, b] = linear_rgb(scene.background);
        gpu.mesh = Some(MeshBuffers {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cube Vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cube Indices"),
                contents: bytemuck::cast_slice(&indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: indices.len() as u32,
            matrices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Matrices"),
                contents: bytemuck::cast_slice(&matrices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            }),
            colors: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Colors"),
                contents: bytemuck::cast_slice(&colors),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            instance_count: count as u32,
            clear: wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: 1.0,
            },
        });
        tracing::debug!(instances = count, "scene uploaded");
    }

    fn render(&mut self, frame: &FrameView<'_>, timer: Option<&mut WgpuTimerQueries>) -> RenderInfo {
        let Some(gpu) = self.gpu.as_mut() else {
            return RenderInfo::default();
        };
        let Some(mesh) = gpu.mesh.as_ref() else {
            return RenderInfo::default();
        };
        let scene = frame.scene;

        let uniforms = Uniforms::from_scene(scene);
        gpu.queue
            .write_buffer(&gpu.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let transforms = scene.instances.transforms();
        let end = frame.dirty.end.min(transforms.len()).min(mesh.instance_count as usize);
        let start = frame.dirty.start.min(end);
        if start < end {
            self.scratch.clear();
            self.scratch
                .extend(transforms[start..end].iter().map(|t| t.matrix().to_cols_array_2d()));
            let offset = (start * std::mem::size_of::<GpuMatrix>()) as wgpu::BufferAddress;
            gpu.queue
                .write_buffer(&mesh.matrices, offset, bytemuck::cast_slice(&self.scratch));
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost, reconfiguring");
                gpu.surface.configure(&gpu.device, &gpu.config);
                return RenderInfo::default();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("out of GPU memory acquiring frame");
                return RenderInfo::default();
            }
            Err(err) => {
                tracing::warn!(%err, "skipping frame");
                return RenderInfo::default();
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        let timestamp_writes = match timer {
            Some(timer) => timer.pass_timestamp_writes(),
            None => None,
        };
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Instanced Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(mesh.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes,
            });

            if mesh.instance_count > 0 {
                pass.set_pipeline(&gpu.pipeline);
                pass.set_bind_group(0, &gpu.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                pass.set_vertex_buffer(1, mesh.matrices.slice(..));
                pass.set_vertex_buffer(2, mesh.colors.slice(..));
                pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..mesh.index_count, 0, 0..mesh.instance_count);
            }
        }

        let mut commands = if frame.overlay.is_empty() {
            Vec::new()
        } else {
            let screen = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [gpu.config.width, gpu.config.height],
                pixels_per_point: frame.pixel_ratio as f32,
            };
            gpu.overlay.paint(
                &gpu.device,
                &gpu.queue,
                &mut encoder,
                &view,
                frame.overlay,
                &screen,
            )
        };
        commands.push(encoder.finish());
        gpu.queue.submit(commands);
        output.present();

        frame_info(mesh.instance_count)
    }

    fn resize(&mut self, size: SurfaceSize) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if size.is_empty() {
            return;
        }
        gpu.config.width = size.width;
        gpu.config.height = size.height;
        gpu.surface.configure(&gpu.device, &gpu.config);
        gpu.depth_view = create_depth_view(&gpu.device, &gpu.config);
    }

    fn release(&mut self) {
        if self.gpu.take().is_some() {
            tracing::debug!("renderer released");
        }
        self.timer = None;
        self.scratch = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stress_core::{SceneBuilder, StressParameters};

    #[test]
    fn uniform_block_layout() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 224);
        assert_eq!(std::mem::size_of::<GpuMatrix>(), 64);
    }

    #[test]
    fn srgb_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((srgb_to_linear(0.5) - 0.214).abs() < 1e-3);
    }

    #[test]
    fn counters_follow_instance_count() {
        assert_eq!(frame_info(0), RenderInfo::default());
        let info = frame_info(20_000);
        assert_eq!(info.draw_calls, 1);
        assert_eq!(info.triangles, 240_000);
        assert_eq!(info.points, 0);
        assert_eq!(info.lines, 0);
    }

    #[test]
    fn instance_upload_respects_buffer_limit() {
        let default_limit = wgpu::Limits::default().max_buffer_size;
        assert_eq!(default_limit / 64, 4_194_304);
        assert_eq!(drawable_instances(5_000_000, default_limit), 4_194_304);
        assert_eq!(drawable_instances(20_000, default_limit), 20_000);
        assert_eq!(drawable_instances(0, default_limit), 0);
        assert_eq!(drawable_instances(10, 0), 0);
    }

    #[test]
    fn vsync_always_uses_fifo() {
        let all = [wgpu::PresentMode::Immediate, wgpu::PresentMode::Fifo];
        assert_eq!(select_present_mode(&all, true), wgpu::PresentMode::Fifo);
        assert_eq!(select_present_mode(&all, false), wgpu::PresentMode::Immediate);
        assert_eq!(
            select_present_mode(&[wgpu::PresentMode::Fifo], false),
            wgpu::PresentMode::Fifo
        );
    }

    #[test]
    fn uniforms_carry_light_and_material() {
        let scene = SceneBuilder::new(StressParameters {
            count: 4,
            size: 1.0,
            speed: 1.0,
        })
        .aspect(1.5)
        .build();
        let uniforms = Uniforms::from_scene(&scene);

        assert_eq!(uniforms.light_dir[3], scene.directional.intensity);
        assert_eq!(uniforms.ambient[3], scene.ambient.intensity);
        assert_eq!(
            uniforms.material[..2],
            [scene.material.metalness, scene.material.roughness]
        );
        let dir = glam::Vec3::from_slice(&uniforms.light_dir[..3]);
        assert!((dir.length() - 1.0).abs() < 1e-5);
        assert_eq!(uniforms.camera_pos[..3], scene.camera.position.to_array());
    }
}
