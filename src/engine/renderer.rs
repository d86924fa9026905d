// GPU side of the viewer: surface, depth buffer, tree pipeline and mesh buffers.
//
// Per frame: upload camera uniforms → tree pass (one indexed draw) → egui pass.
// The mesh buffers only change in upload_mesh(), called after a regeneration.

use std::sync::Arc;
use glam::Mat4;
use wgpu::util::DeviceExt;
use super::camera::ViewerCamera;
use super::error::{RenderError, RenderResult};
use super::mesh::{GpuVertex, RenderMesh};
use super::settings_panel::{MeshStats, SettingsPanel, TreeSettings};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Dark blue background.
const CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.0, g: 0.0, b: 0.1, a: 1.0 };

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    mvp:   [[f32; 4]; 4],
    model: [[f32; 4]; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            mvp:   Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

// ============================================================================
// MESH BUFFERS
// ============================================================================

/// Vertex + index buffers sized for the largest mesh uploaded so far.
struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
}

impl MeshBuffers {
    fn new(device: &wgpu::Device, mesh: &RenderMesh) -> Self {
        Self {
            vertex_buffer: create_mesh_buffer(device, "Tree Vertex Buffer", mesh.vertex_bytes(), wgpu::BufferUsages::VERTEX),
            index_buffer: create_mesh_buffer(device, "Tree Index Buffer", mesh.index_bytes(), wgpu::BufferUsages::INDEX),
            num_indices: mesh.index_count() as u32,
        }
    }
}

fn create_mesh_buffer(
    device: &wgpu::Device,
    label: &'static str,
    contents: &[u8],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    // wgpu rejects zero-sized vertex/index buffers; keep one word for empty meshes.
    if contents.is_empty() {
        return device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: wgpu::COPY_BUFFER_ALIGNMENT,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
    }
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: usage | wgpu::BufferUsages::COPY_DST,
    })
}

/// Buffers above the device's `max_buffer_size` fail validation, which panics
/// outside an error scope.
fn check_buffer_fits(label: &'static str, bytes: usize, limit: u64) -> RenderResult<()> {
    let bytes = bytes as u64;
    if bytes > limit {
        return Err(RenderError::MeshTooLarge { label, bytes, limit });
    }
    Ok(())
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
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

// ============================================================================
// RENDERER
// ============================================================================

pub struct TreeRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    mesh: MeshBuffers,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    pub panel: SettingsPanel,
}

impl TreeRenderer {
    pub async fn new(window: Arc<winit::window::Window>, initial_mesh: &RenderMesh) -> RenderResult<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            // Fifo is always supported and gives vsync.
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Tree Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("tree.wgsl").into()),
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(RenderError::Shader { label: "tree.wgsl", message: err.to_string() });
        }

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Tree Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Tree Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc()],
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
                // Leaves carry their own back side; rings are wound inward.
                cull_mode: None,
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
        let limit = device.limits().max_buffer_size;
        check_buffer_fits("Tree Vertex Buffer", initial_mesh.vertex_bytes().len(), limit)?;
        check_buffer_fits("Tree Index Buffer", initial_mesh.index_bytes().len(), limit)?;
        let mesh = MeshBuffers::new(&device, initial_mesh);
        let panel = SettingsPanel::new(&window, &device, config.format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            depth_view,
            mesh,
            uniform_buffer,
            uniform_bind_group,
            panel,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    /// Replace the GPU copy of the tree. Reuses the buffers when the new mesh fits.
    /// A mesh larger than the device's buffer limit is rejected and the old one stays.
    pub fn upload_mesh(&mut self, mesh: &RenderMesh) -> RenderResult<()> {
        let vertex_bytes = mesh.vertex_bytes();
        let index_bytes = mesh.index_bytes();

        let limit = self.device.limits().max_buffer_size;
        check_buffer_fits("Tree Vertex Buffer", vertex_bytes.len(), limit)?;
        check_buffer_fits("Tree Index Buffer", index_bytes.len(), limit)?;

        if vertex_bytes.len() as u64 > self.mesh.vertex_buffer.size() {
            self.mesh.vertex_buffer = create_mesh_buffer(&self.device, "Tree Vertex Buffer", vertex_bytes, wgpu::BufferUsages::VERTEX);
        } else if !vertex_bytes.is_empty() {
            self.queue.write_buffer(&self.mesh.vertex_buffer, 0, vertex_bytes);
        }

        if index_bytes.len() as u64 > self.mesh.index_buffer.size() {
            self.mesh.index_buffer = create_mesh_buffer(&self.device, "Tree Index Buffer", index_bytes, wgpu::BufferUsages::INDEX);
        } else if !index_bytes.is_empty() {
            self.queue.write_buffer(&self.mesh.index_buffer, 0, index_bytes);
        }

        self.mesh.num_indices = mesh.index_count() as u32;
        log::debug!(
            "Uploaded tree mesh: {} vertex bytes, {} index bytes",
            vertex_bytes.len(),
            index_bytes.len()
        );
        Ok(())
    }

    /// Draw the tree and the settings window.
    /// Returns true when the user asked for a regeneration this frame.
    pub fn render(
        &mut self,
        window: &winit::window::Window,
        camera: &mut ViewerCamera,
        settings: &mut TreeSettings,
        stats: &MeshStats,
    ) -> Result<bool, wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let aspect = self.size.width.max(1) as f32 / self.size.height.max(1) as f32;
        let uniforms = Uniforms {
            mvp:   camera.model_view_projection(aspect).to_cols_array_2d(),
            model: camera.model_matrix().to_cols_array_2d(),
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Tree Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if self.mesh.num_indices > 0 {
                render_pass.set_pipeline(&self.render_pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..self.mesh.num_indices, 0, 0..1);
            }
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };
        let recompute = self.panel.render(
            &self.device,
            &self.queue,
            &mut encoder,
            window,
            &view,
            &screen_descriptor,
            camera,
            settings,
            stats,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(recompute)
    }
}
