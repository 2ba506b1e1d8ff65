//! wgpu renderer
//!
//! Owns the window surface, one pipeline for lit fills and one for outlines.
//! Geometry buffers are cached per shared geometry instance; live camera
//! textures are cached per feed and re-uploaded when a newer frame arrives.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::Renderer;
use crate::camera::PerspectiveCamera;
use crate::capture::VideoTexture;
use crate::config::ViewportConfig;
use crate::error::RenderError;
use crate::scene::{Color, DirectionalLight, Geometry, Material, Scene, Topology, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MSAA_SAMPLES: u32 = 4;

/// Per-draw uniform block, mirrors `DrawUniforms` in scene.wgsl
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct DrawUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    specular: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    camera_pos: [f32; 4],
}

struct GpuGeometry {
    /// Keeps the cache key's allocation alive
    _source: Arc<Geometry>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuVideoTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    last_frame: u64,
}

/// One prepared draw, built before the render pass opens
struct DrawCall {
    topology: Topology,
    geometry_key: usize,
    bind_group: wgpu::BindGroup,
}

/// GPU renderer presenting into a winit window
pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    sample_count: u32,
    clear_color: wgpu::Color,

    /// Logical size and device pixel ratio, as last set
    logical_size: (u32, u32),
    pixel_ratio: f64,

    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// 1x1 white texture bound when a material has no map
    default_texture_view: wgpu::TextureView,

    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,

    geometries: HashMap<usize, GpuGeometry>,
    video_textures: HashMap<usize, GpuVideoTexture>,
}

impl GpuRenderer {
    /// Create the wgpu context for a window
    pub async fn new(window: Arc<Window>, viewport: &ViewportConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to find suitable GPU adapter")?;

        log::info!("Using GPU: {}", adapter.get_info().name);
        log::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Viewport Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("Failed to create device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .context("Surface reports no supported formats")?;

        log::info!("Surface format: {:?}", surface_format);

        let sample_count = if viewport.antialias
            && adapter
                .get_texture_format_features(surface_format)
                .flags
                .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            1
        };

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

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
        });

        // Bind group layout: [0] draw uniforms, [1] map texture, [2] sampler
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            sample_count,
            Topology::Triangles,
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            surface_format,
            sample_count,
            Topology::Lines,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Map Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let default_texture = device.create_texture_with_data(
            &queue,
            &wgpu::TextureDescriptor {
                label: Some("Default White Texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        let default_texture_view = default_texture.create_view(&Default::default());

        let (depth_view, msaa_view) = create_attachments(&device, &config, sample_count);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
            clear_color: Color::from_hex(viewport.clear_color).to_wgpu(),
            logical_size: (size.width, size.height),
            pixel_ratio: window.scale_factor(),
            mesh_pipeline,
            line_pipeline,
            bind_group_layout,
            sampler,
            default_texture_view,
            depth_view,
            msaa_view,
            geometries: HashMap::new(),
            video_textures: HashMap::new(),
        })
    }

    /// Physical surface size derived from logical size and pixel ratio
    pub fn physical_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Configure the surface again at its current size, after it was lost
    pub fn recover_surface(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn reconfigure(&mut self) {
        let (width, height) = self.logical_size;
        let to_physical = |v: u32| ((v as f64 * self.pixel_ratio).round() as u32).max(1);
        let (physical_width, physical_height) = (to_physical(width), to_physical(height));

        if physical_width == self.config.width && physical_height == self.config.height {
            return;
        }

        self.config.width = physical_width;
        self.config.height = physical_height;
        self.surface.configure(&self.device, &self.config);
        let (depth_view, msaa_view) = create_attachments(&self.device, &self.config, self.sample_count);
        self.depth_view = depth_view;
        self.msaa_view = msaa_view;
        log::debug!("Surface configured: {}x{}", physical_width, physical_height);
    }

    fn ensure_geometry(&mut self, geometry: &Arc<Geometry>) -> usize {
        let key = Arc::as_ptr(geometry) as usize;
        if !self.geometries.contains_key(&key) {
            let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Geometry Vertex Buffer"),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Geometry Index Buffer"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            self.geometries.insert(
                key,
                GpuGeometry {
                    _source: geometry.clone(),
                    vertex_buffer,
                    index_buffer,
                    index_count: geometry.indices.len() as u32,
                },
            );
        }
        key
    }

    /// Poll the feed and upload its latest frame if it is new
    fn sync_video_texture(&mut self, map: &VideoTexture) {
        let Some(frame) = map.latest_frame() else { return };
        let key = map.feed_id();

        // (Re)create the texture when the frame size changes
        let needs_new_texture = match self.video_textures.get(&key) {
            None => true,
            Some(existing) => {
                let size = existing.texture.size();
                size.width != frame.width || size.height != frame.height
            }
        };

        if needs_new_texture {
            log::info!("Creating camera texture: {}x{}", frame.width, frame.height);
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Camera Texture"),
                size: wgpu::Extent3d {
                    width: frame.width,
                    height: frame.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.video_textures.insert(
                key,
                GpuVideoTexture {
                    texture,
                    view,
                    last_frame: 0,
                },
            );
        }

        let Some(gpu) = self.video_textures.get_mut(&key) else { return };
        if frame.frame_number <= gpu.last_frame {
            return;
        }
        gpu.last_frame = frame.frame_number;

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.width * 4),
                rows_per_image: Some(frame.height),
            },
            wgpu::Extent3d {
                width: frame.width,
                height: frame.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn draw_uniforms(
        &self,
        camera: &PerspectiveCamera,
        light: Option<&DirectionalLight>,
        material: &Material,
        world: Mat4,
        has_map: bool,
    ) -> DrawUniforms {
        let (color, specular) = match material {
            Material::Phong(phong) => (
                phong.color.to_linear().to_array(),
                {
                    let [r, g, b] = phong.specular.to_linear().to_array();
                    [r, g, b, phong.shininess]
                },
            ),
            Material::Line(line) => (line.color.to_linear().to_array(), [0.0; 4]),
        };
        let (light_dir, light_color, intensity) = match light {
            Some(light) => (
                light.direction().to_array(),
                light.color.to_linear().to_array(),
                light.intensity,
            ),
            None => ([0.0, 0.0, 1.0], [0.0; 3], 0.0),
        };
        let eye = camera.position().to_array();

        DrawUniforms {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            model: world.to_cols_array_2d(),
            normal_matrix: world.inverse().transpose().to_cols_array_2d(),
            color: [color[0], color[1], color[2], 1.0],
            specular,
            light_dir: [light_dir[0], light_dir[1], light_dir[2], intensity],
            light_color: [
                light_color[0],
                light_color[1],
                light_color[2],
                if has_map { 1.0 } else { 0.0 },
            ],
            camera_pos: [eye[0], eye[1], eye[2], 1.0],
        }
    }
}

impl Renderer for GpuRenderer {
    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio.max(f64::MIN_POSITIVE);
        self.reconfigure();
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.logical_size = (width, height);
        self.reconfigure();
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let items = scene.draw_items();
        let light = scene.lights().first();

        // Upload everything the pass will reference before opening it
        let mut calls = Vec::with_capacity(items.len());
        for item in &items {
            let geometry_key = self.ensure_geometry(item.geometry);
            let map = item.material.texture();
            if let Some(map) = map {
                self.sync_video_texture(map);
            }

            let map_view = map
                .and_then(|m| self.video_textures.get(&m.feed_id()))
                .map(|t| &t.view);
            let uniforms = self.draw_uniforms(camera, light, item.material, item.world, map_view.is_some());
            let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Draw Uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Draw Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(
                            map_view.unwrap_or(&self.default_texture_view),
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });

            calls.push(DrawCall {
                topology: item.geometry.topology,
                geometry_key,
                bind_group,
            });
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let (target, resolve_target) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for call in &calls {
                let Some(geometry) = self.geometries.get(&call.geometry_key) else { continue };
                let pipeline = match call.topology {
                    Topology::Triangles => &self.mesh_pipeline,
                    Topology::Lines => &self.line_pipeline,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &call.bind_group, &[]);
                render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..geometry.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    sample_count: u32,
    topology: Topology,
) -> wgpu::RenderPipeline {
    let (label, fragment_entry, primitive_topology, cull_mode) = match topology {
        Topology::Triangles => (
            "Mesh Pipeline",
            "fs_mesh",
            wgpu::PrimitiveTopology::TriangleList,
            Some(wgpu::Face::Back),
        ),
        Topology::Lines => ("Line Pipeline", "fs_line", wgpu::PrimitiveTopology::LineList, None),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::buffer_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: primitive_topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    })
}

/// Depth target plus the multisampled color target when MSAA is on
fn create_attachments(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> (wgpu::TextureView, Option<wgpu::TextureView>) {
    let size = wgpu::Extent3d {
        width: config.width,
        height: config.height,
        depth_or_array_layers: 1,
    };

    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size,
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let msaa_view = (sample_count > 1).then(|| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("MSAA Color Texture"),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: config.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&Default::default())
    });

    (depth_texture.create_view(&Default::default()), msaa_view)
}
