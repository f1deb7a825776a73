// --- File: renderer.rs ---
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use crate::camera::CameraState;
use crate::config::ViewportConfig;
use crate::constants::BACKGROUND_COLOR;
use crate::error::RenderInitError;
use crate::frame::FramePlan;
use crate::geometry::PackedGeometry;
use crate::hud::{HudImage, OverlayRenderer};
use crate::streaming::StreamingBuffers;

// One renderer per process; the view/stream state is not shareable.
static RENDERER_ALIVE: AtomicBool = AtomicBool::new(false);

/// Runs `build` inside a validation error scope so shader and pipeline
/// errors come back as a value instead of the default panic handler.
pub fn validated<T>(
    device: &wgpu::Device,
    label: &'static str,
    build: impl FnOnce() -> T,
) -> Result<T, RenderInitError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(error) => Err(RenderInitError::Pipeline {
            label,
            message: error.to_string(),
        }),
    }
}

/// Palette values are display values, so a linear format avoids the sRGB
/// encode on write. Falls back to whatever the surface offers first.
fn pick_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Result<wgpu::TextureFormat, RenderInitError> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
        .ok_or(RenderInitError::UnsupportedSurface)
}

// --- GPU Data Structures ---

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ViewUniforms {
    resolution: [f32; 2],
    pan: [f32; 2],
    zoom: f32,
    point_size: f32,
    grid_mode: f32,
    _padding: f32,
}

impl ViewUniforms {
    fn new(camera: &CameraState, size: PhysicalSize<u32>) -> Self {
        Self {
            resolution: [size.width as f32, size.height as f32],
            pan: camera.pan.into(),
            zoom: camera.zoom,
            point_size: camera.base_point_size,
            grid_mode: if camera.grid_snap { 1.0 } else { 0.0 },
            _padding: 0.0,
        }
    }
}

// Unit quad each cell is instanced onto, centered on the cell.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct QuadVertex {
    corner: [f32; 2],
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [-0.5, -0.5] },
    QuadVertex { corner: [0.5, -0.5] },
    QuadVertex { corner: [0.5, 0.5] },
    QuadVertex { corner: [-0.5, 0.5] },
];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

fn vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
    const CORNER: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
    const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
    const COLOR: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x4];
    [
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &CORNER,
        },
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &POSITION,
        },
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &COLOR,
        },
    ]
}

// --- Renderer ---
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    point_pipeline: wgpu::RenderPipeline,
    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    view_uniform_buffer: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,
    streams: StreamingBuffers,
    overlay: OverlayRenderer,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        viewport: &ViewportConfig,
    ) -> Result<Self, RenderInitError> {
        if RENDERER_ALIVE.swap(true, Ordering::AcqRel) {
            return Err(RenderInitError::AlreadyRunning);
        }
        match Self::create(window, viewport).await {
            Ok(renderer) => Ok(renderer),
            Err(e) => {
                RENDERER_ALIVE.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    async fn create(
        window: Arc<Window>,
        viewport: &ViewportConfig,
    ) -> Result<Self, RenderInitError> {
        let size = window.inner_size();
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderInitError::NoAdapter)?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = pick_surface_format(&surface_caps.formats)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: if viewport.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // --- Create Buffers ---
        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let view_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("View Uniform Buffer"),
            contents: bytemuck::bytes_of(&ViewUniforms::new(&CameraState::default(), size)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let view_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("View Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ViewUniforms>() as _,
                        ),
                    },
                    count: None,
                }],
            });
        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("View Bind Group"),
            layout: &view_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_uniform_buffer.as_entire_binding(),
            }],
        });

        // --- Render Pipeline ---
        let point_pipeline = validated(&device, "point pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Point Shader Module"),
                source: wgpu::ShaderSource::Wgsl(include_str!("points.wgsl").into()),
            });
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Point Render Pipeline Layout"),
                bind_group_layouts: &[&view_bind_group_layout],
                push_constant_ranges: &[],
            });
            let buffers = vertex_layouts();
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Point Render Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let streams = StreamingBuffers::new(&device);
        let overlay = OverlayRenderer::new(&device, config.format)?;

        log::info!(
            "Renderer ready: {}x{} {:?} {:?}",
            size.width,
            size.height,
            config.format,
            config.present_mode
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            point_pipeline,
            quad_vertex_buffer,
            quad_index_buffer,
            view_uniform_buffer,
            view_bind_group,
            streams,
            overlay,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let new_size = PhysicalSize::new(new_size.width.max(1), new_size.height.max(1));
        if new_size != self.size {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            log::debug!("Renderer resized to {}x{}", new_size.width, new_size.height);
        }
    }

    /// Reconfigures the surface at its current size (after `Lost`/`Outdated`).
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Uploads, draws and presents one frame according to `plan`.
    pub fn render_frame(
        &mut self,
        geometry: &PackedGeometry,
        plan: &FramePlan,
        camera: &CameraState,
        hud: Option<&HudImage>,
    ) -> Result<(), wgpu::SurfaceError> {
        let output_texture = self.surface.get_current_texture()?;
        let view = output_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if plan.upload {
            self.streams.upload(&self.device, &self.queue, geometry);
        }
        self.queue.write_buffer(
            &self.view_uniform_buffer,
            0,
            bytemuck::bytes_of(&ViewUniforms::new(camera, self.size)),
        );
        let hud = hud.filter(|_| plan.overlay);
        if let Some(image) = hud {
            let resolution = [self.size.width as f32, self.size.height as f32];
            self.overlay.prepare(&self.device, &self.queue, image, resolution);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let instances = self.streams.point_count();
            if plan.draw && instances > 0 {
                let (positions, colors) = self.streams.slices();
                render_pass.set_pipeline(&self.point_pipeline);
                render_pass.set_bind_group(0, &self.view_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, positions);
                render_pass.set_vertex_buffer(2, colors);
                render_pass.set_index_buffer(
                    self.quad_index_buffer.slice(..),
                    wgpu::IndexFormat::Uint16,
                );
                render_pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..instances);
            }

            if hud.is_some() {
                self.overlay.draw(&mut render_pass);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output_texture.present();

        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        log::info!("Releasing GPU resources");
        RENDERER_ALIVE.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn view_uniforms_match_shader_layout() {
        assert_eq!(std::mem::size_of::<ViewUniforms>(), 32);
    }

    #[test]
    fn view_uniforms_carry_camera_state() {
        let camera = CameraState {
            zoom: 3.0,
            pan: Vec2::new(5.0, -2.0),
            grid_snap: false,
            base_point_size: 6.0,
        };
        let u = ViewUniforms::new(&camera, PhysicalSize::new(800, 600));
        assert_eq!(u.resolution, [800.0, 600.0]);
        assert_eq!(u.pan, [5.0, -2.0]);
        assert_eq!(u.zoom, 3.0);
        assert_eq!(u.point_size, 6.0);
        assert_eq!(u.grid_mode, 0.0);
    }

    #[test]
    fn linear_surface_format_is_preferred() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(
            pick_surface_format(&formats).unwrap(),
            wgpu::TextureFormat::Bgra8Unorm
        );
        assert_eq!(
            pick_surface_format(&formats[..1]).unwrap(),
            wgpu::TextureFormat::Bgra8UnormSrgb
        );
    }

    #[test]
    fn surface_without_formats_is_unsupported() {
        let err = pick_surface_format(&[]).unwrap_err();
        assert!(matches!(err, RenderInitError::UnsupportedSurface));
        assert!(err.to_string().contains("texture format"));
    }

    #[test]
    fn quad_is_centered_on_the_cell() {
        let sum = QUAD_VERTICES
            .iter()
            .fold([0.0f32; 2], |acc, v| [acc[0] + v.corner[0], acc[1] + v.corner[1]]);
        assert_eq!(sum, [0.0, 0.0]);
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));
    }
}
// --- End of File: renderer.rs ---
