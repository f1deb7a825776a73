// --- File: hud.rs ---
//! Heads-up overlay: a translucent panel with two status lines.
//!
//! Composition is split into three steps so the first two stay testable
//! without a GPU: [`HudCompositor::compose`] builds the text,
//! [`HudCompositor::rasterize`] paints panel and glyphs into an RGBA image,
//! and [`OverlayRenderer`] blits that image over the finished point frame.

use std::fmt;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

use crate::camera::CameraState;
use crate::constants::{
    HUD_FONT_CANDIDATES, HUD_FONT_SIZE, HUD_LINE_BASELINES, HUD_PANEL_COLOR, HUD_PANEL_HEIGHT,
    HUD_PANEL_WIDTH, HUD_PANEL_X, HUD_PANEL_Y, HUD_TEXT_COLOR, HUD_TEXT_X,
};
use crate::ecosystem::TemporalCoordinates;
use crate::error::RenderInitError;
use crate::renderer::validated;
use crate::utils::group_thousands;

/// The overlay font could not be found or parsed.
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

pub fn load_font(path: &Path) -> Result<fontdue::Font, FontLoadError> {
    let bytes = std::fs::read(path).map_err(|e| FontLoadError(format!("{}: {e}", path.display())))?;
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|e| FontLoadError(format!("{}: {e}", path.display())))
}

/// Loads the configured font, or the first usable system candidate.
pub fn find_font(configured: Option<&Path>) -> Result<fontdue::Font, FontLoadError> {
    if let Some(path) = configured {
        return load_font(path);
    }
    let mut last_error = FontLoadError("no font candidates".to_string());
    for candidate in HUD_FONT_CANDIDATES {
        match load_font(Path::new(candidate)) {
            Ok(font) => {
                log::info!("HUD font: {candidate}");
                return Ok(font);
            }
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

// --- Composition ---

/// Text content of one overlay frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HudFrame {
    pub lines: [String; 2],
}

/// Straight-alpha RGBA image of the panel, positioned in physical pixels.
#[derive(Debug, Clone)]
pub struct HudImage {
    /// Bumped on every rasterization; equal revisions mean equal pixels.
    pub revision: u64,
    pub origin: [f32; 2],
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl HudImage {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }
}

pub struct HudCompositor {
    font: Option<fontdue::Font>,
    revision: u64,
}

impl HudCompositor {
    /// A missing font is not fatal: the panel still draws, text is omitted.
    pub fn new(font: Result<fontdue::Font, FontLoadError>) -> Self {
        let font = match font {
            Ok(font) => Some(font),
            Err(e) => {
                log::warn!("HUD text disabled: {e}");
                None
            }
        };
        Self { font, revision: 0 }
    }

    pub fn has_text(&self) -> bool {
        self.font.is_some()
    }

    pub fn compose(
        &self,
        time: TemporalCoordinates,
        name: &str,
        camera: &CameraState,
        fps: f64,
    ) -> HudFrame {
        let counters = format!(
            "Total Ticks {}  |  Day {}  |  Tick {}  |  FPS {:.1}",
            group_thousands(time.total_ticks),
            group_thousands(time.total_days),
            time.current_tick,
            fps
        );
        let view = format!(
            "{}  |  zoom {:.2}x  |  pan({:.0},{:.0})  |  grid {}",
            name,
            camera.zoom,
            camera.pan.x,
            camera.pan.y,
            if camera.grid_snap { "ON" } else { "OFF" }
        );
        HudFrame {
            lines: [counters, view],
        }
    }

    /// Paints the panel and, when a font is loaded, the text at `scale`
    /// physical pixels per logical pixel.
    pub fn rasterize(&mut self, frame: &HudFrame, scale: f32) -> HudImage {
        let scale = scale.max(0.1);
        let width = (HUD_PANEL_WIDTH * scale).ceil() as u32;
        let height = (HUD_PANEL_HEIGHT * scale).ceil() as u32;
        let mut pixels = HUD_PANEL_COLOR.repeat((width * height) as usize);

        if let Some(font) = &self.font {
            let size = HUD_FONT_SIZE * scale;
            let x = (HUD_TEXT_X - HUD_PANEL_X) * scale;
            for (line, baseline) in frame.lines.iter().zip(HUD_LINE_BASELINES) {
                let baseline = (baseline - HUD_PANEL_Y) * scale;
                draw_line(&mut pixels, width, height, font, line, x, baseline, size);
            }
        }

        self.revision += 1;
        HudImage {
            revision: self.revision,
            origin: [HUD_PANEL_X * scale, HUD_PANEL_Y * scale],
            width,
            height,
            pixels,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_line(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    font: &fontdue::Font,
    text: &str,
    x: f32,
    baseline: f32,
    size: f32,
) {
    let ascent = font
        .horizontal_line_metrics(size)
        .map_or(size * 0.8, |m| m.ascent);
    let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings {
        x,
        y: baseline - ascent,
        ..LayoutSettings::default()
    });
    layout.append(&[font], &TextStyle::new(text, size, 0));

    for glyph in layout.glyphs() {
        if !glyph.char_data.rasterize() || glyph.width == 0 || glyph.height == 0 {
            continue;
        }
        let (metrics, coverage) = font.rasterize_config(glyph.key);
        let gx = glyph.x.round() as i64;
        let gy = glyph.y.round() as i64;
        for row in 0..metrics.height {
            let py = gy + row as i64;
            if py < 0 || py >= height as i64 {
                continue;
            }
            for col in 0..metrics.width {
                let px = gx + col as i64;
                let c = coverage[row * metrics.width + col];
                if c == 0 || px < 0 || px >= width as i64 {
                    continue;
                }
                let i = ((py as usize * width as usize) + px as usize) * 4;
                blend_over(&mut pixels[i..i + 4], HUD_TEXT_COLOR, c);
            }
        }
    }
}

/// Straight-alpha "over" of `color` scaled by glyph `coverage` onto `dst`.
fn blend_over(dst: &mut [u8], color: [u8; 4], coverage: u8) {
    let sa = (color[3] as f32 / 255.0) * (coverage as f32 / 255.0);
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }
    for i in 0..3 {
        let s = color[i] as f32 / 255.0;
        let d = dst[i] as f32 / 255.0;
        let c = (s * sa + d * da * (1.0 - sa)) / out_a;
        dst[i] = (c * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

// --- GPU Overlay ---

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct OverlayUniforms {
    // x, y, width, height in physical pixels.
    rect: [f32; 4],
    resolution: [f32; 2],
    _padding: [f32; 2],
}

struct OverlayTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// What the overlay texture currently holds.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
struct UploadedImage {
    size: Option<(u32, u32)>,
    revision: Option<u64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct UploadSteps {
    recreate_texture: bool,
    write_pixels: bool,
}

impl UploadedImage {
    /// Steps needed to make the texture hold `image`, recorded as done.
    fn advance(&mut self, image: &HudImage) -> UploadSteps {
        let size = (image.width, image.height);
        let recreate_texture = self.size != Some(size);
        let write_pixels = recreate_texture || self.revision != Some(image.revision);
        self.size = Some(size);
        self.revision = Some(image.revision);
        UploadSteps {
            recreate_texture,
            write_pixels,
        }
    }
}

/// Blits a [`HudImage`] over the current frame with alpha blending.
pub struct OverlayRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    texture: Option<OverlayTexture>,
    uploaded: UploadedImage,
}

impl OverlayRenderer {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<Self, RenderInitError> {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("HUD Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
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

        let pipeline = validated(device, "HUD pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("HUD Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("overlay.wgsl").into()),
            });
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("HUD Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("HUD Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("HUD Sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("HUD Uniform Buffer"),
            size: std::mem::size_of::<OverlayUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            sampler,
            uniform_buffer,
            texture: None,
            uploaded: UploadedImage::default(),
        })
    }

    /// Uploads this frame's image. Pixels are written only when the image
    /// revision changed; the texture is recreated only when the panel size
    /// changes (scale factor changes).
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &HudImage,
        resolution: [f32; 2],
    ) {
        let mut steps = self.uploaded.advance(image);
        if steps.recreate_texture || self.texture.is_none() {
            self.texture = Some(self.create_texture(device, (image.width, image.height)));
            steps.write_pixels = true;
        }
        let Some(target) = &self.texture else {
            return;
        };

        if steps.write_pixels {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &target.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &image.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * image.width),
                    rows_per_image: Some(image.height),
                },
                wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let uniforms = OverlayUniforms {
            rect: [
                image.origin[0],
                image.origin[1],
                image.width as f32,
                image.height as f32,
            ],
            resolution,
            _padding: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(target) = &self.texture else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &target.bind_group, &[]);
        pass.draw(0..4, 0..1);
    }

    fn create_texture(
        &self,
        device: &wgpu::Device,
        (width, height): (u32, u32),
    ) -> OverlayTexture {
        log::debug!("HUD texture {width}x{height}");
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("HUD Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("HUD Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        OverlayTexture {
            texture,
            bind_group,
        }
    }
}

// --- End of File: hud.rs ---
