// --- File: app.rs ---
//! The render loop: one `RedrawRequested` is one pass of
//! `PollInput → Acquire → Pack → Upload → Draw → Overlay → Present`.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::{Window, WindowBuilder},
};

use crate::camera::{CameraController, CameraState};
use crate::collector::{Collection, SnapshotCollector};
use crate::config::{GeneGlConfig, ViewportConfig};
use crate::constants::{INPUT_QUEUE_CAPACITY, WINDOW_TITLE};
use crate::ecosystem::SnapshotFeed;
use crate::error::RenderInitError;
use crate::frame::{FramePlan, FrameStats, status_line};
use crate::geometry::{PackedGeometry, pack};
use crate::hud::{HudCompositor, HudFrame, HudImage, find_font};
use crate::input::{InputTranslator, InteractionEvent, InteractionQueue, Translated};
use crate::renderer::Renderer;
use crate::simulation::SimulationHandle;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// CPU half of a frame: everything up to the GPU upload.
#[derive(Debug)]
pub struct PreparedFrame {
    pub collection: Collection,
    pub plan: FramePlan,
    pub geometry: PackedGeometry,
}

/// Acquire and pack. Packing is skipped when there is no snapshot.
pub fn prepare_frame(collector: &mut SnapshotCollector, feed: &SnapshotFeed) -> PreparedFrame {
    let collection = collector.collect(feed);
    let plan = FramePlan::new(collection.snapshot.is_some(), collection.cells.len());
    let geometry = if plan.pack {
        pack(&collection.cells)
    } else {
        PackedGeometry::default()
    };
    PreparedFrame {
        collection,
        plan,
        geometry,
    }
}

/// Counts `frame` and returns the window title when an FPS window closed on
/// it. `shown` keeps the last packed point count across frames that skip Pack.
fn frame_status(
    stats: &mut FrameStats,
    shown: &mut usize,
    frame: &PreparedFrame,
    now: f64,
) -> Option<String> {
    if frame.plan.pack {
        *shown = frame.geometry.point_count();
    }
    stats.tick(now).map(|fps| status_line(*shown, fps))
}

pub struct RenderLoop {
    window: Arc<Window>,
    renderer: Renderer,
    camera: CameraController,
    interactions: InteractionQueue,
    translator: InputTranslator,
    collector: SnapshotCollector,
    stats: FrameStats,
    clock: Instant,
    feed: Arc<SnapshotFeed>,
    hud: HudCompositor,
    // Last rasterized overlay and the scale it was drawn at.
    hud_cache: Option<(HudFrame, f32, HudImage)>,
    point_count: usize,
}

impl RenderLoop {
    pub fn new(
        window: Arc<Window>,
        feed: Arc<SnapshotFeed>,
        viewport: &ViewportConfig,
    ) -> Result<Self, RenderInitError> {
        let renderer = pollster::block_on(Renderer::new(Arc::clone(&window), viewport))?;

        let mut camera = CameraState::fitted(viewport.pixel_scale, window.scale_factor() as f32);
        camera.grid_snap = viewport.grid_mode;
        camera.base_point_size = viewport.base_point_size;

        Ok(Self {
            window,
            renderer,
            camera: CameraController::new(camera),
            interactions: InteractionQueue::new(INPUT_QUEUE_CAPACITY),
            translator: InputTranslator::new(),
            collector: SnapshotCollector::new(),
            stats: FrameStats::new(0.0),
            clock: Instant::now(),
            feed,
            hud: HudCompositor::new(find_font(viewport.font_path.as_deref())),
            hud_cache: None,
            point_count: 0,
        })
    }

    /// Queues input and runs a frame on `RedrawRequested`.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> LoopControl {
        match event {
            WindowEvent::RedrawRequested => self.frame(),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.window.inner_size();
                self.interactions.push(InteractionEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
                LoopControl::Continue
            }
            _ => match self.translator.translate(event) {
                Translated::Interaction(interaction) => {
                    self.interactions.push(interaction);
                    LoopControl::Continue
                }
                Translated::Close => LoopControl::Exit,
                Translated::Ignored => LoopControl::Continue,
            },
        }
    }

    fn frame(&mut self) -> LoopControl {
        // --- PollInput ---
        for event in self.interactions.drain() {
            if let InteractionEvent::Resized { width, height } = event {
                self.renderer.resize(PhysicalSize::new(width, height));
            }
            self.camera.apply(&event);
        }

        // --- Acquire / Pack ---
        let prepared = prepare_frame(&mut self.collector, &self.feed);
        let now = self.clock.elapsed().as_secs_f64();
        if let Some(title) = frame_status(&mut self.stats, &mut self.point_count, &prepared, now) {
            self.window.set_title(&title);
            let dropped = self.collector.take_dropped();
            if dropped > 0 {
                log::debug!("{dropped} organism walks skipped during concurrent mutation");
            }
        }
        let PreparedFrame {
            collection,
            plan,
            geometry,
        } = prepared;

        // --- Overlay ---
        let camera = *self.camera.state();
        if let Some(snapshot) = collection.snapshot.as_ref().filter(|_| plan.overlay) {
            let frame = self
                .hud
                .compose(snapshot.time(), snapshot.name(), &camera, self.stats.fps());
            let scale = self.window.scale_factor() as f32;
            let stale = self
                .hud_cache
                .as_ref()
                .is_none_or(|(cached, cached_scale, _)| *cached != frame || *cached_scale != scale);
            if stale {
                let image = self.hud.rasterize(&frame, scale);
                self.hud_cache = Some((frame, scale, image));
            }
        }
        let hud = self
            .hud_cache
            .as_ref()
            .filter(|_| plan.overlay)
            .map(|(_, _, image)| image);

        // --- Upload / Draw / Present ---
        match self.renderer.render_frame(&geometry, &plan, &camera, hud) {
            Ok(()) => LoopControl::Continue,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.renderer.reconfigure();
                LoopControl::Continue
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory; closing");
                LoopControl::Exit
            }
            Err(e) => {
                log::warn!("Skipping frame: {e:?}");
                LoopControl::Continue
            }
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        log::info!("Render loop stopped after {} frames", self.stats.step());
    }
}

/// Opens the window and drives the render loop until it closes. The
/// simulation is stopped and joined once the loop has exited.
pub fn run(
    config: &GeneGlConfig,
    feed: Arc<SnapshotFeed>,
    simulation: SimulationHandle,
) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let scale = config.viewport.pixel_scale;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(
                config.simulation.width * scale,
                config.simulation.height * scale,
            ))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let mut render_loop = Some(RenderLoop::new(Arc::clone(&window), feed, &config.viewport)?);
    let mut simulation = Some(simulation);

    event_loop
        .run(move |event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);
            match event {
                Event::AboutToWait => window.request_redraw(),
                Event::WindowEvent { window_id, event } if window_id == window.id() => {
                    if let Some(render_loop) = render_loop.as_mut() {
                        if render_loop.handle_window_event(&event) == LoopControl::Exit {
                            elwt.exit();
                        }
                    }
                }
                Event::LoopExiting => {
                    // Renderer first, then the producer.
                    drop(render_loop.take());
                    if let Some(mut simulation) = simulation.take() {
                        simulation.stop();
                    }
                }
                _ => {}
            }
        })
        .context("event loop failed")?;
    Ok(())
}

// --- End of File: app.rs ---
