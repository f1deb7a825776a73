// --- File: camera.rs ---
use glam::Vec2;

use crate::constants::{
    DEFAULT_BASE_POINT_SIZE, KEY_PAN_STEP_PX, KEY_ZOOM_FACTOR, MAX_ZOOM, MIN_ZOOM,
    SCROLL_ZOOM_RATE,
};
use crate::input::{InteractionEvent, PanDirection};

/// View parameters read once per frame by the draw step and the HUD.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    /// Device pixels per world unit.
    pub zoom: f32,
    /// Screen-space offset in device pixels, applied after scaling.
    pub pan: Vec2,
    pub grid_snap: bool,
    pub base_point_size: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
            grid_snap: true,
            base_point_size: DEFAULT_BASE_POINT_SIZE,
        }
    }
}

impl CameraState {
    /// Zoom at which a world drawn at `pixel_scale` logical pixels per cell
    /// exactly fills a framebuffer with `pixel_ratio` device pixels per
    /// logical pixel.
    pub fn fitted(pixel_scale: u32, pixel_ratio: f32) -> Self {
        Self {
            zoom: clamp_zoom(pixel_scale as f32 * pixel_ratio),
            ..Self::default()
        }
    }

    /// World position actually drawn: cell center in grid mode, raw otherwise.
    pub fn snap(&self, world: Vec2) -> Vec2 {
        if self.grid_snap {
            world.floor() + Vec2::splat(0.5)
        } else {
            world
        }
    }

    /// On-screen point edge length in device pixels, never below one.
    pub fn point_size_px(&self) -> f32 {
        let size = if self.grid_snap {
            self.zoom
        } else {
            self.base_point_size * self.zoom
        };
        size.max(1.0)
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.snap(world) * self.zoom + self.pan
    }

    /// Top-left origin world into bottom-left origin clip space.
    pub fn world_to_clip(&self, world: Vec2, resolution: Vec2) -> Vec2 {
        let clip = self.world_to_screen(world) / resolution * 2.0 - Vec2::ONE;
        Vec2::new(clip.x, -clip.y)
    }
}

fn clamp_zoom(zoom: f32) -> f32 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

// --- Controller ---

/// Zoom/pan state machine fed with discrete interaction events.
#[derive(Debug, Clone, Default)]
pub struct CameraController {
    state: CameraState,
    panning: bool,
    last_cursor: Option<Vec2>,
}

impl CameraController {
    pub fn new(state: CameraState) -> Self {
        Self {
            state,
            panning: false,
            last_cursor: None,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    /// Applies one event. Returns `true` if the view changed.
    pub fn apply(&mut self, event: &InteractionEvent) -> bool {
        let before = self.state;
        match *event {
            InteractionEvent::Scroll(delta) => self.scroll(delta),
            InteractionEvent::KeyZoomIn => self.zoom_by(KEY_ZOOM_FACTOR),
            InteractionEvent::KeyZoomOut => self.zoom_by(1.0 / KEY_ZOOM_FACTOR),
            InteractionEvent::PanBegin(cursor) => {
                self.panning = true;
                self.last_cursor = Some(cursor);
            }
            InteractionEvent::PanEnd => {
                self.panning = false;
                self.last_cursor = None;
            }
            InteractionEvent::CursorMoved(cursor) => {
                if let Some(last) = self.last_cursor.filter(|_| self.panning) {
                    self.drag_by(cursor - last);
                    self.last_cursor = Some(cursor);
                }
            }
            InteractionEvent::DragMove(delta) => self.drag_by(delta),
            InteractionEvent::KeyPan(direction) => self.key_pan(direction),
            InteractionEvent::ResetView => self.reset_view(),
            InteractionEvent::ToggleGrid => self.state.grid_snap = !self.state.grid_snap,
            // Viewport changes leave the camera alone.
            InteractionEvent::Resized { .. } => {}
        }
        self.state != before
    }

    pub fn scroll(&mut self, delta: f32) {
        self.zoom_by((delta * SCROLL_ZOOM_RATE).exp());
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.state.zoom = clamp_zoom(self.state.zoom * factor);
    }

    /// Pan is post-projection, so drags move one pixel per pixel at any zoom.
    pub fn drag_by(&mut self, delta: Vec2) {
        if self.panning {
            self.state.pan += delta;
        }
    }

    pub fn key_pan(&mut self, direction: PanDirection) {
        match direction {
            PanDirection::Up => self.state.pan.y += KEY_PAN_STEP_PX,
            PanDirection::Down => self.state.pan.y -= KEY_PAN_STEP_PX,
            PanDirection::Left => self.state.pan.x += KEY_PAN_STEP_PX,
            PanDirection::Right => self.state.pan.x -= KEY_PAN_STEP_PX,
        }
    }

    /// Back to 1:1 at the origin. The startup fit is deliberately not reapplied.
    pub fn reset_view(&mut self) {
        self.state.zoom = 1.0;
        self.state.pan = Vec2::ZERO;
    }
}

// --- End of File: camera.rs ---
