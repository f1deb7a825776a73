// --- File: input.rs ---
//! Window events become discrete interaction events queued for the next frame.
//!
//! Callbacks never touch the camera or the GPU directly. They only push onto
//! [`InteractionQueue`], which the render loop drains at the start of a frame.

use std::collections::VecDeque;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::constants::PIXELS_PER_SCROLL_LINE;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InteractionEvent {
    /// Wheel delta in lines, positive zooms in.
    Scroll(f32),
    KeyZoomIn,
    KeyZoomOut,
    /// Drag-pan button pressed at this cursor position.
    PanBegin(Vec2),
    PanEnd,
    CursorMoved(Vec2),
    /// Relative drag in screen pixels.
    DragMove(Vec2),
    KeyPan(PanDirection),
    ResetView,
    ToggleGrid,
    Resized { width: u32, height: u32 },
}

/// Bounded FIFO between event delivery and frame processing.
///
/// Consecutive cursor moves collapse into the latest position. When full,
/// the oldest continuous event (cursor, scroll, drag, key pan/zoom) is
/// discarded; pan begin/end, resize, reset and grid toggles are always kept.
#[derive(Debug)]
pub struct InteractionQueue {
    events: VecDeque<InteractionEvent>,
    capacity: usize,
    overflowed: usize,
}

impl InteractionEvent {
    /// Events whose loss only degrades motion, never the camera's mode.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            InteractionEvent::Scroll(_)
                | InteractionEvent::CursorMoved(_)
                | InteractionEvent::DragMove(_)
                | InteractionEvent::KeyPan(_)
                | InteractionEvent::KeyZoomIn
                | InteractionEvent::KeyZoomOut
        )
    }
}

/// Folds `next` into `last` when the pair can be replaced by one event.
/// Scroll and drag deltas are only summed under pressure, since zoom clamps
/// per step.
fn coalesce(
    last: InteractionEvent,
    next: InteractionEvent,
    full: bool,
) -> Option<InteractionEvent> {
    match (last, next) {
        (InteractionEvent::CursorMoved(_), InteractionEvent::CursorMoved(_)) => Some(next),
        (InteractionEvent::Scroll(a), InteractionEvent::Scroll(b)) if full => {
            Some(InteractionEvent::Scroll(a + b))
        }
        (InteractionEvent::DragMove(a), InteractionEvent::DragMove(b)) if full => {
            Some(InteractionEvent::DragMove(a + b))
        }
        _ => None,
    }
}

impl InteractionQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            overflowed: 0,
        }
    }

    pub fn push(&mut self, event: InteractionEvent) {
        let full = self.events.len() >= self.capacity;
        if let Some(last) = self.events.back_mut() {
            if let Some(merged) = coalesce(*last, event, full) {
                *last = merged;
                return;
            }
        }
        if full {
            match self.events.iter().position(InteractionEvent::is_droppable) {
                Some(oldest) => {
                    self.events.remove(oldest);
                    self.overflowed += 1;
                }
                // Only mode changes queued; a droppable newcomer yields.
                None if event.is_droppable() => {
                    self.overflowed += 1;
                    return;
                }
                None => {}
            }
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InteractionEvent> + '_ {
        if self.overflowed > 0 {
            log::debug!("interaction queue overflowed, {} events dropped", self.overflowed);
            self.overflowed = 0;
        }
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// What the window layer should do with an incoming event.
#[derive(Debug, Clone, PartialEq)]
pub enum Translated {
    Interaction(InteractionEvent),
    Close,
    Ignored,
}

/// Stateful translation from winit events (tracks the cursor for pan starts).
#[derive(Debug, Default)]
pub struct InputTranslator {
    cursor: Option<Vec2>,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, event: &WindowEvent) -> Translated {
        match event {
            WindowEvent::CloseRequested => Translated::Close,
            WindowEvent::Resized(size) => Translated::Interaction(InteractionEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::CursorMoved { position, .. } => {
                let cursor = Vec2::new(position.x as f32, position.y as f32);
                self.cursor = Some(cursor);
                Translated::Interaction(InteractionEvent::CursorMoved(cursor))
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                Translated::Ignored
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if !matches!(button, MouseButton::Middle | MouseButton::Right) {
                    return Translated::Ignored;
                }
                match state {
                    ElementState::Pressed => Translated::Interaction(InteractionEvent::PanBegin(
                        self.cursor.unwrap_or(Vec2::ZERO),
                    )),
                    ElementState::Released => Translated::Interaction(InteractionEvent::PanEnd),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_SCROLL_LINE,
                };
                Translated::Interaction(InteractionEvent::Scroll(lines))
            }
            WindowEvent::KeyboardInput { event, .. } => {
                // Presses and repeats act; releases do not.
                if event.state != ElementState::Pressed {
                    return Translated::Ignored;
                }
                match event.physical_key {
                    PhysicalKey::Code(code) => map_key(code),
                    PhysicalKey::Unidentified(_) => Translated::Ignored,
                }
            }
            _ => Translated::Ignored,
        }
    }
}

pub fn map_key(code: KeyCode) -> Translated {
    let event = match code {
        KeyCode::Escape => return Translated::Close,
        KeyCode::KeyW | KeyCode::ArrowUp => InteractionEvent::KeyPan(PanDirection::Up),
        KeyCode::KeyS | KeyCode::ArrowDown => InteractionEvent::KeyPan(PanDirection::Down),
        KeyCode::KeyA | KeyCode::ArrowLeft => InteractionEvent::KeyPan(PanDirection::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => InteractionEvent::KeyPan(PanDirection::Right),
        // '+' shares the '=' key on most layouts.
        KeyCode::Equal | KeyCode::NumpadAdd => InteractionEvent::KeyZoomIn,
        KeyCode::Minus | KeyCode::NumpadSubtract => InteractionEvent::KeyZoomOut,
        KeyCode::Space => InteractionEvent::ResetView,
        KeyCode::KeyG => InteractionEvent::ToggleGrid,
        _ => return Translated::Ignored,
    };
    Translated::Interaction(event)
}

// --- End of File: input.rs ---
