// --- File: streaming.rs ---
//! Per-frame vertex streaming with buffer orphaning.
//!
//! Every upload allocates a fresh buffer at the current capacity and writes
//! only the used prefix into it. Dropping the previous buffer hands it back
//! to wgpu, which keeps it alive until the in-flight frame that reads it has
//! finished, so the new write never has to wait on the GPU. Capacity itself
//! only ever grows.

use crate::constants::{
    COLOR_FLOATS_PER_POINT, COLOR_GROWTH_SLACK, INITIAL_POINT_CAPACITY,
    POSITION_FLOATS_PER_POINT, POSITION_GROWTH_SLACK,
};
use crate::geometry::PackedGeometry;

const FLOAT_BYTES: u64 = std::mem::size_of::<f32>() as u64;

/// Which capacities changed in an `ensure_capacity` step.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Growth {
    pub position: bool,
    pub color: bool,
}

impl Growth {
    pub fn any(self) -> bool {
        self.position || self.color
    }
}

/// CPU-side bookkeeping for the two vertex streams, in floats.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferState {
    position_capacity: usize,
    color_capacity: usize,
    count: usize,
}

impl Default for BufferState {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferState {
    pub fn new() -> Self {
        Self {
            position_capacity: INITIAL_POINT_CAPACITY * POSITION_FLOATS_PER_POINT,
            color_capacity: INITIAL_POINT_CAPACITY * COLOR_FLOATS_PER_POINT,
            count: 0,
        }
    }

    pub fn position_capacity(&self) -> usize {
        self.position_capacity
    }

    pub fn color_capacity(&self) -> usize {
        self.color_capacity
    }

    /// Points valid in the buffers for the current frame.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    /// Grows either stream to `max(needed, 2 * current + slack)` when `points`
    /// would not fit. Never shrinks.
    pub fn ensure_capacity(&mut self, points: usize) -> Growth {
        let need_position = points * POSITION_FLOATS_PER_POINT;
        let need_color = points * COLOR_FLOATS_PER_POINT;
        let mut growth = Growth::default();

        if need_position > self.position_capacity {
            self.position_capacity =
                need_position.max(self.position_capacity * 2 + POSITION_GROWTH_SLACK);
            growth.position = true;
        }
        if need_color > self.color_capacity {
            self.color_capacity = need_color.max(self.color_capacity * 2 + COLOR_GROWTH_SLACK);
            growth.color = true;
        }
        growth
    }

    fn position_bytes(&self) -> u64 {
        self.position_capacity as u64 * FLOAT_BYTES
    }

    fn color_bytes(&self) -> u64 {
        self.color_capacity as u64 * FLOAT_BYTES
    }
}

// --- GPU Buffers ---

pub struct StreamingBuffers {
    state: BufferState,
    position_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
}

impl StreamingBuffers {
    /// Allocates both streams at the initial capacity so no frame ever sees a
    /// zero-sized buffer.
    pub fn new(device: &wgpu::Device) -> Self {
        let state = BufferState::new();
        Self {
            position_buffer: Self::allocate(device, "Cell Position Buffer", state.position_bytes()),
            color_buffer: Self::allocate(device, "Cell Color Buffer", state.color_bytes()),
            state,
        }
    }

    fn allocate(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn point_count(&self) -> u32 {
        self.state.count as u32
    }

    pub fn ensure_capacity(&mut self, device: &wgpu::Device, points: usize) {
        let before = self.state;
        let growth = self.state.ensure_capacity(points);
        if growth.position {
            log::debug!(
                "Growing position stream from {} to {} floats",
                before.position_capacity,
                self.state.position_capacity
            );
            self.position_buffer =
                Self::allocate(device, "Cell Position Buffer", self.state.position_bytes());
        }
        if growth.color {
            log::debug!(
                "Growing color stream from {} to {} floats",
                before.color_capacity,
                self.state.color_capacity
            );
            self.color_buffer =
                Self::allocate(device, "Cell Color Buffer", self.state.color_bytes());
        }
    }

    /// Streams this frame's geometry. A zero-point frame touches no GPU buffer.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        geometry: &PackedGeometry,
    ) {
        let points = geometry.point_count();
        self.state.set_count(points);
        if points == 0 {
            return;
        }
        self.ensure_capacity(device, points);

        // Orphan: full-capacity allocation first, then the used prefix only.
        self.position_buffer =
            Self::allocate(device, "Cell Position Buffer", self.state.position_bytes());
        queue.write_buffer(
            &self.position_buffer,
            0,
            bytemuck::cast_slice(geometry.position_floats()),
        );

        self.color_buffer = Self::allocate(device, "Cell Color Buffer", self.state.color_bytes());
        queue.write_buffer(
            &self.color_buffer,
            0,
            bytemuck::cast_slice(geometry.color_floats()),
        );
    }

    /// Byte slices covering only the valid prefix of each stream.
    pub fn slices(&self) -> (wgpu::BufferSlice<'_>, wgpu::BufferSlice<'_>) {
        let points = self.state.count as u64;
        let position_end = points * POSITION_FLOATS_PER_POINT as u64 * FLOAT_BYTES;
        let color_end = points * COLOR_FLOATS_PER_POINT as u64 * FLOAT_BYTES;
        (
            self.position_buffer.slice(..position_end),
            self.color_buffer.slice(..color_end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_initial_capacity() {
        let state = BufferState::new();
        assert_eq!(state.position_capacity(), 2048);
        assert_eq!(state.color_capacity(), 4096);
        assert_eq!(state.count(), 0);
    }

    #[test]
    fn growth_uses_doubling_plus_slack() {
        let mut state = BufferState::new();
        let growth = state.ensure_capacity(2000);
        assert_eq!(state.position_capacity(), 5120); // max(4000, 2048*2 + 1024)
        assert_eq!(state.color_capacity(), 10240); // max(8000, 4096*2 + 2048)
        assert!(growth.position && growth.color);
    }

    #[test]
    fn large_jumps_allocate_exactly_what_is_needed() {
        let mut state = BufferState::new();
        state.ensure_capacity(100_000);
        assert_eq!(state.position_capacity(), 200_000);
        assert_eq!(state.color_capacity(), 400_000);
    }

    #[test]
    fn fitting_requests_do_not_grow() {
        let mut state = BufferState::new();
        assert!(!state.ensure_capacity(0).any());
        assert!(!state.ensure_capacity(INITIAL_POINT_CAPACITY).any());
        assert_eq!(state, BufferState::new());
    }

    #[test]
    fn capacity_covers_request_and_never_shrinks() {
        let mut state = BufferState::new();
        let mut last = (state.position_capacity(), state.color_capacity());
        for points in [0, 1, 1023, 1024, 1025, 3000, 2999, 10, 50_000, 49_999, 120_000, 7] {
            state.ensure_capacity(points);
            assert!(state.position_capacity() >= 2 * points);
            assert!(state.color_capacity() >= 4 * points);
            assert!(state.position_capacity() >= last.0);
            assert!(state.color_capacity() >= last.1);
            last = (state.position_capacity(), state.color_capacity());
        }
    }
}
// --- End of File: streaming.rs ---
