// --- File: frame.rs ---
use crate::constants::{FPS_UPDATE_INTERVAL_SECS, MIN_FPS_ELAPSED_SECS, WINDOW_TITLE};
use crate::utils::group_thousands;

/// Rolling frame counter with a once-per-interval FPS measurement.
#[derive(Debug, Clone)]
pub struct FrameStats {
    step: u64,
    frames: u32,
    last_report: f64,
    fps: f64,
    interval: f64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl FrameStats {
    /// `start` is the clock reading (seconds) the first window is measured from.
    pub fn new(start: f64) -> Self {
        Self {
            step: 0,
            frames: 0,
            last_report: start,
            fps: 0.0,
            interval: FPS_UPDATE_INTERVAL_SECS,
        }
    }

    /// Counts one frame at clock reading `now`. Returns the fresh FPS value
    /// when a measurement window closed on this frame.
    pub fn tick(&mut self, now: f64) -> Option<f64> {
        self.step += 1;
        self.frames += 1;
        let elapsed = now - self.last_report;
        if elapsed < self.interval {
            return None;
        }
        self.fps = self.frames as f64 / elapsed.max(MIN_FPS_ELAPSED_SECS);
        self.frames = 0;
        self.last_report = now;
        Some(self.fps)
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Monotonic count of loop iterations.
    pub fn step(&self) -> u64 {
        self.step
    }
}

/// Window title published once per FPS window.
pub fn status_line(point_count: usize, fps: f64) -> String {
    format!(
        "{WINDOW_TITLE} - cells {} | FPS {fps:.1}",
        group_thousands(point_count as u64)
    )
}

/// Which stages of `PollInput → Acquire → Pack → EnsureCapacity → Upload →
/// Draw → Overlay → Present` run this frame. Input and present always run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FramePlan {
    pub pack: bool,
    pub upload: bool,
    pub draw: bool,
    pub overlay: bool,
}

impl FramePlan {
    pub fn new(has_snapshot: bool, point_count: usize) -> Self {
        let has_points = has_snapshot && point_count > 0;
        Self {
            pack: has_snapshot,
            upload: has_points,
            draw: has_points,
            overlay: has_snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_frames_over_one_second_is_sixty_fps() {
        let mut stats = FrameStats::new(0.0);
        let mut reported = None;
        for i in 1..=60 {
            reported = stats.tick(i as f64 / 60.0);
        }
        assert_eq!(reported, Some(60.0));
        assert_eq!(stats.fps(), 60.0);
        assert_eq!(stats.step(), 60);
    }

    #[test]
    fn no_report_inside_the_window_and_counter_resets_after() {
        let mut stats = FrameStats::new(10.0);
        assert_eq!(stats.tick(10.2), None);
        assert_eq!(stats.tick(10.9), None);
        assert_eq!(stats.tick(12.0), Some(1.5)); // 3 frames over 2s
        assert_eq!(stats.tick(12.5), None);
        assert_eq!(stats.tick(13.0), Some(2.0));
        assert_eq!(stats.step(), 5);
    }

    #[test]
    fn status_line_groups_digits() {
        assert_eq!(status_line(1_234_567, 59.94), "GeneGL - cells 1,234,567 | FPS 59.9");
        assert_eq!(status_line(0, 0.0), "GeneGL - cells 0 | FPS 0.0");
    }

    #[test]
    fn empty_frames_skip_draw() {
        let plan = FramePlan::new(true, 0);
        assert!(plan.pack && plan.overlay);
        assert!(!plan.upload && !plan.draw);
    }

    #[test]
    fn missing_snapshot_skips_everything_but_present() {
        let plan = FramePlan::new(false, 0);
        assert_eq!(
            plan,
            FramePlan {
                pack: false,
                upload: false,
                draw: false,
                overlay: false
            }
        );
    }

    #[test]
    fn populated_frames_run_every_stage() {
        let plan = FramePlan::new(true, 42);
        assert!(plan.pack && plan.upload && plan.draw && plan.overlay);
    }
}
// --- End of File: frame.rs ---
