//! Wall-clock frame timing for the host loop.
//!
//! The session itself only sees the `dt` handed to
//! [`Session::tick`](crate::Session::tick); this timer is where that value
//! comes from when running in a window.
//!
//! ```ignore
//! let mut timer = FrameTimer::new();
//! loop {
//!     let (_, dt) = timer.update();
//!     session.tick(dt)?;
//! }
//! ```

use std::time::{Duration, Instant};

/// Longest frame delta passed on, in seconds. Longer stalls (window drags,
/// breakpoints) are clamped so the camera does not jump.
pub const DEFAULT_MAX_DELTA: f32 = 0.25;

/// Frame delta, frame count and FPS tracking.
#[derive(Debug)]
pub struct FrameTimer {
    start: Instant,
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    /// Replaces the measured delta when set.
    fixed_delta: Option<f32>,
    max_delta: f32,
}

impl FrameTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_secs(5),
            fixed_delta: None,
            max_delta: DEFAULT_MAX_DELTA,
        }
    }

    /// Update timing values. Call once per frame.
    ///
    /// Returns `(elapsed_time, delta_time)`.
    pub fn update(&mut self) -> (f32, f32) {
        let now = Instant::now();

        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.delta_secs = self.fixed_delta.unwrap_or(raw_delta).min(self.max_delta);
        self.last_frame = now;
        self.elapsed_secs = now.duration_since(self.start).as_secs_f32();
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
            log::debug!("{:.1} fps", self.fps);
        }

        (self.elapsed_secs, self.delta_secs)
    }

    /// Seconds since the timer was created.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Seconds between the last two updates.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed every few seconds.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Use a constant delta instead of measured time. `None` restores
    /// measured timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Clamp for measured deltas.
    pub fn set_max_delta(&mut self, max: f32) {
        self.max_delta = max.max(0.0);
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_update_counts_frames() {
        let mut timer = FrameTimer::new();
        thread::sleep(Duration::from_millis(10));
        let (elapsed, delta) = timer.update();

        assert!(elapsed > 0.0);
        assert!(delta > 0.0);
        assert_eq!(timer.frame(), 1);
    }

    #[test]
    fn test_fixed_delta() {
        let mut timer = FrameTimer::new();
        timer.set_fixed_delta(Some(1.0 / 60.0));

        thread::sleep(Duration::from_millis(30));
        timer.update();

        assert!((timer.delta() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_long_stall_is_clamped() {
        let mut timer = FrameTimer::new();
        timer.set_max_delta(0.005);

        thread::sleep(Duration::from_millis(30));
        timer.update();

        assert_eq!(timer.delta(), 0.005);
    }
}
