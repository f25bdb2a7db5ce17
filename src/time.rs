//! Simulation clock.
//!
//! The clock only advances while the animation runs. The timestamp of the
//! previous tick is refreshed on every tick, paused or not, so resuming never
//! produces a jump equal to the time spent paused.
//!
//! Time is injected by the caller, which keeps the frame driver testable:
//!
//! ```ignore
//! use flowtrail::time::Clock;
//! use std::time::Instant;
//!
//! let mut clock = Clock::new(Instant::now());
//! // Once per redraw:
//! clock.tick(Instant::now(), params.anim_run);
//! println!("{:.1} ms simulated", clock.accumulated_ms());
//! ```

use std::time::{Duration, Instant};

const FPS_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Accumulated simulation time and frame timing.
#[derive(Debug, Clone)]
pub struct Clock {
    /// Timestamp of the previous tick.
    last_tick: Instant,
    /// Sum of all deltas observed while running.
    accumulated: Duration,
    /// Delta of the most recent tick (zero while paused).
    delta: Duration,
    /// Ticks observed while running.
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
}

impl Clock {
    /// Create a clock whose first tick measures from `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            last_tick: now,
            accumulated: Duration::ZERO,
            delta: Duration::ZERO,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
        }
    }

    /// Advance the clock. Returns the delta applied to the accumulated time.
    pub fn tick(&mut self, now: Instant, running: bool) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.delta = if running { elapsed } else { Duration::ZERO };
        self.accumulated += self.delta;

        if running {
            self.frame_count += 1;
        }

        // FPS over wall time, so it drops to zero while paused
        let fps_elapsed = now.saturating_duration_since(self.fps_update_time);
        if fps_elapsed >= FPS_UPDATE_INTERVAL {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.delta
    }

    /// Total simulated time.
    #[inline]
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Total simulated time in milliseconds, as the shaders consume it.
    #[inline]
    pub fn accumulated_ms(&self) -> f32 {
        self.accumulated.as_secs_f64() as f32 * 1000.0
    }

    /// Delta of the latest tick.
    #[inline]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta of the latest tick in milliseconds.
    #[inline]
    pub fn delta_ms(&self) -> f32 {
        self.delta.as_secs_f32() * 1000.0
    }

    /// Frames rendered since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Rendered frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_running_accumulates() {
        let start = Instant::now();
        let mut clock = Clock::new(start);
        assert_eq!(clock.tick(start + ms(16), true), ms(16));
        assert_eq!(clock.tick(start + ms(40), true), ms(24));
        assert_eq!(clock.accumulated(), ms(40));
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_paused_does_not_accumulate() {
        let start = Instant::now();
        let mut clock = Clock::new(start);
        clock.tick(start + ms(10), true);
        for i in 1..=5 {
            assert_eq!(clock.tick(start + ms(10 + i * 100), false), Duration::ZERO);
            assert_eq!(clock.accumulated(), ms(10));
        }
        assert_eq!(clock.delta_ms(), 0.0);
    }

    #[test]
    fn test_resume_has_no_time_debt() {
        let start = Instant::now();
        let mut clock = Clock::new(start);
        clock.tick(start + ms(20), true);
        clock.tick(start + ms(30), false);
        // Long gap while paused
        clock.tick(start + ms(5_030), false);
        let delta = clock.tick(start + ms(5_046), true);
        assert_eq!(delta, ms(16));
        assert_eq!(clock.accumulated(), ms(36));
    }

    #[test]
    fn test_milliseconds() {
        let start = Instant::now();
        let mut clock = Clock::new(start);
        clock.tick(start + ms(250), true);
        assert!((clock.accumulated_ms() - 250.0).abs() < 1e-3);
        assert!((clock.delta_ms() - 250.0).abs() < 1e-3);
    }

    #[test]
    fn test_fps_estimate() {
        let start = Instant::now();
        let mut clock = Clock::new(start);
        for i in 1..=30 {
            clock.tick(start + ms(i * 20), true);
        }
        // 30 frames over 600ms, sampled at the first tick past 500ms
        assert!(clock.fps() > 45.0 && clock.fps() < 55.0);
    }
}
