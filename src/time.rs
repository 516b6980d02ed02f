// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time management and fixed timestep support.
//!
//! This module provides:
//! - [`Clock`] - Monotonic clock abstraction ([`SystemClock`], [`ManualClock`])
//! - [`Time`] - Frame timing with pause, scale and max-delta clamping
//! - [`FixedTime`] - Fixed timestep accumulator for deterministic updates
//!
//! # Examples
//!
//! ```
//! use engine2d_core::time::{FixedTime, Time};
//!
//! let mut time = Time::new();
//! let mut fixed = FixedTime::new(60); // 60 Hz
//!
//! time.start();
//! time.update();
//! for _ in 0..fixed.tick(time.delta_f64()) {
//!     // Run simulation at fixed 60 Hz
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Delta reported by the first update after `start`/`reset`
pub const DEFAULT_DELTA: f64 = 1.0 / 60.0;

pub const MIN_FIXED_DELTA: f64 = 0.0001;

/// Monotonic time source measured from an arbitrary origin
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock. Clones share the same reading, so a test can keep one
/// handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, seconds: f64) {
        self.advance(Duration::from_secs_f64(seconds));
    }

    pub fn set(&self, at: Duration) {
        self.nanos.store(at.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Frame timing
///
/// `update` samples the clock once per frame. While paused it reports a zero
/// delta and total time stands still; `resume` rebases the last sample so the
/// paused interval never shows up as a spike.
#[derive(Clone)]
pub struct Time {
    clock: Arc<dyn Clock>,
    last_sample: Duration,
    first_sample: bool,
    started: bool,
    paused: bool,
    /// Unscaled delta of the last update, in seconds
    raw_delta: f64,
    /// Sum of unscaled deltas, in seconds
    total: f64,
    time_scale: f64,
    fixed_delta: f64,
    max_delta: f64,
    frame_count: u64,
}

impl Time {
    /// Create time tracking backed by the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let last_sample = clock.now();
        Self {
            clock,
            last_sample,
            first_sample: true,
            started: false,
            paused: false,
            raw_delta: 0.0,
            total: 0.0,
            time_scale: 1.0,
            fixed_delta: DEFAULT_DELTA,
            max_delta: 0.1,
            frame_count: 0,
        }
    }

    /// Begin measuring from zero
    pub fn start(&mut self) {
        self.reset();
        self.started = true;
    }

    /// Forget accumulated time and leave the paused state; the next update
    /// reports [`DEFAULT_DELTA`]
    pub fn reset(&mut self) {
        self.paused = false;
        self.last_sample = self.clock.now();
        self.first_sample = true;
        self.raw_delta = 0.0;
        self.total = 0.0;
        self.frame_count = 0;
    }

    /// Sample the clock and compute the delta since the previous sample
    pub fn update(&mut self) {
        if self.paused {
            self.raw_delta = 0.0;
            return;
        }

        let now = self.clock.now();
        self.raw_delta = if self.first_sample {
            self.first_sample = false;
            DEFAULT_DELTA
        } else {
            now.saturating_sub(self.last_sample).as_secs_f64()
        };
        self.last_sample = now;
        self.total += self.raw_delta;
        self.frame_count += 1;
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.raw_delta = 0.0;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.last_sample = self.clock.now();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Scaled delta clamped to [`Time::max_delta`], in seconds
    pub fn delta_f64(&self) -> f64 {
        (self.raw_delta * self.time_scale).min(self.max_delta)
    }

    /// Scaled, clamped delta as `f32`
    pub fn delta(&self) -> f32 {
        self.delta_f64() as f32
    }

    /// Delta of the last update before scaling and clamping
    pub fn unscaled_delta(&self) -> f64 {
        self.raw_delta
    }

    /// Total unpaused time in seconds
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Frames per second derived from the last delta (0 when the delta is 0)
    pub fn fps(&self) -> f64 {
        if self.raw_delta > 0.0 {
            1.0 / self.raw_delta
        } else {
            0.0
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Set the delta multiplier; negative values clamp to 0
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    pub fn fixed_delta(&self) -> f64 {
        self.fixed_delta
    }

    pub fn set_fixed_delta(&mut self, seconds: f64) {
        self.fixed_delta = seconds.max(MIN_FIXED_DELTA);
        self.max_delta = self.max_delta.max(self.fixed_delta);
    }

    pub fn max_delta(&self) -> f64 {
        self.max_delta
    }

    /// Set the delta clamp; never below the fixed delta
    pub fn set_max_delta(&mut self, seconds: f64) {
        self.max_delta = seconds.max(self.fixed_delta);
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Time")
            .field("delta", &self.raw_delta)
            .field("total", &self.total)
            .field("paused", &self.paused)
            .field("time_scale", &self.time_scale)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

/// Fixed timestep accumulator
#[derive(Clone, Debug)]
pub struct FixedTime {
    timestep: f64,
    accumulator: f64,
}

impl FixedTime {
    /// Create fixed time with given frequency (Hz)
    pub fn new(hz: u32) -> Self {
        Self::from_seconds(1.0 / f64::from(hz.max(1)))
    }

    /// Create with a custom timestep in seconds
    pub fn from_seconds(timestep: f64) -> Self {
        Self {
            timestep: timestep.max(MIN_FIXED_DELTA),
            accumulator: 0.0,
        }
    }

    pub fn accumulate(&mut self, delta: f64) {
        self.accumulator += delta.max(0.0);
    }

    /// Consume one step if the accumulator holds enough time
    pub fn try_step(&mut self) -> bool {
        if self.accumulator >= self.timestep {
            self.accumulator -= self.timestep;
            true
        } else {
            false
        }
    }

    /// Accumulate `delta` and return the number of fixed steps to run
    pub fn tick(&mut self, delta: f64) -> usize {
        self.accumulate(delta);
        let mut steps = 0;
        while self.try_step() {
            steps += 1;
        }
        steps
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn set_timestep(&mut self, timestep: f64) {
        self.timestep = timestep.max(MIN_FIXED_DELTA);
    }

    /// Leftover time carried into the next tick
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Get overstep as fraction of timestep (0.0 to 1.0)
    pub fn overstep_fraction(&self) -> f32 {
        (self.accumulator / self.timestep) as f32
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

impl Default for FixedTime {
    fn default() -> Self {
        Self::new(60) // 60 Hz default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_time() -> (ManualClock, Time) {
        let clock = ManualClock::new();
        let mut time = Time::with_clock(Arc::new(clock.clone()));
        time.start();
        (clock, time)
    }

    #[test]
    fn test_time_creation() {
        let time = Time::new();
        assert_eq!(time.frame_count(), 0);
        assert_eq!(time.time_scale(), 1.0);
        assert!(!time.is_started());
    }

    #[test]
    fn test_first_update_reports_nominal_delta() {
        let (clock, mut time) = manual_time();
        clock.advance(Duration::from_secs(3));
        time.update();
        assert!((time.unscaled_delta() - DEFAULT_DELTA).abs() < 1e-12);

        clock.advance_secs(0.02);
        time.update();
        assert!((time.unscaled_delta() - 0.02).abs() < 1e-9);
        assert_eq!(time.frame_count(), 2);
    }

    #[test]
    fn test_paused_update_reports_zero() {
        let (clock, mut time) = manual_time();
        time.update();
        let total = time.total();

        time.pause();
        clock.advance_secs(5.0);
        time.update();
        assert_eq!(time.delta(), 0.0);
        assert_eq!(time.fps(), 0.0);
        assert_eq!(time.total(), total);

        time.resume();
        clock.advance_secs(0.25);
        time.update();
        assert!((time.unscaled_delta() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_reset_leaves_paused_state() {
        let (clock, mut time) = manual_time();
        time.pause();
        time.reset();
        assert!(!time.is_paused());

        time.update();
        clock.advance_secs(0.02);
        time.update();
        assert!((time.unscaled_delta() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_scale_and_clamp() {
        let (clock, mut time) = manual_time();
        time.update();
        time.set_time_scale(0.5);
        clock.advance_secs(0.05);
        time.update();
        assert!((time.delta_f64() - 0.025).abs() < 1e-9);

        time.set_time_scale(1.0);
        clock.advance_secs(2.0);
        time.update();
        assert_eq!(time.delta_f64(), time.max_delta());

        time.set_time_scale(-3.0);
        assert_eq!(time.time_scale(), 0.0);
    }

    #[test]
    fn test_limits_follow_fixed_delta() {
        let mut time = Time::new();
        time.set_fixed_delta(0.0);
        assert_eq!(time.fixed_delta(), MIN_FIXED_DELTA);
        time.set_fixed_delta(0.25);
        assert_eq!(time.max_delta(), 0.25);
        time.set_max_delta(0.01);
        assert_eq!(time.max_delta(), 0.25);
    }

    #[test]
    fn test_fixed_time_60hz() {
        let mut fixed = FixedTime::new(60);

        // 16ms frame: not quite a full step yet
        assert_eq!(fixed.tick(0.016), 0);
        // Another frame
        assert_eq!(fixed.tick(0.017), 1);
    }

    #[test]
    fn test_fixed_time_catch_up_carries_leftover() {
        let mut fixed = FixedTime::from_seconds(1.0 / 60.0);
        assert_eq!(fixed.tick(0.05), 3);
        assert!(fixed.accumulator() < 1e-9);

        assert_eq!(fixed.tick(0.01), 0);
        assert_eq!(fixed.tick(0.01), 1);
        assert!((fixed.accumulator() - (0.02 - 1.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_overstep_fraction() {
        let mut fixed = FixedTime::new(60);
        fixed.tick(0.008);

        let fraction = fixed.overstep_fraction();
        assert!(fraction > 0.0 && fraction < 1.0);
    }
}
