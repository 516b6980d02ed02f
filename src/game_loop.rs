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

//! Threaded game loop
//!
//! The loop owns one background thread named `game-loop`. Each tick samples
//! [`Time`], runs the fixed updates the accumulator allows, then one variable
//! update, then the render callback. Lifecycle:
//!
//! ```text
//! Uninitialized -> Stopped -> Running <-> Paused -> Stopped
//! ```
//!
//! A frame that returns an error or panics is logged and the loop stops;
//! failures never cross the thread boundary.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::LoopConfig;
use crate::error::{EngineError, Result};
use crate::time::{Clock, FixedTime, SystemClock, Time};

/// Anything the loop can drive once per tick
pub trait Updatable: Send {
    /// Lower runs first. Captured when the updatable is added.
    fn update_order(&self) -> i32 {
        0
    }

    fn is_update_enabled(&self) -> bool {
        true
    }

    fn update(&mut self, delta_time: f32) -> Result<()>;
}

pub type SharedUpdatable = Arc<Mutex<dyn Updatable>>;

/// Host callback receiving a delta in seconds
pub type LoopCallback = Box<dyn FnMut(f32) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopState {
    Uninitialized,
    Stopped,
    Running,
    Paused,
}

struct Control {
    state: LoopState,
    exit_requested: bool,
    thread_alive: bool,
    handle: Option<JoinHandle<()>>,
}

struct Driver {
    time: Time,
    accumulator: FixedTime,
}

#[derive(Default)]
struct Updatables {
    variable: Vec<(i32, SharedUpdatable)>,
    fixed: Vec<(i32, SharedUpdatable)>,
}

#[derive(Clone, Copy)]
enum Slot {
    Update,
    FixedUpdate,
    Render,
}

#[derive(Default)]
struct Callbacks {
    update: Option<LoopCallback>,
    fixed_update: Option<LoopCallback>,
    render: Option<LoopCallback>,
    /// Bumped on every replacement so a running callback is not restored
    /// over a newer one
    generation: u64,
}

impl Callbacks {
    fn slot(&mut self, slot: Slot) -> &mut Option<LoopCallback> {
        match slot {
            Slot::Update => &mut self.update,
            Slot::FixedUpdate => &mut self.fixed_update,
            Slot::Render => &mut self.render,
        }
    }
}

struct Shared {
    control: Mutex<Control>,
    /// Wakes a paused or pacing loop thread
    gate: Condvar,
    /// Signalled when the loop thread exits
    exited: Condvar,
    settings: Mutex<LoopConfig>,
    driver: Mutex<Driver>,
    updatables: Mutex<Updatables>,
    callbacks: Mutex<Callbacks>,
}

/// Handle to a game loop. Clones share the same loop.
#[derive(Clone)]
pub struct GameLoop {
    shared: Arc<Shared>,
}

impl GameLoop {
    pub fn new() -> Self {
        Self::with_config_and_clock(LoopConfig::default(), Arc::new(SystemClock::new()))
    }

    pub fn with_config(config: LoopConfig) -> Self {
        Self::with_config_and_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_config_and_clock(LoopConfig::default(), clock)
    }

    pub fn with_config_and_clock(config: LoopConfig, clock: Arc<dyn Clock>) -> Self {
        let config = config.normalized();
        let mut time = Time::with_clock(clock);
        time.set_fixed_delta(config.fixed_delta_time);
        time.set_max_delta(config.max_delta_time);
        time.set_time_scale(config.time_scale);
        let accumulator = FixedTime::from_seconds(time.fixed_delta());

        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: LoopState::Uninitialized,
                    exit_requested: false,
                    thread_alive: false,
                    handle: None,
                }),
                gate: Condvar::new(),
                exited: Condvar::new(),
                settings: Mutex::new(config),
                driver: Mutex::new(Driver { time, accumulator }),
                updatables: Mutex::new(Updatables::default()),
                callbacks: Mutex::new(Callbacks::default()),
            }),
        }
    }

    pub fn state(&self) -> LoopState {
        self.shared.control.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Spawn the loop thread. Returns `Ok(false)` if already running; a
    /// paused loop is resumed.
    pub fn start(&self) -> Result<bool> {
        let mut control = self.shared.control.lock();
        match control.state {
            LoopState::Running => return Ok(false),
            LoopState::Paused => {
                drop(control);
                return Ok(self.resume());
            }
            LoopState::Uninitialized => self.shared.driver.lock().time.start(),
            LoopState::Stopped => {}
        }

        if control.thread_alive {
            return Err(EngineError::InvalidState(
                "previous game loop thread has not exited yet".into(),
            ));
        }
        if let Some(handle) = control.handle.take() {
            // The thread has released every lock once `thread_alive` is false
            let _ = handle.join();
        }

        control.exit_requested = false;
        control.state = LoopState::Running;
        control.thread_alive = true;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("game-loop".into())
            .spawn(move || run(shared));
        match spawned {
            Ok(handle) => {
                control.handle = Some(handle);
                info!("game loop started");
                Ok(true)
            }
            Err(err) => {
                control.state = LoopState::Stopped;
                control.thread_alive = false;
                Err(err.into())
            }
        }
    }

    /// Only valid while running
    pub fn pause(&self) -> bool {
        {
            let mut control = self.shared.control.lock();
            if control.state != LoopState::Running {
                return false;
            }
            control.state = LoopState::Paused;
        }
        self.shared.driver.lock().time.pause();
        debug!("game loop paused");
        true
    }

    /// Only valid while paused
    pub fn resume(&self) -> bool {
        {
            let mut control = self.shared.control.lock();
            if control.state != LoopState::Paused {
                return false;
            }
            control.state = LoopState::Running;
        }
        self.shared.driver.lock().time.resume();
        self.shared.gate.notify_all();
        debug!("game loop resumed");
        true
    }

    /// Ask the loop thread to exit and wait for it up to
    /// `stop_timeout_ms`. A thread that does not exit in time is reported
    /// and left to finish on its own.
    pub fn stop(&self) -> bool {
        let timeout = Duration::from_millis(self.shared.settings.lock().stop_timeout_ms);

        let mut control = self.shared.control.lock();
        if matches!(control.state, LoopState::Stopped | LoopState::Uninitialized) {
            return false;
        }
        let was_paused = control.state == LoopState::Paused;
        control.exit_requested = true;
        control.state = LoopState::Stopped;
        self.shared.gate.notify_all();

        let on_loop_thread = control
            .handle
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id());
        if on_loop_thread {
            // The thread exits at the top of its next tick
            return true;
        }

        let deadline = Instant::now() + timeout;
        while control.thread_alive {
            if self.shared.exited.wait_until(&mut control, deadline).timed_out() {
                break;
            }
        }
        if control.thread_alive {
            drop(control);
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "game loop thread did not exit in time"
            );
            return true;
        }

        let handle = control.handle.take();
        drop(control);
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        // A stopped loop never leaves its time source paused
        if was_paused {
            self.shared.driver.lock().time.resume();
        }
        info!("game loop stopped");
        true
    }

    /// Run one tick on the calling thread
    pub fn do_frame(&self) -> Result<()> {
        self.shared.do_frame()
    }

    pub fn set_update_callback(&self, callback: impl FnMut(f32) + Send + 'static) {
        self.set_callback(Slot::Update, Some(Box::new(callback)));
    }

    pub fn set_fixed_update_callback(&self, callback: impl FnMut(f32) + Send + 'static) {
        self.set_callback(Slot::FixedUpdate, Some(Box::new(callback)));
    }

    pub fn set_render_callback(&self, callback: impl FnMut(f32) + Send + 'static) {
        self.set_callback(Slot::Render, Some(Box::new(callback)));
    }

    fn set_callback(&self, slot: Slot, callback: Option<LoopCallback>) {
        let mut callbacks = self.shared.callbacks.lock();
        *callbacks.slot(slot) = callback;
        callbacks.generation += 1;
    }

    pub fn clear_callbacks(&self) {
        let mut callbacks = self.shared.callbacks.lock();
        callbacks.update = None;
        callbacks.fixed_update = None;
        callbacks.render = None;
        callbacks.generation += 1;
    }

    /// Run `updatable` once per tick. Returns false if it is already added.
    pub fn add_updatable(&self, updatable: SharedUpdatable) -> bool {
        let mut updatables = self.shared.updatables.lock();
        insert_sorted(&mut updatables.variable, updatable)
    }

    /// Run `updatable` once per fixed step
    pub fn add_fixed_updatable(&self, updatable: SharedUpdatable) -> bool {
        let mut updatables = self.shared.updatables.lock();
        insert_sorted(&mut updatables.fixed, updatable)
    }

    pub fn remove_updatable(&self, updatable: &SharedUpdatable) -> bool {
        remove_from(&mut self.shared.updatables.lock().variable, updatable)
    }

    pub fn remove_fixed_updatable(&self, updatable: &SharedUpdatable) -> bool {
        remove_from(&mut self.shared.updatables.lock().fixed, updatable)
    }

    pub fn updatable_count(&self) -> usize {
        self.shared.updatables.lock().variable.len()
    }

    pub fn fixed_updatable_count(&self) -> usize {
        self.shared.updatables.lock().fixed.len()
    }

    /// Inspect or adjust the loop's time source
    pub fn with_time<R>(&self, f: impl FnOnce(&mut Time) -> R) -> R {
        f(&mut self.shared.driver.lock().time)
    }

    /// Leftover fixed-step time as a fraction of one step
    pub fn interpolation_alpha(&self) -> f32 {
        self.shared.driver.lock().accumulator.overstep_fraction()
    }

    pub fn config(&self) -> LoopConfig {
        self.shared.settings.lock().clone()
    }

    pub fn fixed_time_step(&self) -> bool {
        self.shared.settings.lock().fixed_time_step
    }

    pub fn set_fixed_time_step(&self, enabled: bool) {
        self.shared.settings.lock().fixed_time_step = enabled;
    }

    pub fn target_elapsed_time(&self) -> f64 {
        self.shared.settings.lock().target_elapsed_time
    }

    pub fn set_target_elapsed_time(&self, seconds: f64) {
        let mut settings = self.shared.settings.lock();
        settings.target_elapsed_time = seconds;
        *settings = settings.clone().normalized();
    }

    pub fn max_elapsed_time(&self) -> f64 {
        self.shared.settings.lock().max_elapsed_time
    }

    pub fn set_max_elapsed_time(&self, seconds: f64) {
        let mut settings = self.shared.settings.lock();
        settings.max_elapsed_time = seconds;
        *settings = settings.clone().normalized();
    }

    pub fn set_fixed_delta_time(&self, seconds: f64) {
        let mut driver = self.shared.driver.lock();
        driver.time.set_fixed_delta(seconds);
        let fixed = driver.time.fixed_delta();
        driver.accumulator.set_timestep(fixed);
        self.shared.settings.lock().fixed_delta_time = fixed;
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoop")
            .field("state", &self.state())
            .field("config", &self.config())
            .finish()
    }
}

fn same_updatable(a: &SharedUpdatable, b: &SharedUpdatable) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

fn insert_sorted(list: &mut Vec<(i32, SharedUpdatable)>, updatable: SharedUpdatable) -> bool {
    if list.iter().any(|(_, existing)| same_updatable(existing, &updatable)) {
        return false;
    }
    let order = updatable.lock().update_order();
    // Equal orders keep insertion order
    let index = list.partition_point(|(existing, _)| *existing <= order);
    list.insert(index, (order, updatable));
    true
}

fn remove_from(list: &mut Vec<(i32, SharedUpdatable)>, updatable: &SharedUpdatable) -> bool {
    let before = list.len();
    list.retain(|(_, existing)| !same_updatable(existing, updatable));
    list.len() != before
}

impl Shared {
    fn do_frame(&self) -> Result<()> {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("game_loop.frame").entered();

        let settings = self.settings.lock().clone();
        let (delta, fixed_delta, steps) = {
            let mut driver = self.driver.lock();
            driver.time.update();
            let delta = driver.time.delta_f64().min(settings.max_elapsed_time);
            let fixed_delta = driver.time.fixed_delta();
            let steps = if settings.fixed_time_step {
                driver.accumulator.set_timestep(fixed_delta);
                driver.accumulator.tick(delta)
            } else {
                0
            };
            (delta as f32, fixed_delta as f32, steps)
        };

        for _ in 0..steps {
            self.invoke(Slot::FixedUpdate, fixed_delta);
            let fixed = self.updatables.lock().fixed.clone();
            run_updatables(&fixed, fixed_delta)?;
        }

        self.invoke(Slot::Update, delta);
        let variable = self.updatables.lock().variable.clone();
        run_updatables(&variable, delta)?;

        self.invoke(Slot::Render, delta);
        Ok(())
    }

    /// Call the callback in `slot` without holding the callback lock, so it
    /// may replace callbacks itself
    fn invoke(&self, slot: Slot, delta: f32) {
        let (callback, generation) = {
            let mut callbacks = self.callbacks.lock();
            let generation = callbacks.generation;
            (callbacks.slot(slot).take(), generation)
        };
        let Some(mut callback) = callback else {
            return;
        };
        callback(delta);

        let mut callbacks = self.callbacks.lock();
        if callbacks.generation == generation {
            *callbacks.slot(slot) = Some(callback);
        }
    }
}

fn run_updatables(list: &[(i32, SharedUpdatable)], delta: f32) -> Result<()> {
    for (_, updatable) in list {
        let mut updatable = updatable.lock();
        if updatable.is_update_enabled() {
            updatable.update(delta)?;
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run(shared: Arc<Shared>) {
    shared.driver.lock().time.reset();

    loop {
        {
            let mut control = shared.control.lock();
            while control.state == LoopState::Paused && !control.exit_requested {
                shared.gate.wait(&mut control);
            }
            if control.exit_requested || control.state == LoopState::Stopped {
                break;
            }
        }

        let frame_start = Instant::now();
        let failure = match panic::catch_unwind(AssertUnwindSafe(|| shared.do_frame())) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(payload) => Some(format!("panic: {}", panic_message(payload.as_ref()))),
        };
        if let Some(reason) = failure {
            error!(%reason, "game loop frame failed, stopping");
            shared.control.lock().state = LoopState::Stopped;
            break;
        }

        let (fixed_time_step, target) = {
            let settings = shared.settings.lock();
            (
                settings.fixed_time_step,
                Duration::from_secs_f64(settings.target_elapsed_time),
            )
        };
        if fixed_time_step {
            let elapsed = frame_start.elapsed();
            if elapsed < target {
                let mut control = shared.control.lock();
                if !control.exit_requested {
                    shared.gate.wait_for(&mut control, target - elapsed);
                }
            }
        } else {
            thread::yield_now();
        }
    }

    let mut control = shared.control.lock();
    control.thread_alive = false;
    shared.exited.notify_all();
}
