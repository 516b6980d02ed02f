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

//! Engine configuration
//!
//! Every section deserializes with defaults for missing fields, so a partial
//! JSON file is valid.
//!
//! ```json
//! { "game_loop": { "fixed_time_step": false }, "log": { "level": "debug" } }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::time::{DEFAULT_DELTA, MIN_FIXED_DELTA};

pub const MIN_TARGET_ELAPSED_TIME: f64 = 0.001;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub game_loop: LoopConfig,
    pub scenes: SceneConfig,
    pub log: LogConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::ConfigError(e.to_string()))?;
        Ok(config.normalized())
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::ConfigError(e.to_string()))
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn normalized(self) -> Self {
        Self {
            game_loop: self.game_loop.normalized(),
            scenes: self.scenes.normalized(),
            log: self.log,
        }
    }
}

/// Game loop timing. All durations are seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub fixed_time_step: bool,
    /// Pacing target per tick in fixed-step mode
    pub target_elapsed_time: f64,
    /// Upper bound on the delta fed into one tick
    pub max_elapsed_time: f64,
    pub fixed_delta_time: f64,
    /// Clamp applied by `Time` to the scaled delta
    pub max_delta_time: f64,
    pub time_scale: f64,
    pub stop_timeout_ms: u64,
}

impl LoopConfig {
    pub fn normalized(mut self) -> Self {
        self.target_elapsed_time = self.target_elapsed_time.max(MIN_TARGET_ELAPSED_TIME);
        self.max_elapsed_time = self.max_elapsed_time.max(self.target_elapsed_time);
        self.fixed_delta_time = self.fixed_delta_time.max(MIN_FIXED_DELTA);
        self.max_delta_time = self.max_delta_time.max(self.fixed_delta_time);
        self.time_scale = self.time_scale.max(0.0);
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: true,
            target_elapsed_time: DEFAULT_DELTA,
            max_elapsed_time: 0.5,
            fixed_delta_time: DEFAULT_DELTA,
            max_delta_time: 0.1,
            time_scale: 1.0,
            stop_timeout_ms: 1000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub transition_duration: f32,
    pub fading: bool,
    pub update_order: i32,
}

impl SceneConfig {
    pub fn normalized(mut self) -> Self {
        self.transition_duration = self
            .transition_duration
            .max(crate::scene_manager::MIN_TRANSITION_DURATION);
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            transition_duration: 1.0,
            fading: true,
            update_order: 0,
        }
    }
}

/// Logging output, used by `logging::init_logging`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
    pub console: bool,
    pub file: Option<String>,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            console: true,
            file: None,
            json: false,
        }
    }
}
