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

//! Scenes: named units owning a private world
//!
//! Lifecycle is `Unloaded -> Loaded -> Active` with symmetric teardown.
//! `activate` loads first when needed and `unload` deactivates first when
//! needed. Custom behaviour plugs in through [`SceneHooks`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use speedy::{Readable, Writable};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::render::RenderSurface;
use crate::serialization::{SceneData, SceneValueEntry};
use crate::world::World;

/// Typed value stored in a scene's data store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub enum SceneValue {
    Int(i32),
    Float(f32),
    Text(String),
    Bool(bool),
}

impl From<i32> for SceneValue {
    fn from(value: i32) -> Self {
        SceneValue::Int(value)
    }
}

impl From<f32> for SceneValue {
    fn from(value: f32) -> Self {
        SceneValue::Float(value)
    }
}

impl From<bool> for SceneValue {
    fn from(value: bool) -> Self {
        SceneValue::Bool(value)
    }
}

impl From<String> for SceneValue {
    fn from(value: String) -> Self {
        SceneValue::Text(value)
    }
}

impl From<&str> for SceneValue {
    fn from(value: &str) -> Self {
        SceneValue::Text(value.to_string())
    }
}

/// Extraction of a concrete type from a [`SceneValue`]
pub trait FromSceneValue: Sized {
    fn from_scene_value(value: &SceneValue) -> Option<Self>;
}

impl FromSceneValue for i32 {
    fn from_scene_value(value: &SceneValue) -> Option<Self> {
        match value {
            SceneValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSceneValue for f32 {
    fn from_scene_value(value: &SceneValue) -> Option<Self> {
        match value {
            SceneValue::Float(v) => Some(*v),
            SceneValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }
}

impl FromSceneValue for bool {
    fn from_scene_value(value: &SceneValue) -> Option<Self> {
        match value {
            SceneValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSceneValue for String {
    fn from_scene_value(value: &SceneValue) -> Option<Self> {
        match value {
            SceneValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Lifecycle state of a scene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneState {
    Unloaded,
    Loaded,
    Active,
}

/// Scene behaviour. Every hook receives the scene's world.
pub trait SceneHooks: Send {
    fn on_load(&mut self, _world: &mut World) -> Result<()> {
        Ok(())
    }

    fn on_unload(&mut self, _world: &mut World) -> Result<()> {
        Ok(())
    }

    fn on_activate(&mut self, _world: &mut World) -> Result<()> {
        Ok(())
    }

    fn on_deactivate(&mut self, _world: &mut World) -> Result<()> {
        Ok(())
    }

    /// Runs after the world update each frame
    fn on_update(&mut self, _world: &mut World, _delta_time: f32) -> Result<()> {
        Ok(())
    }
}

/// Named, independently loadable unit owning its own world
pub struct Scene {
    name: String,
    world: World,
    loaded: bool,
    active: bool,
    data: BTreeMap<String, SceneValue>,
    hooks: Option<Box<dyn SceneHooks>>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            world: World::with_name(format!("{name} World")),
            name,
            loaded: false,
            active: false,
            data: BTreeMap::new(),
            hooks: None,
        }
    }

    pub fn with_hooks(name: impl Into<String>, hooks: impl SceneHooks + 'static) -> Self {
        let mut scene = Self::new(name);
        scene.hooks = Some(Box::new(hooks));
        scene
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> SceneState {
        match (self.loaded, self.active) {
            (_, true) => SceneState::Active,
            (true, false) => SceneState::Loaded,
            (false, false) => SceneState::Unloaded,
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_load(&mut self.world)?;
        }
        self.loaded = true;
        debug!(scene = %self.name, "scene loaded");
        Ok(())
    }

    pub fn unload(&mut self) -> Result<()> {
        if !self.loaded {
            return Ok(());
        }
        self.deactivate()?;
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_unload(&mut self.world)?;
        }
        self.loaded = false;
        debug!(scene = %self.name, "scene unloaded");
        Ok(())
    }

    pub fn activate(&mut self) -> Result<()> {
        self.load()?;
        if self.active {
            return Ok(());
        }
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_activate(&mut self.world)?;
        }
        self.active = true;
        debug!(scene = %self.name, "scene activated");
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_deactivate(&mut self.world)?;
        }
        self.active = false;
        debug!(scene = %self.name, "scene deactivated");
        Ok(())
    }

    /// Per-frame update; dormant unless active
    pub fn update(&mut self, delta_time: f32) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.run_frame(delta_time)
    }

    /// Update regardless of the active flag. The scene manager drives the
    /// pending target of a transition through this.
    pub(crate) fn run_frame(&mut self, delta_time: f32) -> Result<()> {
        self.world.update(delta_time)?;
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_update(&mut self.world, delta_time)?;
        }
        Ok(())
    }

    /// Draw through the world's main camera
    pub fn render(&mut self, surface: &mut dyn RenderSurface) -> Result<usize> {
        self.world.render_from_camera(surface, None)
    }

    /// Store a value; keys must be non-empty
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<SceneValue>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(EngineError::InvalidState(
                "scene data key cannot be empty".into(),
            ));
        }
        self.data.insert(key, value.into());
        Ok(())
    }

    /// Typed lookup; `None` when missing or of another type
    pub fn data<T: FromSceneValue>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(T::from_scene_value)
    }

    pub fn data_or<T: FromSceneValue>(&self, key: &str, default: T) -> T {
        self.data(key).unwrap_or(default)
    }

    pub fn raw_data(&self, key: &str) -> Option<&SceneValue> {
        self.data.get(key)
    }

    pub fn remove_data(&mut self, key: &str) -> Option<SceneValue> {
        self.data.remove(key)
    }

    pub fn data_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.data.keys().map(String::as_str)
    }

    pub fn snapshot(&self) -> SceneData {
        SceneData {
            name: self.name.clone(),
            loaded: self.loaded,
            active: self.active,
            values: self
                .data
                .iter()
                .map(|(key, value)| SceneValueEntry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            world: self.world.snapshot(),
        }
    }

    /// Replace world contents, data store and lifecycle flags. Hooks are not
    /// run; the flags are taken as recorded.
    pub fn restore(&mut self, data: SceneData) -> Result<()> {
        if data.name != self.name {
            return Err(EngineError::InvalidState(format!(
                "snapshot of scene '{}' cannot restore scene '{}'",
                data.name, self.name
            )));
        }
        self.world.load_snapshot(data.world)?;
        self.data = data
            .values
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect();
        self.loaded = data.loaded || data.active;
        self.active = data.active;
        Ok(())
    }

    pub fn from_snapshot(data: SceneData) -> Result<Self> {
        let mut scene = Scene::new(data.name.clone());
        scene.restore(data)?;
        Ok(scene)
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("world", &self.world)
            .field("data", &self.data)
            .finish()
    }
}
