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

//! Scene registry and the timed transition state machine
//!
//! A [`SceneManager`] is an ordinary value: the host creates one and hands it
//! to whatever drives frames, typically a [`GameLoop`](crate::game_loop::GameLoop)
//! through a shared updatable.
//!
//! At most one transition is in flight. A deferred change records the target
//! as pending, then each `update` advances the progress by
//! `delta / transition_duration`. When progress reaches 1 the previous scene
//! is deactivated, the target activated and `TransitionCompleted` published.

use std::fmt;

use ahash::AHashMap;
use crossbeam::channel::Receiver;
use tracing::{debug, info, warn};

use crate::config::SceneConfig;
use crate::error::{EngineError, Result};
use crate::event::{EventChannel, SceneEvent};
use crate::game_loop::Updatable;
use crate::math;
use crate::render::{Color, RenderSurface};
use crate::scene::Scene;
use crate::serialization::SceneManagerData;

pub const MIN_TRANSITION_DURATION: f32 = 0.1;

pub struct SceneManager {
    scenes: AHashMap<String, Scene>,
    order: Vec<String>,
    active: Option<String>,
    pending: Option<String>,
    transition_progress: f32,
    transition_duration: f32,
    fading: bool,
    update_enabled: bool,
    update_order: i32,
    events: EventChannel<SceneEvent>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::with_config(&SceneConfig::default())
    }

    pub fn with_config(config: &SceneConfig) -> Self {
        Self {
            scenes: AHashMap::new(),
            order: Vec::new(),
            active: None,
            pending: None,
            transition_progress: 0.0,
            transition_duration: config.transition_duration.max(MIN_TRANSITION_DURATION),
            fading: config.fading,
            update_enabled: true,
            update_order: config.update_order,
            events: EventChannel::new(),
        }
    }

    /// Register a scene under its name. Names are unique.
    pub fn register_scene(&mut self, scene: Scene) -> Result<()> {
        if self.scenes.contains_key(scene.name()) {
            return Err(EngineError::InvalidState(format!(
                "scene '{}' is already registered",
                scene.name()
            )));
        }
        let name = scene.name().to_string();
        debug!(scene = %name, "scene registered");
        self.order.push(name.clone());
        self.scenes.insert(name, scene);
        Ok(())
    }

    /// Remove a scene, unloading it first. The active scene and the pending
    /// target of a transition cannot be removed.
    pub fn unregister_scene(&mut self, name: &str) -> Result<Scene> {
        self.ensure_detached(name, "unregister")?;
        let mut scene = self
            .scenes
            .remove(name)
            .ok_or_else(|| scene_not_found(name))?;
        self.order.retain(|n| n != name);
        if scene.is_loaded() {
            scene.unload()?;
            self.events.publish(SceneEvent::Unloaded {
                scene: name.to_string(),
            });
        }
        Ok(scene)
    }

    fn ensure_detached(&self, name: &str, action: &str) -> Result<()> {
        if !self.scenes.contains_key(name) {
            return Err(scene_not_found(name));
        }
        if self.active.as_deref() == Some(name) {
            return Err(EngineError::InvalidState(format!(
                "cannot {action} the active scene '{name}'"
            )));
        }
        if self.pending.as_deref() == Some(name) {
            return Err(EngineError::InvalidState(format!(
                "cannot {action} '{name}' while transitioning to it"
            )));
        }
        Ok(())
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(name)
    }

    pub fn contains_scene(&self, name: &str) -> bool {
        self.scenes.contains_key(name)
    }

    /// Names in registration order
    pub fn scene_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.active.as_deref().and_then(|name| self.scenes.get(name))
    }

    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        let name = self.active.as_deref()?;
        self.scenes.get_mut(name)
    }

    pub fn active_scene_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn pending_scene_name(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn load_scene(&mut self, name: &str) -> Result<()> {
        let scene = self
            .scenes
            .get_mut(name)
            .ok_or_else(|| scene_not_found(name))?;
        if !scene.is_loaded() {
            scene.load()?;
            self.events.publish(SceneEvent::Loaded {
                scene: name.to_string(),
            });
        }
        Ok(())
    }

    /// Unload a dormant scene
    pub fn unload_scene(&mut self, name: &str) -> Result<()> {
        self.ensure_detached(name, "unload")?;
        let scene = self
            .scenes
            .get_mut(name)
            .ok_or_else(|| scene_not_found(name))?;
        if scene.is_loaded() {
            scene.unload()?;
            self.events.publish(SceneEvent::Unloaded {
                scene: name.to_string(),
            });
        }
        Ok(())
    }

    /// Switch to `name`. Returns `Ok(false)` without side effects when the
    /// scene is unknown, a transition is already running, or the scene is
    /// already active.
    pub fn change_scene(&mut self, name: &str, immediate: bool) -> Result<bool> {
        let Some(scene) = self.scenes.get(name) else {
            return Ok(false);
        };
        if self.is_transitioning() {
            return Ok(false);
        }
        if self.active.as_deref() == Some(name) && scene.is_active() {
            return Ok(false);
        }

        self.load_scene(name)?;
        self.events.publish(SceneEvent::TransitionStarted {
            from: self.active.clone(),
            to: name.to_string(),
        });

        if immediate {
            self.complete_transition(name.to_string())?;
        } else {
            info!(from = ?self.active, to = %name, "scene transition started");
            self.pending = Some(name.to_string());
            self.transition_progress = 0.0;
        }
        Ok(true)
    }

    /// Swap the active scene for `target`. The bookkeeping changes only once
    /// both hooks succeeded; on failure the previous scene stays active and
    /// the transition is dropped.
    fn complete_transition(&mut self, target: String) -> Result<()> {
        self.pending = None;
        self.transition_progress = 0.0;

        let previous = self.active.clone();
        if let Some(scene) = previous.as_deref().and_then(|n| self.scenes.get_mut(n)) {
            if let Err(err) = scene.deactivate() {
                warn!(scene = %scene.name(), error = %err, "scene transition aborted");
                return Err(err);
            }
        }

        let activated = match self.scenes.get_mut(&target) {
            Some(scene) => scene.activate(),
            None => Err(scene_not_found(&target)),
        };
        if let Err(err) = activated {
            warn!(scene = %target, error = %err, "scene transition aborted");
            self.reactivate_previous(previous);
            return Err(err);
        }
        self.active = Some(target.clone());

        info!(from = ?previous, to = %target, "scene transition completed");
        self.events.publish(SceneEvent::TransitionCompleted {
            from: previous,
            to: target,
        });
        Ok(())
    }

    fn reactivate_previous(&mut self, previous: Option<String>) {
        let Some(name) = previous else {
            return;
        };
        let restored = self
            .scenes
            .get_mut(&name)
            .map(|scene| scene.activate().map(|()| scene.is_active()));
        if !matches!(restored, Some(Ok(true))) {
            warn!(scene = %name, "previous scene could not be reactivated");
            self.active = None;
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.pending.is_some()
    }

    /// Progress of the running transition in `[0, 1]`
    pub fn transition_progress(&self) -> f32 {
        self.transition_progress
    }

    pub fn transition_duration(&self) -> f32 {
        self.transition_duration
    }

    /// Seconds; at least `MIN_TRANSITION_DURATION`
    pub fn set_transition_duration(&mut self, seconds: f32) {
        self.transition_duration = seconds.max(MIN_TRANSITION_DURATION);
    }

    pub fn is_fading(&self) -> bool {
        self.fading
    }

    pub fn set_fading(&mut self, fading: bool) {
        self.fading = fading;
    }

    pub fn set_update_enabled(&mut self, enabled: bool) {
        self.update_enabled = enabled;
    }

    pub fn set_update_order(&mut self, order: i32) {
        self.update_order = order;
    }

    pub fn subscribe(&mut self) -> Receiver<SceneEvent> {
        self.events.subscribe()
    }

    /// Update the active scene, then the pending one, then move the
    /// transition forward.
    pub fn update(&mut self, delta_time: f32) -> Result<()> {
        if !self.update_enabled {
            return Ok(());
        }

        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("scene_manager.update").entered();

        if let Some(scene) = self.active_scene_mut() {
            scene.update(delta_time)?;
        }

        let Some(pending) = self.pending.clone() else {
            return Ok(());
        };
        if let Some(scene) = self.scenes.get_mut(&pending) {
            scene.run_frame(delta_time)?;
        }
        self.transition_progress += delta_time / self.transition_duration;
        if self.transition_progress >= 1.0 {
            self.complete_transition(pending)?;
        }
        Ok(())
    }

    /// Draw one frame of the active scene. During a fading transition the outgoing scene
    /// fades out while the pending one fades in. Returns the number of
    /// renderables drawn.
    pub fn render(&mut self, surface: &mut dyn RenderSurface) -> Result<usize> {
        let progress = math::saturate(self.transition_progress);
        let fading = self.fading && self.is_transitioning();
        let mut drawn = 0;

        surface.begin_frame(Color::BLACK);
        if let Some(name) = self.active.clone() {
            if let Some(scene) = self.scenes.get_mut(&name) {
                surface.set_opacity(if fading { 1.0 - progress } else { 1.0 });
                drawn += scene.render(surface)?;
            }
        }
        if fading {
            if let Some(name) = self.pending.clone() {
                if let Some(scene) = self.scenes.get_mut(&name) {
                    surface.set_opacity(progress);
                    drawn += scene.render(surface)?;
                }
            }
        }
        surface.set_opacity(1.0);
        surface.end_frame();
        Ok(drawn)
    }

    /// Registered scenes in registration order plus the active scene name
    pub fn snapshot(&self) -> SceneManagerData {
        SceneManagerData {
            active: self.active.clone(),
            scenes: self
                .order
                .iter()
                .filter_map(|name| self.scenes.get(name))
                .map(Scene::snapshot)
                .collect(),
        }
    }

    /// Restore from a snapshot. Registered scenes keep their hooks and take
    /// the recorded contents; unknown scenes are registered without hooks.
    /// Any running transition is cancelled.
    pub fn restore(&mut self, data: SceneManagerData) -> Result<()> {
        self.pending = None;
        self.transition_progress = 0.0;

        for scene_data in data.scenes {
            match self.scenes.get_mut(&scene_data.name) {
                Some(scene) => scene.restore(scene_data)?,
                None => self.register_scene(Scene::from_snapshot(scene_data)?)?,
            }
        }

        self.active = data.active.filter(|name| self.scenes.contains_key(name));
        for name in &self.order {
            let Some(scene) = self.scenes.get_mut(name) else {
                continue;
            };
            if self.active.as_deref() == Some(name.as_str()) {
                scene.activate()?;
            } else {
                scene.deactivate()?;
            }
        }
        Ok(())
    }
}

fn scene_not_found(name: &str) -> EngineError {
    EngineError::NotFound(format!("scene '{name}'"))
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Updatable for SceneManager {
    fn update_order(&self) -> i32 {
        self.update_order
    }

    fn is_update_enabled(&self) -> bool {
        self.update_enabled
    }

    fn update(&mut self, delta_time: f32) -> Result<()> {
        SceneManager::update(self, delta_time)
    }
}

impl fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneManager")
            .field("scenes", &self.order)
            .field("active", &self.active)
            .field("pending", &self.pending)
            .field("transition_progress", &self.transition_progress)
            .field("transition_duration", &self.transition_duration)
            .field("fading", &self.fading)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneHooks;
    use crate::world::World;

    fn manager_with(names: &[&str]) -> Result<SceneManager> {
        let mut manager = SceneManager::new();
        for name in names {
            manager.register_scene(Scene::new(*name))?;
        }
        Ok(manager)
    }

    #[test]
    fn test_register_rejects_duplicates() -> Result<()> {
        let mut manager = manager_with(&["a"])?;
        assert!(matches!(
            manager.register_scene(Scene::new("a")),
            Err(EngineError::InvalidState(_))
        ));
        assert_eq!(manager.scene_count(), 1);
        Ok(())
    }

    #[test]
    fn test_immediate_change_emits_both_events() -> Result<()> {
        let mut manager = manager_with(&["menu"])?;
        let events = manager.subscribe();

        assert!(manager.change_scene("menu", true)?);
        assert_eq!(manager.active_scene_name(), Some("menu"));
        assert!(manager.scene("menu").unwrap().is_active());

        let kinds: Vec<_> = events.try_iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, vec!["Loaded", "TransitionStarted", "TransitionCompleted"]);

        assert!(!manager.change_scene("menu", true)?);
        assert!(!manager.change_scene("missing", true)?);
        Ok(())
    }

    #[test]
    fn test_deferred_change_completes_after_duration() -> Result<()> {
        let mut manager = manager_with(&["a", "b"])?;
        manager.change_scene("a", true)?;
        manager.set_transition_duration(0.5);

        assert!(manager.change_scene("b", false)?);
        assert!(manager.is_transitioning());
        assert!(!manager.change_scene("a", false)?);

        manager.update(0.3)?;
        assert_eq!(manager.active_scene_name(), Some("a"));
        assert!((manager.transition_progress() - 0.6).abs() < 1e-5);

        manager.update(0.3)?;
        assert!(!manager.is_transitioning());
        assert_eq!(manager.active_scene_name(), Some("b"));
        assert!(!manager.scene("a").unwrap().is_active());
        assert!(manager.scene("a").unwrap().is_loaded());
        Ok(())
    }

    #[test]
    fn test_active_and_pending_scenes_are_protected() -> Result<()> {
        let mut manager = manager_with(&["a", "b", "c"])?;
        manager.change_scene("a", true)?;
        manager.change_scene("b", false)?;

        assert!(matches!(manager.unload_scene("a"), Err(EngineError::InvalidState(_))));
        assert!(matches!(manager.unregister_scene("b"), Err(EngineError::InvalidState(_))));
        assert!(matches!(manager.unload_scene("zzz"), Err(EngineError::NotFound(_))));

        manager.load_scene("c")?;
        manager.unload_scene("c")?;
        let removed = manager.unregister_scene("c")?;
        assert!(!removed.is_loaded());
        assert_eq!(manager.scene_names().collect::<Vec<_>>(), vec!["a", "b"]);
        Ok(())
    }

    struct Refuse {
        deactivate: bool,
        activate: bool,
    }

    impl SceneHooks for Refuse {
        fn on_activate(&mut self, _world: &mut World) -> Result<()> {
            if self.activate {
                return Err(EngineError::InvalidState("activate refused".into()));
            }
            Ok(())
        }

        fn on_deactivate(&mut self, _world: &mut World) -> Result<()> {
            if self.deactivate {
                return Err(EngineError::InvalidState("deactivate refused".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_failed_deactivate_keeps_previous_scene() -> Result<()> {
        let mut manager = SceneManager::new();
        manager.register_scene(Scene::with_hooks(
            "a",
            Refuse {
                deactivate: true,
                activate: false,
            },
        ))?;
        manager.register_scene(Scene::new("b"))?;
        manager.change_scene("a", true)?;
        let events = manager.subscribe();

        assert!(manager.change_scene("b", true).is_err());
        assert_eq!(manager.active_scene_name(), Some("a"));
        assert!(manager.scene("a").unwrap().is_active());
        assert!(!manager.scene("b").unwrap().is_active());
        assert!(!manager.is_transitioning());
        assert!(matches!(manager.unload_scene("a"), Err(EngineError::InvalidState(_))));

        let kinds: Vec<_> = events.try_iter().map(|e| e.event_type()).collect();
        assert!(!kinds.contains(&"TransitionCompleted"));
        Ok(())
    }

    #[test]
    fn test_failed_activate_restores_previous_scene() -> Result<()> {
        let mut manager = manager_with(&["a"])?;
        manager.register_scene(Scene::with_hooks(
            "b",
            Refuse {
                deactivate: false,
                activate: true,
            },
        ))?;
        manager.change_scene("a", true)?;
        manager.set_transition_duration(0.1);
        assert!(manager.change_scene("b", false)?);

        assert!(manager.update(0.2).is_err());
        assert!(!manager.is_transitioning());
        assert_eq!(manager.active_scene_name(), Some("a"));
        assert!(manager.scene("a").unwrap().is_active());
        assert!(!manager.scene("b").unwrap().is_active());
        Ok(())
    }

    #[test]
    fn test_duration_has_a_floor() {
        let mut manager = SceneManager::new();
        manager.set_transition_duration(0.0);
        assert_eq!(manager.transition_duration(), MIN_TRANSITION_DURATION);
    }

    #[test]
    fn test_disabled_manager_does_not_progress() -> Result<()> {
        let mut manager = manager_with(&["a", "b"])?;
        manager.change_scene("b", false)?;
        manager.set_update_enabled(false);
        manager.update(10.0)?;
        assert!(manager.is_transitioning());
        assert_eq!(manager.transition_progress(), 0.0);
        Ok(())
    }
}
