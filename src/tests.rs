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

//! Cross-module tests: systems, deferred mutation and the loop driving worlds

#[cfg(test)]
mod tests {
    #![allow(clippy::module_inception)]
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::builtin::transform::Transform2D;
    use crate::component::{Component, ComponentExt, ComponentHeader, ComponentSet};
    use crate::entity::EntityId;
    use crate::game_loop::{GameLoop, SharedUpdatable};
    use crate::impl_component_header;
    use crate::math::Vec2;
    use crate::scene::Scene;
    use crate::scene_manager::SceneManager;
    use crate::system::System;
    use crate::time::ManualClock;
    use crate::world::World;
    use crate::Result;

    #[derive(Default)]
    struct Marker {
        header: ComponentHeader,
        events: Vec<&'static str>,
    }

    impl Component for Marker {
        impl_component_header!(header);

        fn on_initialize(&mut self) {
            self.events.push("initialize");
        }

        fn on_cleanup(&mut self) {
            self.events.push("cleanup");
        }

        fn on_entity_activated(&mut self) {
            self.events.push("activated");
        }

        fn on_entity_deactivated(&mut self) {
            self.events.push("deactivated");
        }
    }

    #[derive(Default)]
    struct Tag {
        header: ComponentHeader,
    }

    impl Component for Tag {
        impl_component_header!(header);
    }

    /// Destroys every member on its first frame
    struct Reaper {
        done: bool,
    }

    impl System for Reaper {
        fn name(&self) -> &str {
            "reaper"
        }

        fn requirements(&self) -> ComponentSet {
            ComponentSet::new().with::<Marker>()
        }

        fn update(&mut self, world: &mut World, entities: &[EntityId], _: f32) -> Result<()> {
            if !self.done {
                for id in entities {
                    world.destroy_entity(*id);
                }
                self.done = true;
            }
            Ok(())
        }
    }

    /// Records what it is handed each frame
    struct Witness {
        frames: Arc<Mutex<Vec<Vec<EntityId>>>>,
        requirement: ComponentSet,
    }

    impl System for Witness {
        fn name(&self) -> &str {
            "witness"
        }

        fn requirements(&self) -> ComponentSet {
            self.requirement.clone()
        }

        fn update_order(&self) -> i32 {
            10
        }

        fn update(&mut self, world: &mut World, entities: &[EntityId], _: f32) -> Result<()> {
            // Every entity handed out is still reachable during the pass
            assert!(entities.iter().all(|id| world.contains_entity(*id)));
            self.frames.lock().push(entities.to_vec());
            Ok(())
        }
    }

    /// Tags every member; membership in `Witness<Tag>` must wait for the pass
    struct Tagger;

    impl System for Tagger {
        fn name(&self) -> &str {
            "tagger"
        }

        fn requirements(&self) -> ComponentSet {
            ComponentSet::new().with::<Marker>()
        }

        fn update(&mut self, world: &mut World, entities: &[EntityId], _: f32) -> Result<()> {
            for id in entities {
                if !world.has_component::<Tag>(*id) {
                    world.add_component(*id, Tag::default())?;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_destroyed_entity_survives_the_current_pass() -> Result<()> {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let mut world = World::new();
        world.add_system(Reaper { done: false })?;
        world.add_system(Witness {
            frames: frames.clone(),
            requirement: ComponentSet::new().with::<Marker>(),
        })?;
        let doomed = world.spawn("doomed", (Marker::default(),))?;

        world.update(0.016)?;
        assert!(!world.contains_entity(doomed));
        world.update(0.016)?;

        assert_eq!(*frames.lock(), vec![vec![doomed], vec![]]);
        Ok(())
    }

    #[test]
    fn test_component_added_mid_pass_joins_next_frame() -> Result<()> {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let mut world = World::new();
        world.add_system(Tagger)?;
        let witness = world.add_system(Witness {
            frames: frames.clone(),
            requirement: ComponentSet::new().with::<Tag>(),
        })?;
        let id = world.spawn("e", (Marker::default(),))?;

        world.update(0.016)?;
        assert_eq!(world.system_entities(witness), Some(&[id][..]));
        world.update(0.016)?;

        assert_eq!(*frames.lock(), vec![vec![], vec![id]]);
        Ok(())
    }

    #[test]
    fn test_component_lifecycle_hooks() -> Result<()> {
        let mut world = World::new();
        let id = world.spawn("e", (Marker::default(),))?;
        world.entity_mut(id)?.set_active(false).set_active(true);

        let marker = world.take_component::<Marker>(id).unwrap();
        assert_eq!(
            marker.events,
            vec!["initialize", "deactivated", "activated", "cleanup"]
        );
        assert_eq!(marker.owner(), None);
        assert!(!marker.is_initialized());
        Ok(())
    }

    #[test]
    fn test_same_name_entities_have_increasing_ids() {
        let mut world = World::new();
        let a = world.create_entity("twin");
        let b = world.create_entity("twin");
        assert!(b.raw() > a.raw());
        assert_eq!(world.find_entities_by_name("twin"), vec![a, b]);
    }

    #[test]
    fn test_game_loop_drives_shared_world() -> Result<()> {
        let clock = Arc::new(ManualClock::new());
        let game_loop = GameLoop::with_clock(clock.clone());

        let mut world = World::new();
        let id = world.spawn("mover", (Transform2D::new(),))?;
        let world = world.into_shared();
        let updatable: SharedUpdatable = world.clone();
        game_loop.add_updatable(updatable);

        let witness_frames = Arc::new(Mutex::new(Vec::new()));
        world.lock().add_system(Witness {
            frames: witness_frames.clone(),
            requirement: ComponentSet::new().with::<Transform2D>(),
        })?;

        game_loop.do_frame()?;
        clock.advance_secs(0.02);
        game_loop.do_frame()?;
        assert_eq!(*witness_frames.lock(), vec![vec![id], vec![id]]);

        world.lock().transform_mut(id)?.translate(Vec2::new(1.0, 1.0));
        assert_eq!(world.lock().world_position(id)?, Vec2::ONE);
        Ok(())
    }

    #[test]
    fn test_game_loop_completes_scene_transition() -> Result<()> {
        let clock = Arc::new(ManualClock::new());
        let game_loop = GameLoop::with_clock(clock.clone());

        let mut manager = SceneManager::new();
        manager.register_scene(Scene::new("title"))?;
        manager.register_scene(Scene::new("level"))?;
        manager.change_scene("title", true)?;
        manager.set_transition_duration(0.1);
        manager.change_scene("level", false)?;

        let manager = Arc::new(Mutex::new(manager));
        let updatable: SharedUpdatable = manager.clone();
        game_loop.add_updatable(updatable);

        // First frame is a nominal 1/60 s
        game_loop.do_frame()?;
        assert!(manager.lock().is_transitioning());
        for _ in 0..2 {
            clock.advance_secs(0.05);
            game_loop.do_frame()?;
        }
        let manager = manager.lock();
        assert!(!manager.is_transitioning());
        assert_eq!(manager.active_scene_name(), Some("level"));
        Ok(())
    }
}
