use std::sync::Arc;

use engine2d_core::prelude::*;
use parking_lot::Mutex;

#[derive(Default)]
struct Counter {
    updates: Arc<Mutex<u32>>,
}

impl SceneHooks for Counter {
    fn on_load(&mut self, world: &mut World) -> Result<()> {
        world.spawn("camera", (Camera2D::new(),))?;
        Ok(())
    }

    fn on_update(&mut self, _world: &mut World, _delta_time: f32) -> Result<()> {
        *self.updates.lock() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct Surface {
    opacities: Vec<f32>,
}

impl RenderSurface for Surface {
    fn set_view(&mut self, _view: Affine2) {}

    fn set_opacity(&mut self, opacity: f32) {
        self.opacities.push(opacity);
    }

    fn draw_sprite(&mut self, _sprite: &SpriteDraw<'_>) {}
}

#[test]
fn test_deferred_transition_timeline() -> Result<()> {
    let title_updates = Arc::new(Mutex::new(0));
    let level_updates = Arc::new(Mutex::new(0));

    let mut manager = SceneManager::new();
    manager.register_scene(Scene::with_hooks("title", Counter { updates: title_updates.clone() }))?;
    manager.register_scene(Scene::with_hooks("level", Counter { updates: level_updates.clone() }))?;
    manager.register_scene(Scene::new("credits"))?;
    let events = manager.subscribe();

    manager.change_scene("title", true)?;
    manager.set_transition_duration(1.0);
    assert!(manager.change_scene("level", false)?);

    for _ in 0..3 {
        manager.update(0.25)?;
    }
    assert_eq!(manager.active_scene_name(), Some("title"));
    assert!(manager.is_transitioning());
    assert!(manager.scene("level").unwrap().is_loaded());

    manager.update(0.25)?;
    assert_eq!(manager.active_scene_name(), Some("level"));
    assert!(!manager.scene("title").unwrap().is_active());

    // The credits scene never loaded and never ran
    assert_eq!(manager.scene("credits").unwrap().state(), SceneState::Unloaded);
    assert_eq!(*title_updates.lock(), 4);
    assert_eq!(*level_updates.lock(), 4);

    let received: Vec<SceneEvent> = events.try_iter().collect();
    assert_eq!(
        received.last(),
        Some(&SceneEvent::TransitionCompleted {
            from: Some("title".into()),
            to: "level".into(),
        })
    );
    Ok(())
}

#[test]
fn test_fading_render_cross_fades() -> Result<()> {
    let mut manager = SceneManager::new();
    manager.register_scene(Scene::with_hooks("a", Counter::default()))?;
    manager.register_scene(Scene::with_hooks("b", Counter::default()))?;
    manager.change_scene("a", true)?;
    manager.set_transition_duration(1.0);
    manager.set_fading(true);
    manager.change_scene("b", false)?;
    manager.update(0.25)?;

    let mut surface = Surface::default();
    manager.render(&mut surface)?;
    assert_eq!(surface.opacities, vec![0.75, 0.25, 1.0]);

    manager.set_fading(false);
    let mut surface = Surface::default();
    manager.render(&mut surface)?;
    assert_eq!(surface.opacities, vec![1.0, 1.0]);
    Ok(())
}

#[test]
fn test_snapshot_restores_active_scene() -> Result<()> {
    let mut manager = SceneManager::new();
    let mut level = Scene::new("level");
    level.set_data("score", 1200)?;
    level.world_mut().spawn("player", (Transform2D::from_position(Vec2::new(3.0, 4.0)),))?;
    manager.register_scene(level)?;
    manager.register_scene(Scene::new("menu"))?;
    manager.change_scene("level", true)?;

    let bytes = manager.snapshot().to_bytes()?;

    let mut restored = SceneManager::new();
    restored.restore(engine2d_core::SceneManagerData::from_bytes(&bytes)?)?;
    assert_eq!(restored.active_scene_name(), Some("level"));
    assert_eq!(restored.scene_names().collect::<Vec<_>>(), vec!["level", "menu"]);

    let level = restored.active_scene_mut().unwrap();
    assert_eq!(level.data::<i32>("score"), Some(1200));
    let player = level.world().find_entity_by_name("player").unwrap();
    assert_eq!(level.world_mut().world_position(player)?, Vec2::new(3.0, 4.0));
    Ok(())
}
