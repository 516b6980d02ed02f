use engine2d_core::prelude::*;
use engine2d_core::ComponentData;

fn build_world() -> Result<World> {
    let mut world = World::with_name("stage");
    let ship = world.spawn(
        "ship",
        (
            Transform2D::from_position(Vec2::new(50.0, 60.0)),
            Sprite::with_texture("ship.png").on_layer(RenderLayer::Foreground, 3),
        ),
    )?;
    let turret = world.spawn("turret", (Transform2D::from_position(Vec2::new(0.0, -8.0)),))?;
    world.set_parent(turret, Some(ship))?;

    let mut camera = Camera2D::new();
    camera.set_target(Some(ship));
    camera.set_zoom(2.0);
    world.spawn("camera", (camera,))?;
    Ok(world)
}

#[test]
fn test_references_are_relinked_to_new_ids() -> Result<()> {
    let original = build_world()?;
    let json = original.snapshot().to_json()?;

    let mut restored = World::new();
    restored.add_system(CameraFollowSystem)?;
    restored.load_snapshot(WorldData::from_json(&json)?)?;

    let ship = restored.find_entity_by_name("ship").unwrap();
    let turret = restored.find_entity_by_name("turret").unwrap();
    let camera = restored.find_entity_by_name("camera").unwrap();
    assert_ne!(Some(ship), original.find_entity_by_name("ship"));

    assert_eq!(restored.get_component::<Transform2D>(turret).unwrap().parent(), Some(ship));
    assert_eq!(restored.get_component::<Camera2D>(camera).unwrap().target(), Some(ship));
    assert_eq!(restored.get_component::<Camera2D>(camera).unwrap().zoom(), 2.0);
    assert_eq!(restored.world_position(turret)?, Vec2::new(50.0, 52.0));

    let sprite = restored.get_component::<Sprite>(ship).unwrap();
    assert_eq!(sprite.texture.as_deref(), Some("ship.png"));
    assert_eq!(sprite.layer, RenderLayer::Foreground);
    assert_eq!(sprite.order, 3);

    // Systems survive the reload and pick up the new camera
    assert_eq!(restored.system_count(), 1);
    assert_eq!(restored.main_camera(), Some(camera));
    Ok(())
}

#[test]
fn test_binary_snapshot_file() -> Result<()> {
    let world = build_world()?;
    let path = std::env::temp_dir().join(format!("engine2d-world-{}.bin", std::process::id()));
    world.snapshot().save_to_file(&path)?;
    let data = WorldData::load_from_file(&path)?;
    std::fs::remove_file(&path)?;

    assert_eq!(data, world.snapshot());
    let kinds: Vec<&str> = data.entities[0]
        .components
        .iter()
        .map(ComponentData::type_name)
        .collect();
    assert_eq!(kinds, vec!["Transform2D", "Sprite"]);
    Ok(())
}

#[test]
fn test_missing_target_is_dropped() -> Result<()> {
    let world = build_world()?;
    let mut data = world.snapshot();
    data.entities.retain(|e| e.name != "ship");

    let restored = World::from_snapshot(data)?;
    let camera = restored.find_entity_by_name("camera").unwrap();
    let turret = restored.find_entity_by_name("turret").unwrap();
    assert_eq!(restored.get_component::<Camera2D>(camera).unwrap().target(), None);
    assert_eq!(restored.get_component::<Transform2D>(turret).unwrap().parent(), None);
    Ok(())
}
