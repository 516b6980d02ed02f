use engine2d_core::prelude::*;

#[derive(Default)]
struct Health {
    header: engine2d_core::ComponentHeader,
    hp: i32,
}

impl Component for Health {
    impl_component_header!(header);
}

/// Destroys entities that ran out of health and spawns a replacement
struct Reaper;

impl System for Reaper {
    fn name(&self) -> &str {
        "Reaper"
    }

    fn requirements(&self) -> ComponentSet {
        ComponentSet::new().with::<Health>()
    }

    fn update(&mut self, world: &mut World, entities: &[EntityId], _delta_time: f32) -> Result<()> {
        for &id in entities {
            let dead = world.get_component::<Health>(id).is_some_and(|h| h.hp <= 0);
            if dead {
                world.destroy_entity(id);
                world.spawn("respawned", (Health { hp: 10, ..Default::default() },))?;
            }
        }
        Ok(())
    }
}

/// Counts members handed out per frame
struct Census {
    seen: Vec<usize>,
}

impl System for Census {
    fn name(&self) -> &str {
        "Census"
    }

    fn requirements(&self) -> ComponentSet {
        ComponentSet::new().with::<Health>()
    }

    fn update_order(&self) -> i32 {
        100
    }

    fn update(
        &mut self,
        _world: &mut World,
        entities: &[EntityId],
        _delta_time: f32,
    ) -> Result<()> {
        self.seen.push(entities.len());
        Ok(())
    }
}

#[test]
fn test_structural_changes_apply_after_the_pass() -> Result<()> {
    let mut world = World::with_name("arena");
    world.add_system(Reaper)?;
    world.add_system(Census { seen: Vec::new() })?;

    let dead = world.spawn("dead", (Health { hp: 0, ..Default::default() },))?;
    world.spawn("alive", (Health { hp: 5, ..Default::default() },))?;

    world.update(0.016)?;
    assert!(!world.contains_entity(dead));
    assert!(world.find_entity_by_name("respawned").is_some());
    assert_eq!(world.pending_commands(), 0);

    world.update(0.016)?;
    // Frame one still sees the doomed entity; frame two sees the replacement
    assert_eq!(world.get_system::<Census>().unwrap().seen, vec![2, 2]);
    Ok(())
}

#[test]
fn test_systems_cannot_be_added_during_update() -> Result<()> {
    struct Greedy;

    impl System for Greedy {
        fn name(&self) -> &str {
            "Greedy"
        }

        fn update(&mut self, world: &mut World, _: &[EntityId], _: f32) -> Result<()> {
            assert!(matches!(
                world.add_system(Census { seen: Vec::new() }),
                Err(EngineError::InvalidState(_))
            ));
            Ok(())
        }
    }

    let mut world = World::new();
    world.add_system(Greedy)?;
    world.update(0.016)?;
    assert_eq!(world.system_count(), 1);
    Ok(())
}

#[test]
fn test_duplicate_component_is_rejected() -> Result<()> {
    let mut world = World::new();
    let id = world.spawn("e", (Health::default(),))?;
    assert_eq!(
        world.add_component(id, Health::default()),
        Err(EngineError::DuplicateComponent("Health"))
    );
    assert!(world.remove_component::<Health>(id));
    world.add_component(id, Health::default())?;
    assert!(world.has_component::<Health>(id));
    Ok(())
}
