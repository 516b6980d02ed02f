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

//! Snapshots of worlds, scenes and the scene manager
//!
//! Snapshots are plain data: they serialize to JSON through `serde_json` and
//! to a compact little-endian binary form through `speedy`. Restoring is a
//! two-pass process. The first pass recreates every entity with a fresh id
//! and records the old-to-new mapping; the second pass resolves references
//! between entities (transform parents, camera targets) through that map.
//! A reference whose target is not part of the snapshot is dropped.

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use speedy::{LittleEndian, Readable, Writable};
use tracing::warn;

use crate::builtin::camera::Camera2D;
use crate::builtin::sprite::Sprite;
use crate::builtin::transform::Transform2D;
use crate::component::{Component, ComponentExt};
use crate::entity::{Entity, EntityId};
use crate::error::{EngineError, Result};
use crate::math::Vec2;
use crate::render::{Color, Rect, RenderLayer};
use crate::scene::SceneValue;
use crate::world::World;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct Vec2Data {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Vec2Data {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Vec2Data> for Vec2 {
    fn from(v: Vec2Data) -> Self {
        Vec2::new(v.x, v.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct RectData {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<Rect> for RectData {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

impl From<RectData> for Rect {
    fn from(r: RectData) -> Self {
        Rect::new(r.x, r.y, r.width, r.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Readable, Writable)]
pub struct ColorData {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Color> for ColorData {
    fn from(c: Color) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

impl From<ColorData> for Color {
    fn from(c: ColorData) -> Self {
        Color::rgba(c.r, c.g, c.b, c.a)
    }
}

/// `parent` holds the id the parent had when the snapshot was taken
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct TransformData {
    pub enabled: bool,
    pub position: Vec2Data,
    pub rotation: f32,
    pub scale: Vec2Data,
    pub parent: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct SpriteData {
    pub enabled: bool,
    pub texture: Option<String>,
    pub visible: bool,
    pub layer: i32,
    pub order: i32,
    pub origin: Vec2Data,
    pub scale: Vec2Data,
    pub rotation: f32,
    pub source: Option<RectData>,
    pub tint: ColorData,
    pub alpha: f32,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// `target` holds the id the followed entity had when the snapshot was taken
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct CameraData {
    pub enabled: bool,
    pub position: Vec2Data,
    pub rotation: f32,
    pub zoom: f32,
    pub origin: Vec2Data,
    pub viewport: Vec2Data,
    pub bounds: Option<RectData>,
    pub target: Option<u64>,
    pub damping: f32,
    pub follow_enabled: bool,
}

/// Serialized form of every built-in component
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub enum ComponentData {
    Transform2D(TransformData),
    Sprite(SpriteData),
    Camera2D(CameraData),
}

impl ComponentData {
    pub fn type_name(&self) -> &'static str {
        match self {
            ComponentData::Transform2D(_) => "Transform2D",
            ComponentData::Sprite(_) => "Sprite",
            ComponentData::Camera2D(_) => "Camera2D",
        }
    }

    /// Recreate the component on `entity`. Entity references are left unset;
    /// they are resolved once every entity of the snapshot exists.
    fn insert_into(&self, entity: &mut Entity) -> Result<()> {
        match self {
            ComponentData::Transform2D(data) => {
                let transform =
                    Transform2D::from_parts(data.position.into(), data.rotation, data.scale.into());
                entity.add_component(transform)?.set_enabled(data.enabled);
            }
            ComponentData::Sprite(data) => {
                let mut sprite = Sprite::new();
                sprite.texture = data.texture.clone();
                sprite.visible = data.visible;
                sprite.layer = RenderLayer::from_value(data.layer).unwrap_or_else(|| {
                    warn!(layer = data.layer, "unknown render layer, using default");
                    RenderLayer::Default
                });
                sprite.order = data.order;
                sprite.origin = data.origin.into();
                sprite.scale = data.scale.into();
                sprite.rotation = data.rotation;
                sprite.source = data.source.map(Into::into);
                sprite.tint = data.tint.into();
                sprite.set_alpha(data.alpha);
                sprite.flip_x = data.flip_x;
                sprite.flip_y = data.flip_y;
                entity.add_component(sprite)?.set_enabled(data.enabled);
            }
            ComponentData::Camera2D(data) => {
                let mut camera = Camera2D::with_viewport(data.viewport.into());
                camera.set_zoom(data.zoom);
                camera.set_rotation(data.rotation);
                camera.set_origin(data.origin.into());
                camera.set_bounds(data.bounds.map(Into::into));
                camera.set_position(data.position.into());
                camera.set_damping(data.damping);
                camera.set_follow_enabled(data.follow_enabled);
                entity.add_component(camera)?.set_enabled(data.enabled);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct EntityData {
    pub id: u64,
    pub name: String,
    pub active: bool,
    pub components: Vec<ComponentData>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct WorldData {
    pub name: String,
    pub enabled: bool,
    pub update_order: i32,
    pub entities: Vec<EntityData>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct SceneValueEntry {
    pub key: String,
    pub value: SceneValue,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct SceneData {
    pub name: String,
    pub loaded: bool,
    pub active: bool,
    pub values: Vec<SceneValueEntry>,
    pub world: WorldData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Readable, Writable)]
pub struct SceneManagerData {
    pub active: Option<String>,
    pub scenes: Vec<SceneData>,
}

/// Encoding helpers shared by every snapshot type
pub trait Snapshot:
    Serialize + DeserializeOwned + Writable<LittleEndian> + for<'a> Readable<'a, LittleEndian>
{
    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::SerializationError(e.to_string()))
    }

    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::DeserializationError(e.to_string()))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        <Self as Writable<LittleEndian>>::write_to_vec(self)
            .map_err(|e| EngineError::SerializationError(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        <Self as Readable<'_, LittleEndian>>::read_from_buffer(bytes)
            .map_err(|e| EngineError::DeserializationError(e.to_string()))
    }

    /// JSON when the file extension is `json`, binary otherwise
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if is_json(path) {
            fs::write(path, self.to_json()?)?;
        } else {
            fs::write(path, self.to_bytes()?)?;
        }
        Ok(())
    }

    fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if is_json(path) {
            Self::from_json(&fs::read_to_string(path)?)
        } else {
            Self::from_bytes(&fs::read(path)?)
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl Snapshot for EntityData {}
impl Snapshot for WorldData {}
impl Snapshot for SceneData {}
impl Snapshot for SceneManagerData {}

/// Old id (as recorded in the snapshot) to the id of the recreated entity
pub type IdMap = AHashMap<u64, EntityId>;

impl Entity {
    /// Components without a serialized form are skipped
    pub fn snapshot(&self) -> EntityData {
        EntityData {
            id: self.id().raw(),
            name: self.name().to_string(),
            active: self.is_active(),
            components: self
                .components()
                .filter_map(|c| c.snapshot())
                .collect(),
        }
    }
}

impl World {
    /// Capture registered entities in registration order. Systems are
    /// behaviour and are not part of the snapshot.
    pub fn snapshot(&self) -> WorldData {
        WorldData {
            name: self.name().to_string(),
            enabled: self.is_enabled(),
            update_order: self.update_order(),
            entities: self.entities().map(Entity::snapshot).collect(),
        }
    }

    /// Replace every entity with the snapshot's. Systems stay registered and
    /// pick up the new entities. Returns the id mapping.
    pub fn load_snapshot(&mut self, data: WorldData) -> Result<IdMap> {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("world.load_snapshot", world = %data.name).entered();

        if self.is_updating() {
            return Err(EngineError::InvalidState(format!(
                "cannot load a snapshot into '{}' while it is updating",
                self.name()
            )));
        }
        self.clear_entities()?;
        self.set_name(data.name);
        self.set_enabled(data.enabled);
        self.set_update_order(data.update_order);

        // Pass 1: recreate entities
        let mut ids = IdMap::with_capacity(data.entities.len());
        for entity_data in &data.entities {
            let mut entity = Entity::new(entity_data.name.clone());
            entity.set_active(entity_data.active);
            for component in &entity_data.components {
                component.insert_into(&mut entity)?;
            }
            let id = self.add_entity(entity)?;
            if ids.insert(entity_data.id, id).is_some() {
                warn!(id = entity_data.id, "duplicate entity id in snapshot");
            }
        }

        // Pass 2: resolve references
        for entity_data in &data.entities {
            let Some(&id) = ids.get(&entity_data.id) else {
                continue;
            };
            for component in &entity_data.components {
                match component {
                    ComponentData::Transform2D(TransformData {
                        parent: Some(old), ..
                    }) => match ids.get(old) {
                        Some(&parent) => {
                            if let Err(err) = self.set_parent(id, Some(parent)) {
                                warn!(entity = %id, %err, "dropping transform parent");
                            }
                        }
                        None => warn!(entity = %id, parent = old, "unresolved transform parent"),
                    },
                    ComponentData::Camera2D(CameraData {
                        target: Some(old), ..
                    }) => match ids.get(old) {
                        Some(&target) => {
                            if let Some(camera) = self.get_component_mut::<Camera2D>(id) {
                                camera.set_target(Some(target));
                            }
                        }
                        None => warn!(entity = %id, target = old, "unresolved camera target"),
                    },
                    _ => {}
                }
            }
        }
        Ok(ids)
    }

    pub fn from_snapshot(data: WorldData) -> Result<World> {
        let mut world = World::new();
        world.load_snapshot(data)?;
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_world() -> Result<(World, EntityId, EntityId)> {
        let mut world = World::with_name("sample");
        let parent = world.spawn(
            "parent",
            (Transform2D::from_position(Vec2::new(10.0, 0.0)),),
        )?;
        let child = world.spawn(
            "child",
            (
                Transform2D::from_position(Vec2::new(5.0, 0.0)),
                Sprite::with_texture("hero.png"),
            ),
        )?;
        world.set_parent(child, Some(parent))?;
        Ok((world, parent, child))
    }

    #[test]
    fn test_snapshot_captures_components() -> Result<()> {
        let (world, parent, child) = sample_world()?;
        let data = world.snapshot();
        assert_eq!(data.name, "sample");
        assert_eq!(data.entities.len(), 2);

        let child_data = &data.entities[1];
        assert_eq!(child_data.name, "child");
        assert_eq!(child_data.components.len(), 2);
        assert_eq!(child_data.components[1].type_name(), "Sprite");
        match &child_data.components[0] {
            ComponentData::Transform2D(t) => {
                assert_eq!(t.parent, Some(parent.raw()));
                assert_eq!(t.position, Vec2Data { x: 5.0, y: 0.0 });
            }
            other => panic!("unexpected component {other:?}"),
        }
        assert_ne!(parent, child);
        Ok(())
    }

    #[test]
    fn test_load_snapshot_relinks_parents() -> Result<()> {
        let (world, _, _) = sample_world()?;
        let data = world.snapshot();

        let mut restored = World::new();
        let ids = restored.load_snapshot(data.clone())?;
        assert_eq!(restored.name(), "sample");
        assert_eq!(restored.entity_count(), 2);

        let child = restored.find_entity_by_name("child").unwrap();
        let parent = restored.find_entity_by_name("parent").unwrap();
        assert_eq!(ids.get(&data.entities[1].id), Some(&child));
        assert_eq!(
            restored.get_component::<Transform2D>(child).unwrap().parent(),
            Some(parent)
        );
        assert_eq!(restored.world_position(child)?, Vec2::new(15.0, 0.0));
        Ok(())
    }

    #[test]
    fn test_unresolved_reference_is_dropped() -> Result<()> {
        let (world, _, _) = sample_world()?;
        let mut data = world.snapshot();
        data.entities.remove(0);

        let restored = World::from_snapshot(data)?;
        let child = restored.find_entity_by_name("child").unwrap();
        assert_eq!(restored.get_component::<Transform2D>(child).unwrap().parent(), None);
        Ok(())
    }

    #[test]
    fn test_json_and_binary_encodings() -> Result<()> {
        let (world, _, _) = sample_world()?;
        let data = world.snapshot();

        let json = data.to_json()?;
        assert!(json.contains("hero.png"));
        assert_eq!(WorldData::from_json(&json)?, data);

        let bytes = data.to_bytes()?;
        assert_eq!(WorldData::from_bytes(&bytes)?, data);

        assert!(matches!(
            WorldData::from_json("{ not json"),
            Err(EngineError::DeserializationError(_))
        ));
        Ok(())
    }

    #[test]
    fn test_disabled_component_stays_disabled() -> Result<()> {
        let mut world = World::new();
        let id = world.spawn("ghost", (Sprite::new(),))?;
        world.get_component_mut::<Sprite>(id).unwrap().set_enabled(false);

        let restored = World::from_snapshot(world.snapshot())?;
        let id = restored.find_entity_by_name("ghost").unwrap();
        let sprite = restored.get_component::<Sprite>(id).unwrap();
        assert!(!sprite.is_enabled());
        assert!(sprite.is_initialized());
        assert_eq!(sprite.type_name(), "Sprite");
        Ok(())
    }
}
