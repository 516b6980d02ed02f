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

//! World: entity registry, system list and deferred structural mutation
//!
//! Systems run serially in ascending `update_order`. While they run, the
//! system list is moved out of the world and every structural change is
//! routed through the [`CommandBuffer`], so no system ever observes an entity
//! vanishing or appearing mid-iteration. The buffer is applied as soon as the
//! last system returns.
//!
//! Sharing a world between threads goes through [`SharedWorld`]; the mutex is
//! the world's single mutation lock.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::command::{Command, CommandBuffer};
use crate::component::{Bundle, Component};
use crate::entity::{Entity, EntityId};
use crate::error::{EngineError, Result};
use crate::game_loop::Updatable;
use crate::system::{BoxedSystem, System, SystemEntry, SystemId};
use crate::utils::next_id;

/// Identifies a world instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(u64);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "World({})", self.0)
    }
}

/// World guarded by its mutation lock
pub type SharedWorld = Arc<Mutex<World>>;

/// World - central entity and system storage
pub struct World {
    id: WorldId,
    name: String,
    enabled: bool,
    update_order: i32,
    /// Registered entities plus those waiting for registration
    entities: AHashMap<EntityId, Entity>,
    /// Registered entities in registration order
    order: Vec<EntityId>,
    /// Sorted by `update_order`, stable for equal priorities
    systems: Vec<SystemEntry>,
    commands: CommandBuffer,
    updating: bool,
}

impl World {
    /// Create new empty world
    pub fn new() -> Self {
        Self::with_name("World")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            id: WorldId(next_id()),
            name: name.into(),
            enabled: true,
            update_order: 0,
            entities: AHashMap::new(),
            order: Vec::new(),
            systems: Vec::new(),
            commands: CommandBuffer::new(),
            updating: false,
        }
    }

    /// Wrap in the shared handle used by the game loop
    pub fn into_shared(self) -> SharedWorld {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// A disabled world skips its update
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn update_order(&self) -> i32 {
        self.update_order
    }

    pub fn set_update_order(&mut self, order: i32) {
        self.update_order = order;
    }

    /// True while systems are running
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Number of structural changes waiting for the end of the update pass
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    // ---------------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------------

    /// Create an entity. During an update its registration is deferred, but
    /// it can be looked up and given components straight away.
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        self.insert_entity(Entity::new(name))
    }

    /// Create an entity with a bundle of components
    pub fn spawn<B: Bundle>(&mut self, name: impl Into<String>, bundle: B) -> Result<EntityId> {
        let mut entity = Entity::new(name);
        bundle.insert_into(&mut entity)?;
        Ok(self.insert_entity(entity))
    }

    /// Register an entity built outside the world
    pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId> {
        if let Some(owner) = entity.world() {
            return Err(EngineError::InvalidState(format!(
                "{} already belongs to {owner}",
                entity.id()
            )));
        }
        if self.entities.contains_key(&entity.id()) {
            return Err(EngineError::InvalidState(format!(
                "{} is already registered with '{}'",
                entity.id(),
                self.name
            )));
        }
        Ok(self.insert_entity(entity))
    }

    fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        self.entities.insert(id, entity);
        if self.updating {
            self.commands.push(Command::Register(id));
        } else {
            self.register_pending(id);
        }
        id
    }

    /// Destroy an entity. Returns false if it does not belong to this world.
    /// During an update the removal is queued and the entity stays visible to
    /// systems until the pass completes.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        if !self.entities.contains_key(&id) {
            return false;
        }
        if self.updating {
            self.commands.push(Command::Destroy(id));
        } else {
            self.destroy_immediate(id);
        }
        true
    }

    /// Detach an entity without destroying it, e.g. to move it to another world
    pub fn take_entity(&mut self, id: EntityId) -> Result<Entity> {
        if self.updating {
            return Err(EngineError::InvalidState(format!(
                "cannot take {id} while '{}' is updating",
                self.name
            )));
        }
        self.destroy_immediate(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Remove every entity
    pub fn clear_entities(&mut self) -> Result<()> {
        if self.updating {
            return Err(EngineError::InvalidState(format!(
                "cannot clear '{}' while it is updating",
                self.name
            )));
        }
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            self.destroy_immediate(id);
        }
        Ok(())
    }

    pub(crate) fn register_pending(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if entity.world.is_some() {
            return;
        }
        entity.world = Some(self.id);
        self.order.push(id);
        for entry in self.systems.iter_mut() {
            entry.refresh(entity);
        }
    }

    pub(crate) fn destroy_immediate(&mut self, id: EntityId) -> Option<Entity> {
        let mut entity = self.entities.remove(&id)?;
        for entry in self.systems.iter_mut() {
            entry.evict(id);
        }
        self.order.retain(|e| *e != id);
        entity.world = None;
        Some(entity)
    }

    /// Registered or awaiting registration
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn is_registered(&self, id: EntityId) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|e| e.world == Some(self.id))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable access that keeps systems informed of component changes
    pub fn entity_mut(&mut self, id: EntityId) -> Result<EntityMut<'_>> {
        if !self.entities.contains_key(&id) {
            return Err(EngineError::NotFound(id.to_string()));
        }
        Ok(EntityMut { world: self, id })
    }

    /// Registered entities in registration order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Every stored entity, including ones awaiting registration
    pub(crate) fn stored_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn entity_ids(&self) -> &[EntityId] {
        &self.order
    }

    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    pub fn find_entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities().find(|e| e.name() == name).map(|e| e.id())
    }

    pub fn find_entities_by_name(&self, name: &str) -> Vec<EntityId> {
        self.entities()
            .filter(|e| e.name() == name)
            .map(|e| e.id())
            .collect()
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    pub fn add_component<T: Component>(&mut self, id: EntityId, component: T) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        entity.add_component(component)?;
        self.component_changed(id);
        Ok(())
    }

    /// Returns whether a component was present
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> bool {
        self.take_component::<T>(id).is_some()
    }

    pub fn take_component<T: Component>(&mut self, id: EntityId) -> Option<T> {
        let component = self.entities.get_mut(&id)?.take_component::<T>()?;
        self.component_changed(id);
        Some(component)
    }

    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id)?.get_component::<T>()
    }

    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id)?.get_component_mut::<T>()
    }

    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|e| e.has_component::<T>())
    }

    fn component_changed(&mut self, id: EntityId) {
        if !self.is_registered(id) {
            // Pending entities are matched against systems on registration
            return;
        }
        if self.updating {
            self.commands.push(Command::Refresh(id));
        } else {
            self.refresh_membership(id);
        }
    }

    pub(crate) fn refresh_membership(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(&id) else {
            return;
        };
        if entity.world != Some(self.id) {
            return;
        }
        for entry in self.systems.iter_mut() {
            entry.refresh(entity);
        }
    }

    // ---------------------------------------------------------------------
    // Systems
    // ---------------------------------------------------------------------

    pub fn add_system<S: System>(&mut self, system: S) -> Result<SystemId> {
        self.add_boxed_system(Box::new(system))
    }

    /// Register a system; every existing entity is tested against its
    /// requirements. Fails with `InvalidState` during an update.
    pub fn add_boxed_system(&mut self, system: BoxedSystem) -> Result<SystemId> {
        if self.updating {
            return Err(EngineError::InvalidState(format!(
                "cannot add system '{}' while '{}' is updating",
                system.name(),
                self.name
            )));
        }

        let mut entry = SystemEntry::new(system);
        for id in &self.order {
            if let Some(entity) = self.entities.get(id) {
                entry.refresh(entity);
            }
        }

        let id = entry.id;
        debug!(
            world = %self.name,
            system = entry.system.name(),
            order = entry.update_order,
            matched = entry.entities.len(),
            "system added"
        );
        let index = self
            .systems
            .partition_point(|e| e.update_order <= entry.update_order);
        self.systems.insert(index, entry);
        Ok(id)
    }

    pub fn remove_system(&mut self, id: SystemId) -> Result<BoxedSystem> {
        if self.updating {
            return Err(EngineError::InvalidState(format!(
                "cannot remove {id} while '{}' is updating",
                self.name
            )));
        }
        let index = self
            .systems
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        Ok(self.systems.remove(index).system)
    }

    /// First system of type `T`. Systems are checked out while the world is
    /// updating, so this returns `None` from inside a system.
    pub fn get_system<T: System>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|e| e.as_dyn().as_any().downcast_ref::<T>())
    }

    pub fn get_system_mut<T: System>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|e| e.as_dyn_mut().as_any_mut().downcast_mut::<T>())
    }

    pub fn find_system<T: System>(&self) -> Option<SystemId> {
        self.systems
            .iter()
            .find(|e| e.as_dyn().as_any().is::<T>())
            .map(|e| e.id)
    }

    /// Entities currently matching a system's requirements
    pub fn system_entities(&self, id: SystemId) -> Option<&[EntityId]> {
        self.systems
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.entities.as_slice())
    }

    pub fn set_system_enabled(&mut self, id: SystemId, enabled: bool) -> Result<()> {
        if self.updating {
            return Err(EngineError::InvalidState(format!(
                "cannot toggle {id} while '{}' is updating",
                self.name
            )));
        }
        let entry = self
            .systems
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        if entry.enabled != enabled {
            entry.enabled = enabled;
            if enabled {
                entry.system.on_enabled();
            } else {
                entry.system.on_disabled();
            }
        }
        Ok(())
    }

    pub fn is_system_enabled(&self, id: SystemId) -> Option<bool> {
        self.systems.iter().find(|e| e.id == id).map(|e| e.enabled)
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// System names in execution order
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|e| e.system.name()).collect()
    }

    // ---------------------------------------------------------------------
    // Update
    // ---------------------------------------------------------------------

    /// Run every enabled system once, in priority order, then apply the
    /// structural changes they requested.
    ///
    /// The first system error stops the pass; queued changes are still
    /// applied before the error is returned.
    pub fn update(&mut self, delta_time: f32) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.updating {
            return Err(EngineError::InvalidState(format!(
                "'{}' is already updating",
                self.name
            )));
        }

        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!(
            "world.update",
            world = %self.name,
            systems = self.systems.len(),
            entities = self.order.len()
        )
        .entered();

        let outcome = {
            let systems = std::mem::take(&mut self.systems);
            let mut pass = UpdatePass {
                world: &mut *self,
                systems,
            };
            pass.run(delta_time)
        };

        let mut commands = std::mem::take(&mut self.commands);
        commands.apply(self);
        self.commands = commands;

        outcome
    }
}

/// Holds the system list while it is checked out of the world. Dropping it
/// (including on unwind) hands the list back.
struct UpdatePass<'w> {
    world: &'w mut World,
    systems: Vec<SystemEntry>,
}

impl UpdatePass<'_> {
    fn run(&mut self, delta_time: f32) -> Result<()> {
        self.world.updating = true;
        for entry in self.systems.iter_mut() {
            if !entry.enabled {
                continue;
            }
            entry
                .system
                .update(self.world, entry.entities.as_slice(), delta_time)?;
        }
        Ok(())
    }
}

impl Drop for UpdatePass<'_> {
    fn drop(&mut self) {
        self.world.systems = std::mem::take(&mut self.systems);
        self.world.updating = false;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entities", &self.order.len())
            .field("systems", &self.systems)
            .field("updating", &self.updating)
            .finish()
    }
}

impl Updatable for World {
    fn update_order(&self) -> i32 {
        self.update_order
    }

    fn is_update_enabled(&self) -> bool {
        self.enabled
    }

    fn update(&mut self, delta_time: f32) -> Result<()> {
        World::update(self, delta_time)
    }
}

/// Mutable handle to one entity
pub struct EntityMut<'w> {
    world: &'w mut World,
    id: EntityId,
}

impl EntityMut<'_> {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.world.entity(self.id).map_or("", |e| e.name())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        if let Some(entity) = self.world.entities.get_mut(&self.id) {
            entity.set_name(name);
        }
        self
    }

    pub fn is_active(&self) -> bool {
        self.world.entity(self.id).is_some_and(|e| e.is_active())
    }

    pub fn set_active(&mut self, active: bool) -> &mut Self {
        if let Some(entity) = self.world.entities.get_mut(&self.id) {
            entity.set_active(active);
        }
        self
    }

    /// Attach a component and notify the world's systems
    pub fn add_component<T: Component>(&mut self, component: T) -> Result<&mut Self> {
        self.world.add_component(self.id, component)?;
        Ok(self)
    }

    pub fn remove_component<T: Component>(&mut self) -> bool {
        self.world.remove_component::<T>(self.id)
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.world.get_component::<T>(self.id)
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.world.get_component_mut::<T>(self.id)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.world.has_component::<T>(self.id)
    }

    pub fn destroy(self) -> bool {
        self.world.destroy_entity(self.id)
    }
}
