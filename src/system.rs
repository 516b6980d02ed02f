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

//! System trait and per-system entity membership
//!
//! A system declares the component types it requires. The world pushes
//! matching entities into the system's [`EntitySet`] as components come and
//! go, so nothing is re-scanned per frame.

use std::fmt;

use ahash::AHashSet;

use crate::component::{AsAny, ComponentSet};
use crate::entity::{Entity, EntityId};
use crate::error::Result;
use crate::utils::next_id;
use crate::world::World;

/// Handle returned by [`World::add_system`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

impl SystemId {
    pub(crate) fn next() -> Self {
        SystemId(next_id())
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// System trait
pub trait System: AsAny + Send {
    /// Get system name
    fn name(&self) -> &str;

    /// Component types an entity must carry to be handed to this system
    fn requirements(&self) -> ComponentSet {
        ComponentSet::new()
    }

    /// Lower values run first
    fn update_order(&self) -> i32 {
        0
    }

    /// Run system logic for one frame.
    ///
    /// `entities` is the membership snapshot for this frame. Structural
    /// changes made through `world` are deferred until every system has run.
    fn update(&mut self, world: &mut World, entities: &[EntityId], delta_time: f32) -> Result<()>;

    fn on_entity_added(&mut self, _entity: EntityId) {}

    fn on_entity_removed(&mut self, _entity: EntityId) {}

    fn on_enabled(&mut self) {}

    fn on_disabled(&mut self) {}
}

/// Boxed system
pub type BoxedSystem = Box<dyn System>;

/// Insertion-ordered set of entity ids
#[derive(Clone, Debug, Default)]
pub struct EntitySet {
    order: Vec<EntityId>,
    members: AHashSet<EntityId>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if already present
    pub fn insert(&mut self, id: EntityId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Returns false if absent
    pub fn remove(&mut self, id: EntityId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        self.order.retain(|e| *e != id);
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn as_slice(&self) -> &[EntityId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

/// A registered system plus its world-side bookkeeping
pub(crate) struct SystemEntry {
    pub id: SystemId,
    pub system: BoxedSystem,
    pub requirements: ComponentSet,
    pub update_order: i32,
    pub enabled: bool,
    pub entities: EntitySet,
}

impl SystemEntry {
    pub fn new(system: BoxedSystem) -> Self {
        Self {
            id: SystemId::next(),
            requirements: system.requirements(),
            update_order: system.update_order(),
            system,
            enabled: true,
            entities: EntitySet::new(),
        }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.requirements.is_satisfied_by(entity)
    }

    /// Re-evaluate membership of `entity` after a structural change
    pub fn refresh(&mut self, entity: &Entity) {
        let id = entity.id();
        if self.matches(entity) {
            if self.entities.insert(id) {
                self.system.on_entity_added(id);
            }
        } else if self.entities.remove(id) {
            self.system.on_entity_removed(id);
        }
    }

    pub fn evict(&mut self, id: EntityId) {
        if self.entities.remove(id) {
            self.system.on_entity_removed(id);
        }
    }

    pub fn as_dyn(&self) -> &dyn System {
        self.system.as_ref()
    }

    pub fn as_dyn_mut(&mut self) -> &mut dyn System {
        self.system.as_mut()
    }
}

impl fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemEntry")
            .field("id", &self.id)
            .field("name", &self.system.name())
            .field("update_order", &self.update_order)
            .field("enabled", &self.enabled)
            .field("entities", &self.entities.len())
            .finish()
    }
}
