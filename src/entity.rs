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

//! Entities: identity plus a table of components.

use std::any::TypeId;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentExt, ComponentTable};
use crate::error::{EngineError, Result};
use crate::utils::next_id;
use crate::world::WorldId;

/// Unique entity identifier
///
/// Allocated from a process-wide counter, so ids are never reused and a later
/// entity always has a larger id than an earlier one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        EntityId(next_id())
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        EntityId(raw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// An identity plus a collection of components, at most one per type.
///
/// Entities built directly are detached; [`crate::world::World::add_entity`]
/// attaches them. Once attached, structural changes go through
/// [`crate::world::EntityMut`] so the world can keep systems in sync.
pub struct Entity {
    id: EntityId,
    name: String,
    active: bool,
    components: ComponentTable,
    pub(crate) world: Option<WorldId>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::next(),
            name: name.into(),
            active: true,
            components: ComponentTable::default(),
            world: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Toggle the active flag, notifying components on change
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        for component in self.components.iter_mut() {
            if active {
                component.on_entity_activated();
            } else {
                component.on_entity_deactivated();
            }
        }
    }

    /// World this entity is registered with, if any
    pub fn world(&self) -> Option<WorldId> {
        self.world
    }

    /// Attach a component, failing with `DuplicateComponent` if one of the same
    /// type is present. The component is owned by this entity and initialized.
    pub fn add_component<T: Component>(&mut self, mut component: T) -> Result<&mut T> {
        let type_id = TypeId::of::<T>();
        if self.components.contains(type_id) {
            return Err(EngineError::DuplicateComponent(component.type_name()));
        }
        component.header_mut().set_owner(Some(self.id))?;
        component.initialize();
        self.components.insert(type_id, Box::new(component));
        self.components
            .get_mut::<T>()
            .ok_or_else(|| EngineError::NotFound(std::any::type_name::<T>().to_string()))
    }

    /// Detach a component; returns whether one was present
    pub fn remove_component<T: Component>(&mut self) -> bool {
        self.take_component::<T>().is_some()
    }

    /// Detach a component and hand it back, cleaned up and unowned
    pub fn take_component<T: Component>(&mut self) -> Option<T> {
        let mut boxed = self.components.remove(TypeId::of::<T>())?;
        boxed.cleanup();
        // Clearing an owner never fails
        let _ = boxed.header_mut().set_owner(None);
        let any = boxed.into_any();
        any.downcast::<T>().ok().map(|component| *component)
    }

    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.components.get::<T>()
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut::<T>()
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.components.contains(TypeId::of::<T>())
    }

    pub fn has_type(&self, type_id: TypeId) -> bool {
        self.components.contains(type_id)
    }

    pub fn components(&self) -> impl Iterator<Item = &dyn Component> + '_ {
        self.components.iter()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.active)
            .field(
                "components",
                &self.components.iter().map(|c| c.type_name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
