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

//! Component and Bundle traits
//!
//! Components are typed data attached to entities, at most one instance per
//! type. Every component carries a [`ComponentHeader`] (generated id, owner,
//! enabled and initialized flags); the lifecycle operations built on top of it
//! live in [`ComponentExt`] so they stay idempotent for every implementor.
//! Bundles group multiple components for spawning.

use std::any::{Any, TypeId};

use smallvec::SmallVec;

use crate::entity::{Entity, EntityId};
use crate::error::{EngineError, Result};
use crate::render::Renderable;
use crate::serialization::ComponentData;
use crate::utils::next_id;

/// Maximum number of components supported by Bundle implementations
pub const MAX_BUNDLE_COMPONENTS: usize = 8;

/// Downcast support for trait objects
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Bookkeeping shared by every component
#[derive(Debug)]
pub struct ComponentHeader {
    id: u64,
    owner: Option<EntityId>,
    enabled: bool,
    initialized: bool,
}

impl ComponentHeader {
    pub fn new() -> Self {
        Self {
            id: next_id(),
            owner: None,
            enabled: true,
            initialized: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Assign or clear the owner.
    ///
    /// A component owned by one entity must be detached (owner cleared) before
    /// another entity can claim it.
    pub fn set_owner(&mut self, owner: Option<EntityId>) -> Result<()> {
        match (self.owner, owner) {
            (Some(current), Some(new)) if current != new => Err(EngineError::InvalidState(
                format!("component {} is already owned by {current}; detach it first", self.id),
            )),
            _ => {
                self.owner = owner;
                Ok(())
            }
        }
    }
}

impl Default for ComponentHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloned header belongs to a fresh, unattached component.
impl Clone for ComponentHeader {
    fn clone(&self) -> Self {
        Self {
            enabled: self.enabled,
            ..Self::new()
        }
    }
}

/// Component trait
///
/// Implementors expose their header and override whichever hooks they need.
/// Optional capabilities are reported through [`Component::snapshot`]
/// (serializable) and [`Component::as_renderable`] (renderable).
pub trait Component: AsAny + Send + Sync {
    fn header(&self) -> &ComponentHeader;

    fn header_mut(&mut self) -> &mut ComponentHeader;

    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Called once when the component is attached
    fn on_initialize(&mut self) {}

    /// Called once when the component is detached
    fn on_cleanup(&mut self) {}

    fn on_enabled(&mut self) {}

    fn on_disabled(&mut self) {}

    fn on_entity_activated(&mut self) {}

    fn on_entity_deactivated(&mut self) {}

    /// Serializable capability
    fn snapshot(&self) -> Option<ComponentData> {
        None
    }

    /// Renderable capability
    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }
}

/// Lifecycle operations available on every component, sized or not.
pub trait ComponentExt {
    fn id(&self) -> u64;
    fn owner(&self) -> Option<EntityId>;
    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
    fn is_initialized(&self) -> bool;
    /// Run `on_initialize` unless already initialized
    fn initialize(&mut self);
    /// Run `on_cleanup` if initialized
    fn cleanup(&mut self);
}

impl<C: Component + ?Sized> ComponentExt for C {
    fn id(&self) -> u64 {
        self.header().id
    }

    fn owner(&self) -> Option<EntityId> {
        self.header().owner
    }

    fn is_enabled(&self) -> bool {
        self.header().enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.header().enabled == enabled {
            return;
        }
        self.header_mut().enabled = enabled;
        if enabled {
            self.on_enabled();
        } else {
            self.on_disabled();
        }
    }

    fn is_initialized(&self) -> bool {
        self.header().initialized
    }

    fn initialize(&mut self) {
        if self.header().initialized {
            return;
        }
        self.header_mut().initialized = true;
        self.on_initialize();
    }

    fn cleanup(&mut self) {
        if !self.header().initialized {
            return;
        }
        self.on_cleanup();
        self.header_mut().initialized = false;
    }
}

/// Implement `header`/`header_mut` for a component storing its header in `$field`.
#[macro_export]
macro_rules! impl_component_header {
    ($field:ident) => {
        fn header(&self) -> &$crate::component::ComponentHeader {
            &self.$field
        }

        fn header_mut(&mut self) -> &mut $crate::component::ComponentHeader {
            &mut self.$field
        }
    };
}

pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    match full.find('<') {
        Some(generic_start) => {
            let base = &full[..generic_start];
            let offset = base.rfind("::").map_or(0, |i| i + 2);
            &full[offset..]
        }
        None => full.rsplit("::").next().unwrap_or(full),
    }
}

/// Set of component types a system requires
#[derive(Clone, Debug, Default)]
pub struct ComponentSet {
    types: SmallVec<[(TypeId, &'static str); 4]>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ComponentSet::insert`]
    pub fn with<T: Component>(mut self) -> Self {
        self.insert::<T>();
        self
    }

    pub fn insert<T: Component>(&mut self) {
        let type_id = TypeId::of::<T>();
        if !self.contains(type_id) {
            self.types
                .push((type_id, short_type_name(std::any::type_name::<T>())));
        }
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.types.iter().any(|(id, _)| *id == type_id)
    }

    /// True when the entity carries every required type
    pub fn is_satisfied_by(&self, entity: &Entity) -> bool {
        self.types.iter().all(|(id, _)| entity.has_type(*id))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.iter().map(|(_, name)| *name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// One-component-per-type storage keyed by `TypeId`
#[derive(Default)]
pub(crate) struct ComponentTable {
    slots: SmallVec<[(TypeId, Box<dyn Component>); 4]>,
}

impl ComponentTable {
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.slots.iter().any(|(id, _)| *id == type_id)
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        let slot = self.slots.iter().find(|(id, _)| *id == TypeId::of::<T>())?;
        let component: &dyn Component = slot.1.as_ref();
        component.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        let slot = self
            .slots
            .iter_mut()
            .find(|(id, _)| *id == TypeId::of::<T>())?;
        let component: &mut dyn Component = slot.1.as_mut();
        component.as_any_mut().downcast_mut::<T>()
    }

    /// Caller has already checked for duplicates
    pub fn insert(&mut self, type_id: TypeId, component: Box<dyn Component>) {
        self.slots.push((type_id, component));
    }

    pub fn remove(&mut self, type_id: TypeId) -> Option<Box<dyn Component>> {
        let index = self.slots.iter().position(|(id, _)| *id == type_id)?;
        Some(self.slots.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> + '_ {
        self.slots.iter().map(|(_, c)| c.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut (dyn Component + 'static)> + '_ {
        self.slots.iter_mut().map(|(_, c)| c.as_mut())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Bundle of components
///
/// Allows spawning entities with multiple components at once.
pub trait Bundle: Send + Sync + 'static {
    /// Get type IDs of all components in bundle
    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]>
    where
        Self: Sized;

    /// Attach every component to `entity`
    fn insert_into(self, entity: &mut Entity) -> Result<()>;
}

impl Bundle for () {
    fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
        SmallVec::new()
    }

    fn insert_into(self, _entity: &mut Entity) -> Result<()> {
        Ok(())
    }
}

// Macro for tuple Bundle implementations
macro_rules! impl_bundle {
    ($($T:ident),*) => {
        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn type_ids() -> SmallVec<[TypeId; MAX_BUNDLE_COMPONENTS]> {
                smallvec::smallvec![$(TypeId::of::<$T>()),*]
            }

            #[allow(non_snake_case)]
            fn insert_into(self, entity: &mut Entity) -> Result<()> {
                let ($($T,)*) = self;
                $(
                    entity.add_component($T)?;
                )*
                Ok(())
            }
        }
    };
}

// Implement for tuples of 1-8 components
impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
