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

//! 2D transform hierarchy
//!
//! [`Transform2D`] stores local position, rotation (radians) and scale plus an
//! optional parent entity. Local matrices compose scale, then rotation, then
//! translation; a world matrix is the parent's world matrix applied after the
//! local one.
//!
//! Mutation goes through [`TransformMut`] (see [`World::transform_mut`]) so
//! every change marks the node and all of its descendants dirty. World
//! matrices are recomputed lazily, root first, the next time one is read.

use ahash::{AHashMap, AHashSet};
use smallvec::SmallVec;

use crate::component::{Component, ComponentExt, ComponentHeader};
use crate::entity::EntityId;
use crate::error::{EngineError, Result};
use crate::impl_component_header;
use crate::math::{self, Affine2, Vec2};
use crate::serialization::{ComponentData, TransformData};
use crate::world::World;

/// Position, rotation and scale relative to an optional parent
#[derive(Clone, Debug)]
pub struct Transform2D {
    header: ComponentHeader,
    position: Vec2,
    rotation: f32,
    scale: Vec2,
    parent: Option<EntityId>,
    dirty: bool,
    local: Affine2,
    world: Affine2,
}

impl Transform2D {
    pub fn new() -> Self {
        Self::from_parts(Vec2::ZERO, 0.0, Vec2::ONE)
    }

    pub fn from_position(position: Vec2) -> Self {
        Self::from_parts(position, 0.0, Vec2::ONE)
    }

    pub fn from_parts(position: Vec2, rotation: f32, scale: Vec2) -> Self {
        Self {
            header: ComponentHeader::new(),
            position,
            rotation,
            scale,
            parent: None,
            dirty: true,
            local: Affine2::IDENTITY,
            world: Affine2::IDENTITY,
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Set the parent before the component is attached
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Scale, then rotate, then translate
    pub fn local_matrix(&self) -> Affine2 {
        Affine2::from_scale_angle_translation(self.scale, self.rotation, self.position)
    }

    /// Cached world matrix, `None` while stale
    pub fn cached_world_matrix(&self) -> Option<Affine2> {
        (!self.dirty).then_some(self.world)
    }

    pub(crate) fn set_parent_link(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
        self.dirty = true;
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Transform2D {
    impl_component_header!(header);

    fn snapshot(&self) -> Option<ComponentData> {
        Some(ComponentData::Transform2D(TransformData {
            enabled: self.is_enabled(),
            position: self.position.into(),
            rotation: self.rotation,
            scale: self.scale.into(),
            parent: self.parent.map(EntityId::raw),
        }))
    }
}

/// Mutable handle that keeps descendants' dirty flags in sync
pub struct TransformMut<'w> {
    world: &'w mut World,
    id: EntityId,
}

impl TransformMut<'_> {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn get(&self) -> Option<&Transform2D> {
        self.world.get_component::<Transform2D>(self.id)
    }

    fn modify(&mut self, change: impl FnOnce(&mut Transform2D) -> bool) -> &mut Self {
        let changed = self
            .world
            .get_component_mut::<Transform2D>(self.id)
            .is_some_and(change);
        if changed {
            self.world.mark_transform_dirty(self.id);
        }
        self
    }

    pub fn set_position(&mut self, position: Vec2) -> &mut Self {
        self.modify(|t| {
            let changed = t.position != position;
            t.position = position;
            changed
        })
    }

    pub fn set_rotation(&mut self, rotation: f32) -> &mut Self {
        self.modify(|t| {
            let changed = t.rotation != rotation;
            t.rotation = rotation;
            changed
        })
    }

    pub fn set_scale(&mut self, scale: Vec2) -> &mut Self {
        self.modify(|t| {
            let changed = t.scale != scale;
            t.scale = scale;
            changed
        })
    }

    pub fn translate(&mut self, delta: Vec2) -> &mut Self {
        self.modify(|t| {
            t.position += delta;
            delta != Vec2::ZERO
        })
    }

    pub fn rotate(&mut self, angle: f32) -> &mut Self {
        self.modify(|t| {
            t.rotation += angle;
            angle != 0.0
        })
    }

    /// Wrap the stored rotation into `[-PI, PI)`
    pub fn normalize_rotation(&mut self) -> &mut Self {
        self.modify(|t| {
            let normalized = math::normalize_angle(t.rotation);
            let changed = normalized != t.rotation;
            t.rotation = normalized;
            changed
        })
    }

    pub fn set_parent(&mut self, parent: Option<EntityId>) -> Result<&mut Self> {
        self.world.set_parent(self.id, parent)?;
        Ok(self)
    }
}

impl World {
    /// Mutable transform handle; `NotFound` if the entity has no `Transform2D`
    pub fn transform_mut(&mut self, id: EntityId) -> Result<TransformMut<'_>> {
        if !self.has_component::<Transform2D>(id) {
            return Err(missing_transform(id));
        }
        Ok(TransformMut { world: self, id })
    }

    /// Re-parent `child`. Self-parenting and cycles are rejected with
    /// `InvalidState`; a parent without a transform is `NotFound`.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<()> {
        let current = self
            .get_component::<Transform2D>(child)
            .ok_or_else(|| missing_transform(child))?
            .parent;
        if current == parent {
            return Ok(());
        }

        if let Some(parent) = parent {
            if parent == child {
                return Err(EngineError::InvalidState(format!(
                    "{child} cannot be its own parent"
                )));
            }
            if !self.has_component::<Transform2D>(parent) {
                return Err(missing_transform(parent));
            }
            let mut ancestor = Some(parent);
            let mut visited = AHashSet::new();
            while let Some(node) = ancestor {
                if node == child {
                    return Err(EngineError::InvalidState(format!(
                        "parenting {child} under {parent} would create a cycle"
                    )));
                }
                if !visited.insert(node) {
                    break;
                }
                ancestor = self
                    .get_component::<Transform2D>(node)
                    .and_then(|t| t.parent);
            }
        }

        if let Some(transform) = self.get_component_mut::<Transform2D>(child) {
            transform.set_parent_link(parent);
        }
        self.mark_transform_dirty(child);
        Ok(())
    }

    /// Registered entities whose transform names `id` as parent
    pub fn children_of(&self, id: EntityId) -> Vec<EntityId> {
        self.entities()
            .filter(|e| {
                e.get_component::<Transform2D>()
                    .is_some_and(|t| t.parent == Some(id))
            })
            .map(|e| e.id())
            .collect()
    }

    /// Mark `id` and every descendant dirty
    pub(crate) fn mark_transform_dirty(&mut self, id: EntityId) {
        let mut children: AHashMap<EntityId, SmallVec<[EntityId; 4]>> = AHashMap::new();
        for entity in self.stored_entities() {
            if let Some(parent) = entity.get_component::<Transform2D>().and_then(|t| t.parent) {
                children.entry(parent).or_default().push(entity.id());
            }
        }

        let mut stack = vec![id];
        let mut visited = AHashSet::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(transform) = self.get_component_mut::<Transform2D>(current) {
                transform.dirty = true;
            }
            if let Some(direct) = children.get(&current) {
                stack.extend(direct.iter().copied());
            }
        }
    }

    /// World matrix of `id`, recomputing stale ancestors first
    pub fn world_matrix(&mut self, id: EntityId) -> Result<Affine2> {
        // Walk up to the root. A parent without a transform ends the chain, as
        // does revisiting a node.
        let mut chain: SmallVec<[EntityId; 8]> = SmallVec::new();
        let mut next = Some(id);
        while let Some(node) = next {
            if chain.contains(&node) {
                break;
            }
            let Some(transform) = self.get_component::<Transform2D>(node) else {
                if node == id {
                    return Err(missing_transform(id));
                }
                break;
            };
            chain.push(node);
            next = transform.parent;
        }

        let mut parent_world = Affine2::IDENTITY;
        let mut recomputed = false;
        for (depth, node) in chain.iter().rev().enumerate() {
            let transform = self
                .get_component_mut::<Transform2D>(*node)
                .ok_or_else(|| missing_transform(*node))?;
            // The topmost node still naming a parent lost that parent
            let orphaned = depth == 0 && transform.parent.is_some();
            if transform.dirty || recomputed || orphaned {
                transform.local = transform.local_matrix();
                transform.world = parent_world * transform.local;
                transform.dirty = false;
                recomputed = true;
            }
            parent_world = transform.world;
        }
        Ok(parent_world)
    }

    pub fn local_to_world(&mut self, id: EntityId, point: Vec2) -> Result<Vec2> {
        Ok(self.world_matrix(id)?.transform_point2(point))
    }

    /// Fails with `Singular` when the world matrix cannot be inverted
    pub fn world_to_local(&mut self, id: EntityId, point: Vec2) -> Result<Vec2> {
        let world = self.world_matrix(id)?;
        Ok(math::try_inverse(&world)?.transform_point2(point))
    }

    pub fn world_position(&mut self, id: EntityId) -> Result<Vec2> {
        Ok(self.world_matrix(id)?.translation)
    }

    pub fn world_rotation(&mut self, id: EntityId) -> Result<f32> {
        Ok(math::rotation_of(&self.world_matrix(id)?))
    }

    pub fn world_scale(&mut self, id: EntityId) -> Result<Vec2> {
        Ok(math::scale_of(&self.world_matrix(id)?))
    }
}

fn missing_transform(id: EntityId) -> EngineError {
    EngineError::NotFound(format!("Transform2D on {id}"))
}
