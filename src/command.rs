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

//! Deferred structural changes
//!
//! While a world is updating, entity registration, destruction and
//! system-membership refreshes are queued here and applied in one batch once
//! the last system has returned. Refreshes go first, then registrations, then
//! removals, each in request order.

use crate::entity::EntityId;
use crate::world::World;

/// A queued structural change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Re-test system membership after a component add/remove
    Refresh(EntityId),

    /// Register an entity that was added mid-update
    Register(EntityId),

    /// Destroy an entity
    Destroy(EntityId),
}

/// Command buffer for deferred operations
#[derive(Debug, Default)]
pub struct CommandBuffer {
    refreshes: Vec<EntityId>,
    registrations: Vec<EntityId>,
    removals: Vec<EntityId>,
}

impl CommandBuffer {
    /// Create new command buffer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        match command {
            Command::Refresh(id) => {
                if !self.refreshes.contains(&id) {
                    self.refreshes.push(id);
                }
            }
            Command::Register(id) => self.registrations.push(id),
            Command::Destroy(id) => {
                if !self.removals.contains(&id) {
                    self.removals.push(id);
                }
            }
        }
    }

    pub fn is_queued_for_removal(&self, id: EntityId) -> bool {
        self.removals.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.refreshes.is_empty() && self.registrations.is_empty() && self.removals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.refreshes.len() + self.registrations.len() + self.removals.len()
    }

    /// Queued commands in application order
    pub fn iter(&self) -> impl Iterator<Item = Command> + '_ {
        self.refreshes
            .iter()
            .map(|id| Command::Refresh(*id))
            .chain(self.registrations.iter().map(|id| Command::Register(*id)))
            .chain(self.removals.iter().map(|id| Command::Destroy(*id)))
    }

    /// Apply all queued changes to `world`, leaving the buffer empty
    pub fn apply(&mut self, world: &mut World) {
        for id in self.refreshes.drain(..) {
            world.refresh_membership(id);
        }
        for id in self.registrations.drain(..) {
            world.register_pending(id);
        }
        for id in self.removals.drain(..) {
            world.destroy_immediate(id);
        }
    }

    pub fn clear(&mut self) {
        self.refreshes.clear();
        self.registrations.clear();
        self.removals.clear();
    }
}
