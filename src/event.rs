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

//! Scene lifecycle events and subscriber fan-out

use crossbeam::channel::{self, Receiver, Sender};

/// Notifications emitted by the scene manager
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneEvent {
    /// A scene finished loading
    Loaded { scene: String },

    /// A scene was unloaded
    Unloaded { scene: String },

    /// A transition toward `to` began
    TransitionStarted { from: Option<String>, to: String },

    /// `to` is now the active scene
    TransitionCompleted { from: Option<String>, to: String },
}

impl SceneEvent {
    /// Scene the event is about (the target, for transitions)
    pub fn scene(&self) -> &str {
        match self {
            SceneEvent::Loaded { scene } | SceneEvent::Unloaded { scene } => scene,
            SceneEvent::TransitionStarted { to, .. }
            | SceneEvent::TransitionCompleted { to, .. } => to,
        }
    }

    /// Get event type name for debugging
    pub fn event_type(&self) -> &'static str {
        match self {
            SceneEvent::Loaded { .. } => "Loaded",
            SceneEvent::Unloaded { .. } => "Unloaded",
            SceneEvent::TransitionStarted { .. } => "TransitionStarted",
            SceneEvent::TransitionCompleted { .. } => "TransitionCompleted",
        }
    }
}

/// Delivers every published event to each live subscriber.
///
/// Subscribers whose receiver has been dropped are pruned on the next publish.
#[derive(Debug)]
pub struct EventChannel<E> {
    subscribers: Vec<Sender<E>>,
}

impl<E: Clone> EventChannel<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Receive all events published from now on
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (sender, receiver) = channel::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    pub fn publish(&mut self, event: E) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: Clone> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}
