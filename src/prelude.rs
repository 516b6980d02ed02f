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

//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use engine2d_core::prelude::*;
//! ```

pub use crate::builtin::{
    Camera2D, CameraFollowSystem, InputAction, InputManager, KeyCode, KeyboardState,
    MouseButton, MouseState, Sprite, Transform2D, TransformMut,
};
pub use crate::component::{Component, ComponentExt, ComponentSet};
pub use crate::config::{EngineConfig, LogConfig, LoopConfig, SceneConfig};
pub use crate::entity::{Entity, EntityId};
pub use crate::error::{EngineError, Result};
pub use crate::event::SceneEvent;
pub use crate::game_loop::{GameLoop, LoopState, SharedUpdatable, Updatable};
pub use crate::impl_component_header;
pub use crate::math::{Affine2, Vec2};
pub use crate::render::{Color, Rect, RenderLayer, RenderSurface, Renderable, SpriteDraw};
pub use crate::scene::{Scene, SceneHooks, SceneState, SceneValue};
pub use crate::scene_manager::SceneManager;
pub use crate::serialization::{Snapshot, WorldData};
pub use crate::system::System;
pub use crate::time::{Clock, FixedTime, ManualClock, Time};
pub use crate::world::{SharedWorld, World};
