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

//! Core of a 2D game engine
//!
//! An entity/component/system [`World`] with deferred structural changes, a
//! `Transform2D` hierarchy with cached world matrices, frame [`Time`], a
//! threaded [`GameLoop`] with fixed-step catch-up, and [`Scene`]s switched
//! through a [`SceneManager`] with timed cross-fades. Rendering and input
//! are boundaries: the host implements [`RenderSurface`] and submits input
//! snapshots to the [`InputManager`](builtin::InputManager).
//!
//! ```
//! use engine2d_core::prelude::*;
//!
//! # fn main() -> engine2d_core::Result<()> {
//! let mut scene = Scene::new("level");
//! let world = scene.world_mut();
//! world.add_system(CameraFollowSystem)?;
//! let player = world.spawn("player", (Transform2D::from_position(Vec2::new(4.0, 2.0)),))?;
//! assert_eq!(world.world_position(player)?, Vec2::new(4.0, 2.0));
//!
//! let mut scenes = SceneManager::new();
//! scenes.register_scene(scene)?;
//! assert!(scenes.change_scene("level", true)?);
//! # Ok(())
//! # }
//! ```

pub mod builtin;
pub mod command;
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod game_loop;
#[cfg(feature = "profiling")]
pub mod logging;
pub mod math;
pub mod prelude;
pub mod render;
pub mod scene;
pub mod scene_manager;
pub mod serialization;
pub mod system;
pub mod time;
pub mod utils;
pub mod world;

#[cfg(test)]
mod tests;

pub use command::*;
pub use component::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use event::*;
pub use game_loop::*;
pub use render::*;
pub use scene::*;
pub use scene_manager::*;
pub use serialization::*;
pub use system::*;
pub use time::*;
pub use world::*;
