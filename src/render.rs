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

//! Render boundary
//!
//! The engine never draws pixels. A backend implements [`RenderSurface`];
//! components that can be drawn expose [`Renderable`] through
//! [`Component::as_renderable`](crate::component::Component::as_renderable).
//! [`World::render`] walks the renderables layer by layer and hands each one
//! its entity's world matrix.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::builtin::transform::Transform2D;
use crate::entity::EntityId;
use crate::error::Result;
use crate::math::{Affine2, Vec2};
use crate::world::World;

/// Draw layers, drawn in ascending order
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RenderLayer {
    Background = 0,
    #[default]
    Default = 1000,
    Foreground = 2000,
    /// Screen space; the camera view is not applied
    Ui = 3000,
}

impl RenderLayer {
    pub const ALL: [RenderLayer; 4] = [
        RenderLayer::Background,
        RenderLayer::Default,
        RenderLayer::Foreground,
        RenderLayer::Ui,
    ];

    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.value() == value)
    }
}

/// 8-bit RGBA color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Axis-aligned rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }
}

/// Everything a backend needs to draw one sprite
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteDraw<'a> {
    /// Backend-defined texture key
    pub texture: Option<&'a str>,
    /// Placement in world (or screen, for the UI layer) space, flips included
    pub transform: Affine2,
    /// Region of the texture; `None` draws all of it
    pub source: Option<Rect>,
    /// Pivot as a fraction of the drawn size
    pub origin: Vec2,
    /// Multiplier on the source size
    pub scale: Vec2,
    pub tint: Color,
    pub alpha: f32,
}

/// Drawing surface implemented by the render backend
pub trait RenderSurface {
    fn begin_frame(&mut self, _clear: Color) {}

    /// View transform for subsequent draws
    fn set_view(&mut self, view: Affine2);

    /// Global opacity multiplier, used for scene cross-fades
    fn set_opacity(&mut self, _opacity: f32) {}

    fn draw_sprite(&mut self, sprite: &SpriteDraw<'_>);

    fn end_frame(&mut self) {}
}

/// Capability of a component that can be drawn
pub trait Renderable {
    fn is_visible(&self) -> bool;

    fn layer(&self) -> RenderLayer;

    /// Order within the layer, lower first
    fn order(&self) -> i32;

    fn render(&self, surface: &mut dyn RenderSurface, world_transform: &Affine2);
}

/// One renderable component scheduled for drawing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderItem {
    pub entity: EntityId,
    /// Position of the component in the entity's component list
    pub component_index: usize,
    pub layer: RenderLayer,
    pub order: i32,
}

impl fmt::Display for RenderItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} {:?}/{}", self.entity, self.component_index, self.layer, self.order)
    }
}

impl World {
    /// Visible renderables of active entities, sorted by layer then order.
    /// Ties keep registration order.
    pub fn collect_renderables(&self) -> Vec<RenderItem> {
        let mut items: Vec<RenderItem> = self
            .entities()
            .filter(|entity| entity.is_active())
            .flat_map(|entity| {
                entity
                    .components()
                    .enumerate()
                    .filter_map(move |(component_index, component)| {
                        let renderable = component.as_renderable()?;
                        renderable.is_visible().then(|| RenderItem {
                            entity: entity.id(),
                            component_index,
                            layer: renderable.layer(),
                            order: renderable.order(),
                        })
                    })
            })
            .collect();
        items.sort_by_key(|item| (item.layer, item.order));
        items
    }

    /// Draw every visible renderable. `view` applies to all layers except
    /// [`RenderLayer::Ui`], which is drawn with the identity view.
    ///
    /// Returns the number of renderables drawn.
    pub fn render(&mut self, surface: &mut dyn RenderSurface, view: Affine2) -> Result<usize> {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("world.render", world = %self.name()).entered();

        let items = self.collect_renderables();
        let mut current_layer = None;
        let mut drawn = 0;
        for item in &items {
            if current_layer != Some(item.layer) {
                current_layer = Some(item.layer);
                surface.set_view(if item.layer == RenderLayer::Ui {
                    Affine2::IDENTITY
                } else {
                    view
                });
            }

            let transform = if self.has_component::<Transform2D>(item.entity) {
                self.world_matrix(item.entity)?
            } else {
                Affine2::IDENTITY
            };

            let renderable = self
                .entity(item.entity)
                .and_then(|entity| entity.components().nth(item.component_index))
                .and_then(|component| component.as_renderable());
            if let Some(renderable) = renderable {
                renderable.render(surface, &transform);
                drawn += 1;
            }
        }
        Ok(drawn)
    }
}
