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

//! Sprite component

use crate::component::{Component, ComponentExt, ComponentHeader};
use crate::impl_component_header;
use crate::math::{self, Affine2, Vec2};
use crate::render::{Color, Rect, RenderLayer, RenderSurface, Renderable, SpriteDraw};
use crate::serialization::{ComponentData, SpriteData};

/// Textured quad drawn at its entity's transform
#[derive(Clone, Debug)]
pub struct Sprite {
    header: ComponentHeader,
    pub texture: Option<String>,
    pub visible: bool,
    pub layer: RenderLayer,
    pub order: i32,
    /// Pivot as a fraction of the drawn size
    pub origin: Vec2,
    pub scale: Vec2,
    /// Extra rotation on top of the entity transform, radians
    pub rotation: f32,
    pub source: Option<Rect>,
    pub tint: Color,
    alpha: f32,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Sprite {
    pub fn new() -> Self {
        Self {
            header: ComponentHeader::new(),
            texture: None,
            visible: true,
            layer: RenderLayer::Default,
            order: 0,
            origin: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            source: None,
            tint: Color::WHITE,
            alpha: 1.0,
            flip_x: false,
            flip_y: false,
        }
    }

    pub fn with_texture(texture: impl Into<String>) -> Self {
        Self {
            texture: Some(texture.into()),
            ..Self::new()
        }
    }

    pub fn on_layer(mut self, layer: RenderLayer, order: i32) -> Self {
        self.layer = layer;
        self.order = order;
        self
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Clamped into `[0, 1]`
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = math::saturate(alpha);
    }

    /// Sprite-local placement: rotation and flips around the pivot
    pub fn local_matrix(&self) -> Affine2 {
        let flip = Vec2::new(
            if self.flip_x { -1.0 } else { 1.0 },
            if self.flip_y { -1.0 } else { 1.0 },
        );
        Affine2::from_angle(self.rotation) * Affine2::from_scale(flip)
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderable for Sprite {
    fn is_visible(&self) -> bool {
        self.visible && self.is_enabled()
    }

    fn layer(&self) -> RenderLayer {
        self.layer
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn render(&self, surface: &mut dyn RenderSurface, world_transform: &Affine2) {
        surface.draw_sprite(&SpriteDraw {
            texture: self.texture.as_deref(),
            transform: *world_transform * self.local_matrix(),
            source: self.source,
            origin: self.origin,
            scale: self.scale,
            tint: self.tint,
            alpha: self.alpha,
        });
    }
}

impl Component for Sprite {
    impl_component_header!(header);

    fn snapshot(&self) -> Option<ComponentData> {
        Some(ComponentData::Sprite(SpriteData {
            enabled: self.is_enabled(),
            texture: self.texture.clone(),
            visible: self.visible,
            layer: self.layer.value(),
            order: self.order,
            origin: self.origin.into(),
            scale: self.scale.into(),
            rotation: self.rotation,
            source: self.source.map(Into::into),
            tint: self.tint.into(),
            alpha: self.alpha,
            flip_x: self.flip_x,
            flip_y: self.flip_y,
        }))
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }
}
