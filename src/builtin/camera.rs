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

//! 2D camera and the follow system

use crate::component::{Component, ComponentExt, ComponentHeader, ComponentSet};
use crate::entity::EntityId;
use crate::error::Result;
use crate::impl_component_header;
use crate::math::{self, Affine2, Vec2};
use crate::render::{Rect, RenderSurface};
use crate::serialization::{CameraData, ComponentData};
use crate::system::System;
use crate::world::World;

pub const MIN_ZOOM: f32 = 0.01;
pub const MAX_ZOOM: f32 = 100.0;

/// Camera looking at a point of the world
///
/// The view matrix maps world space to screen space: translate by
/// `-position`, rotate, zoom, then move the origin to `origin * viewport`.
#[derive(Clone, Debug)]
pub struct Camera2D {
    header: ComponentHeader,
    position: Vec2,
    rotation: f32,
    zoom: f32,
    origin: Vec2,
    viewport: Vec2,
    bounds: Option<Rect>,
    target: Option<EntityId>,
    damping: f32,
    follow_enabled: bool,
    view: Option<Affine2>,
}

impl Camera2D {
    pub fn new() -> Self {
        Self {
            header: ComponentHeader::new(),
            position: Vec2::ZERO,
            rotation: 0.0,
            zoom: 1.0,
            origin: Vec2::new(0.5, 0.5),
            viewport: Vec2::new(800.0, 600.0),
            bounds: None,
            target: None,
            damping: 0.1,
            follow_enabled: true,
            view: None,
        }
    }

    pub fn with_viewport(viewport: Vec2) -> Self {
        Self {
            viewport,
            ..Self::new()
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    fn clamp_to_bounds(&self, position: Vec2) -> Vec2 {
        let Some(bounds) = self.bounds else {
            return position;
        };
        Vec2::new(
            math::clamp(
                position.x,
                bounds.left(),
                bounds.right() - self.viewport.x / self.zoom,
            ),
            math::clamp(
                position.y,
                bounds.top(),
                bounds.bottom() - self.viewport.y / self.zoom,
            ),
        )
    }

    /// Move the camera, clamped to the bounds when they are set
    pub fn set_position(&mut self, position: Vec2) {
        let position = self.clamp_to_bounds(position);
        if position != self.position {
            self.position = position;
            self.view = None;
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
        self.view = None;
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Clamped into `[MIN_ZOOM, MAX_ZOOM]`
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = math::clamp(zoom, MIN_ZOOM, MAX_ZOOM);
        self.view = None;
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
        self.view = None;
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
        self.view = None;
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Restrict the visible area; re-applies to the current position
    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
        self.position = self.clamp_to_bounds(self.position);
        self.view = None;
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<EntityId>) {
        self.target = target;
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    /// Clamped into `[0, 1]`
    pub fn set_damping(&mut self, damping: f32) {
        self.damping = math::saturate(damping);
    }

    pub fn is_follow_enabled(&self) -> bool {
        self.follow_enabled
    }

    pub fn set_follow_enabled(&mut self, enabled: bool) {
        self.follow_enabled = enabled;
    }

    /// Step toward `target`; with damping the camera covers `1 - damping` of
    /// the remaining distance each call.
    pub fn follow(&mut self, target: Vec2) {
        let next = if self.damping > 0.0 {
            math::lerp_vec2(
                self.position,
                target,
                1.0 - math::clamp(self.damping, 0.0, 0.99),
            )
        } else {
            target
        };
        self.set_position(next);
    }

    pub fn compute_view_matrix(&self) -> Affine2 {
        Affine2::from_translation(self.origin * self.viewport)
            * Affine2::from_scale(Vec2::splat(self.zoom))
            * Affine2::from_angle(self.rotation)
            * Affine2::from_translation(-self.position)
    }

    /// Cached view matrix
    pub fn view_matrix(&mut self) -> Affine2 {
        match self.view {
            Some(view) => view,
            None => {
                let view = self.compute_view_matrix();
                self.view = Some(view);
                view
            }
        }
    }

    /// Screen point to world point; a degenerate view leaves the point as is
    pub fn screen_to_world(&mut self, point: Vec2) -> Vec2 {
        let view = self.view_matrix();
        math::try_inverse(&view)
            .map(|inverse| inverse.transform_point2(point))
            .unwrap_or(point)
    }

    pub fn world_to_screen(&mut self, point: Vec2) -> Vec2 {
        self.view_matrix().transform_point2(point)
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Camera2D {
    impl_component_header!(header);

    fn snapshot(&self) -> Option<ComponentData> {
        Some(ComponentData::Camera2D(CameraData {
            enabled: self.is_enabled(),
            position: self.position.into(),
            rotation: self.rotation,
            zoom: self.zoom,
            origin: self.origin.into(),
            viewport: self.viewport.into(),
            bounds: self.bounds.map(Into::into),
            target: self.target.map(EntityId::raw),
            damping: self.damping,
            follow_enabled: self.follow_enabled,
        }))
    }
}

/// Moves every camera toward its target's world position
#[derive(Debug, Default)]
pub struct CameraFollowSystem;

impl System for CameraFollowSystem {
    fn name(&self) -> &str {
        "CameraFollowSystem"
    }

    fn requirements(&self) -> ComponentSet {
        ComponentSet::new().with::<Camera2D>()
    }

    /// Runs after gameplay systems so cameras see this frame's positions
    fn update_order(&self) -> i32 {
        1000
    }

    fn update(&mut self, world: &mut World, entities: &[EntityId], _delta_time: f32) -> Result<()> {
        for &id in entities {
            let Some(camera) = world.get_component::<Camera2D>(id) else {
                continue;
            };
            if !camera.is_enabled() || !camera.follow_enabled {
                continue;
            }
            let Some(target) = camera.target else {
                continue;
            };
            // A target without a transform is skipped, not an error
            let Ok(goal) = world.world_position(target) else {
                continue;
            };
            if let Some(camera) = world.get_component_mut::<Camera2D>(id) {
                camera.follow(goal);
            }
        }
        Ok(())
    }
}

impl World {
    /// First active entity with an enabled camera
    pub fn main_camera(&self) -> Option<EntityId> {
        self.entities()
            .filter(|e| e.is_active())
            .find(|e| {
                e.get_component::<Camera2D>()
                    .is_some_and(|camera| camera.is_enabled())
            })
            .map(|e| e.id())
    }

    /// Render through `camera`, or the main camera when `None`. Without any
    /// camera the identity view is used.
    pub fn render_from_camera(
        &mut self,
        surface: &mut dyn RenderSurface,
        camera: Option<EntityId>,
    ) -> Result<usize> {
        let view = camera
            .or_else(|| self.main_camera())
            .and_then(|id| self.get_component_mut::<Camera2D>(id))
            .map_or(Affine2::IDENTITY, |camera| camera.view_matrix());
        self.render(surface, view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::transform::Transform2D;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera2D::new();
        camera.set_zoom(1000.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
        camera.set_zoom(0.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_position_maps_to_screen_center() {
        let mut camera = Camera2D::new();
        camera.set_position(Vec2::new(50.0, 50.0));
        assert!(close(camera.world_to_screen(Vec2::new(50.0, 50.0)), Vec2::new(400.0, 300.0)));

        camera.set_zoom(2.0);
        assert!(close(camera.world_to_screen(Vec2::new(60.0, 50.0)), Vec2::new(420.0, 300.0)));
    }

    #[test]
    fn test_screen_world_roundtrip() {
        let mut camera = Camera2D::new();
        camera.set_position(Vec2::new(-20.0, 35.0));
        camera.set_rotation(0.3);
        camera.set_zoom(1.7);
        let p = Vec2::new(123.0, 456.0);
        let screen = camera.world_to_screen(p);
        assert!(close(camera.screen_to_world(screen), p));
    }

    #[test]
    fn test_bounds_clamp_position() {
        let mut camera = Camera2D::new();
        camera.set_bounds(Some(Rect::new(0.0, 0.0, 1000.0, 1000.0)));
        camera.set_position(Vec2::new(-50.0, 900.0));
        assert_eq!(camera.position(), Vec2::new(0.0, 400.0));
    }

    #[test]
    fn test_follow_applies_damping() {
        let mut camera = Camera2D::new();
        camera.set_damping(0.5);
        camera.follow(Vec2::new(100.0, 0.0));
        assert!(close(camera.position(), Vec2::new(50.0, 0.0)));

        camera.set_damping(0.0);
        camera.follow(Vec2::new(100.0, 0.0));
        assert_eq!(camera.position(), Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_follow_system_tracks_target() -> Result<()> {
        let mut world = World::new();
        world.add_system(CameraFollowSystem)?;
        let player = world.spawn("player", (Transform2D::from_position(Vec2::new(10.0, 20.0)),))?;
        let mut camera = Camera2D::new();
        camera.set_damping(0.0);
        camera.set_target(Some(player));
        let cam = world.spawn("camera", (camera,))?;

        world.update(0.016)?;
        assert_eq!(world.get_component::<Camera2D>(cam).unwrap().position(), Vec2::new(10.0, 20.0));
        assert_eq!(world.main_camera(), Some(cam));
        Ok(())
    }
}
