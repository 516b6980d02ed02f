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

//! Input boundary: keyboard and mouse snapshots plus per-frame edge tracking.
//!
//! The host owns the OS window and submits a [`KeyboardState`] and a
//! [`MouseState`] snapshot whenever it has polled. [`InputManager`] runs
//! first each frame, shifts the current snapshot into the previous slot and
//! adopts the latest submission, so pressed/released edges hold for exactly
//! one frame.
//!
//! # Examples
//!
//! ```
//! use engine2d_core::builtin::input::{InputManager, KeyCode, KeyboardState};
//!
//! let mut input = InputManager::new();
//! let mut keys = KeyboardState::new();
//! keys.press(KeyCode::Space);
//! input.submit_keyboard(keys);
//! input.advance();
//!
//! if input.is_key_pressed(KeyCode::Space) {
//!     println!("Jump!");
//! }
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use crate::entity::EntityId;
use crate::error::{EngineError, Result};
use crate::math::Vec2;
use crate::system::System;
use crate::world::World;

/// Set of buttons held down in one snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonState<T: Copy + Eq + Hash> {
    down: AHashSet<T>,
}

impl<T: Copy + Eq + Hash> ButtonState<T> {
    pub fn new() -> Self {
        Self {
            down: AHashSet::new(),
        }
    }

    pub fn press(&mut self, button: T) {
        self.down.insert(button);
    }

    pub fn release(&mut self, button: T) {
        self.down.remove(&button);
    }

    pub fn is_down(&self, button: T) -> bool {
        self.down.contains(&button)
    }

    pub fn is_up(&self, button: T) -> bool {
        !self.is_down(button)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.down.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.down.len()
    }

    pub fn is_empty(&self) -> bool {
        self.down.is_empty()
    }

    pub fn clear(&mut self) {
        self.down.clear();
    }
}

impl<T: Copy + Eq + Hash> Default for ButtonState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash> FromIterator<T> for ButtonState<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            down: iter.into_iter().collect(),
        }
    }
}

/// Keyboard key codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    // Letters
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    // Numbers
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,

    // Function keys
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    // Special keys
    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,

    // Arrow keys
    Left,
    Right,
    Up,
    Down,

    // Modifiers
    LShift,
    RShift,
    LControl,
    RControl,
    LAlt,
    RAlt,
}

/// Mouse button codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Keys currently held down
pub type KeyboardState = ButtonState<KeyCode>;

/// Mouse snapshot
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MouseState {
    pub position: Vec2,
    pub buttons: ButtonState<MouseButton>,
    /// Accumulated wheel position
    pub scroll_value: f32,
    /// Wheel movement since the previous snapshot
    pub scroll_delta: f32,
}

impl MouseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn scroll(&mut self, delta: f32) {
        self.scroll_value += delta;
        self.scroll_delta += delta;
    }
}

/// Predicate evaluated against the input manager
pub type InputPredicate = Arc<dyn Fn(&InputManager) -> bool + Send + Sync>;

/// One way of triggering an action
#[derive(Clone)]
pub enum InputCondition {
    Key(KeyCode),
    MouseButton(MouseButton),
    Custom(InputPredicate),
}

impl InputCondition {
    fn holds(&self, input: &InputManager) -> bool {
        match self {
            InputCondition::Key(key) => input.is_key_down(*key),
            InputCondition::MouseButton(button) => input.is_mouse_down(*button),
            InputCondition::Custom(predicate) => predicate(input),
        }
    }
}

impl fmt::Debug for InputCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputCondition::Key(key) => f.debug_tuple("Key").field(key).finish(),
            InputCondition::MouseButton(b) => f.debug_tuple("MouseButton").field(b).finish(),
            InputCondition::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Named action, active while any of its conditions holds
#[derive(Clone, Debug)]
pub struct InputAction {
    name: String,
    conditions: Vec<InputCondition>,
    active: bool,
    was_active: bool,
}

impl InputAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
            active: false,
            was_active: false,
        }
    }

    pub fn with_key(mut self, key: KeyCode) -> Self {
        self.conditions.push(InputCondition::Key(key));
        self
    }

    pub fn with_mouse_button(mut self, button: MouseButton) -> Self {
        self.conditions.push(InputCondition::MouseButton(button));
        self
    }

    pub fn with_condition(
        mut self,
        predicate: impl Fn(&InputManager) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.conditions.push(InputCondition::Custom(Arc::new(predicate)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conditions(&self) -> &[InputCondition] {
        &self.conditions
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Became active this frame
    pub fn is_pressed(&self) -> bool {
        self.active && !self.was_active
    }

    /// Stopped being active this frame
    pub fn is_released(&self) -> bool {
        !self.active && self.was_active
    }

    fn evaluate(&mut self, input: &InputManager) {
        self.was_active = self.active;
        self.active = self.conditions.iter().any(|c| c.holds(input));
    }
}

/// Tracks input snapshots across frames and evaluates named actions
#[derive(Debug, Default)]
pub struct InputManager {
    keyboard: KeyboardState,
    previous_keyboard: KeyboardState,
    mouse: MouseState,
    previous_mouse: MouseState,
    incoming_keyboard: Option<KeyboardState>,
    incoming_mouse: Option<MouseState>,
    actions: AHashMap<String, InputAction>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the latest keyboard snapshot for the next frame
    pub fn submit_keyboard(&mut self, state: KeyboardState) {
        self.incoming_keyboard = Some(state);
    }

    /// Queue the latest mouse snapshot for the next frame
    pub fn submit_mouse(&mut self, state: MouseState) {
        self.incoming_mouse = Some(state);
    }

    /// Start a new input frame
    pub fn advance(&mut self) {
        self.previous_keyboard = self.keyboard.clone();
        self.previous_mouse = self.mouse.clone();
        if let Some(keyboard) = self.incoming_keyboard.take() {
            self.keyboard = keyboard;
        }
        match self.incoming_mouse.take() {
            Some(mouse) => self.mouse = mouse,
            None => self.mouse.scroll_delta = 0.0,
        }

        let mut actions = std::mem::take(&mut self.actions);
        for action in actions.values_mut() {
            action.evaluate(self);
        }
        self.actions = actions;
    }

    pub fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keyboard.is_down(key)
    }

    pub fn is_key_up(&self, key: KeyCode) -> bool {
        self.keyboard.is_up(key)
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keyboard.is_down(key) && self.previous_keyboard.is_up(key)
    }

    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.keyboard.is_up(key) && self.previous_keyboard.is_down(key)
    }

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.mouse.buttons.is_down(button)
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse.buttons.is_down(button) && self.previous_mouse.buttons.is_up(button)
    }

    pub fn is_mouse_released(&self, button: MouseButton) -> bool {
        self.mouse.buttons.is_up(button) && self.previous_mouse.buttons.is_down(button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse.position
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse.position - self.previous_mouse.position
    }

    pub fn scroll_delta(&self) -> f32 {
        self.mouse.scroll_delta
    }

    /// Register an action; names must be non-empty and unique
    pub fn add_action(&mut self, action: InputAction) -> Result<()> {
        if action.name.is_empty() {
            return Err(EngineError::InvalidState(
                "input action name cannot be empty".into(),
            ));
        }
        if self.actions.contains_key(&action.name) {
            return Err(EngineError::InvalidState(format!(
                "input action '{}' is already registered",
                action.name
            )));
        }
        self.actions.insert(action.name.clone(), action);
        Ok(())
    }

    pub fn remove_action(&mut self, name: &str) -> bool {
        self.actions.remove(name).is_some()
    }

    pub fn action(&self, name: &str) -> Option<&InputAction> {
        self.actions.get(name)
    }

    pub fn is_action_active(&self, name: &str) -> bool {
        self.action(name).is_some_and(InputAction::is_active)
    }

    pub fn is_action_pressed(&self, name: &str) -> bool {
        self.action(name).is_some_and(InputAction::is_pressed)
    }

    pub fn is_action_released(&self, name: &str) -> bool {
        self.action(name).is_some_and(InputAction::is_released)
    }
}

impl System for InputManager {
    fn name(&self) -> &str {
        "InputManager"
    }

    /// Input is sampled before any gameplay system runs
    fn update_order(&self) -> i32 {
        -1000
    }

    fn update(
        &mut self,
        _world: &mut World,
        _entities: &[EntityId],
        _delta_time: f32,
    ) -> Result<()> {
        self.advance();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(down: &[KeyCode]) -> KeyboardState {
        down.iter().copied().collect()
    }

    #[test]
    fn test_key_edges_last_one_frame() {
        let mut input = InputManager::new();
        input.submit_keyboard(keys(&[KeyCode::Space]));
        input.advance();
        assert!(input.is_key_down(KeyCode::Space));
        assert!(input.is_key_pressed(KeyCode::Space));

        // No new snapshot: still held, no longer a fresh press
        input.advance();
        assert!(input.is_key_down(KeyCode::Space));
        assert!(!input.is_key_pressed(KeyCode::Space));

        input.submit_keyboard(keys(&[]));
        input.advance();
        assert!(input.is_key_released(KeyCode::Space));
        assert!(input.is_key_up(KeyCode::Space));
    }

    #[test]
    fn test_mouse_delta_and_scroll() {
        let mut input = InputManager::new();
        input.submit_mouse(MouseState::at(Vec2::new(10.0, 20.0)));
        input.advance();

        let mut mouse = MouseState::at(Vec2::new(15.0, 25.0));
        mouse.buttons.press(MouseButton::Left);
        mouse.scroll(2.0);
        input.submit_mouse(mouse);
        input.advance();

        assert_eq!(input.mouse_delta(), Vec2::new(5.0, 5.0));
        assert_eq!(input.scroll_delta(), 2.0);
        assert!(input.is_mouse_pressed(MouseButton::Left));

        input.advance();
        assert_eq!(input.scroll_delta(), 0.0);
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_actions_combine_conditions() -> Result<()> {
        let mut input = InputManager::new();
        input.add_action(
            InputAction::new("jump")
                .with_key(KeyCode::Space)
                .with_mouse_button(MouseButton::Right),
        )?;
        input.add_action(
            InputAction::new("scrolling").with_condition(|i| i.scroll_delta() != 0.0),
        )?;
        assert!(input.add_action(InputAction::new("jump")).is_err());
        assert!(input.add_action(InputAction::new("")).is_err());

        let mut mouse = MouseState::new();
        mouse.buttons.press(MouseButton::Right);
        input.submit_mouse(mouse);
        input.advance();
        assert!(input.is_action_active("jump"));
        assert!(input.is_action_pressed("jump"));
        assert!(!input.is_action_active("scrolling"));

        input.submit_mouse(MouseState::new());
        input.advance();
        assert!(input.is_action_released("jump"));

        assert!(input.remove_action("jump"));
        assert!(!input.is_action_active("jump"));
        Ok(())
    }

    #[test]
    fn test_runs_as_first_system() -> Result<()> {
        let mut world = World::new();
        world.add_system(InputManager::new())?;
        world
            .get_system_mut::<InputManager>()
            .unwrap()
            .submit_keyboard(keys(&[KeyCode::Escape]));
        world.update(0.016)?;
        assert!(world
            .get_system::<InputManager>()
            .unwrap()
            .is_key_pressed(KeyCode::Escape));
        Ok(())
    }
}
