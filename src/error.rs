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

//! Error types

use std::fmt;

/// Engine error type
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A component of this type is already attached to the entity
    DuplicateComponent(&'static str),

    /// Operation is not valid in the current state (ownership, lifecycle, transitions)
    InvalidState(String),

    /// Entity, system, scene or component could not be found
    NotFound(String),

    /// Matrix inversion on a degenerate transform
    Singular,

    /// Serialization error
    SerializationError(String),

    /// Deserialization error
    DeserializationError(String),

    /// IO error (file operations, etc.)
    IoError(String),

    /// Configuration could not be parsed or applied
    ConfigError(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::DuplicateComponent(name) => {
                write!(f, "Component {name} is already attached to this entity")
            }
            EngineError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            EngineError::NotFound(msg) => write!(f, "Not found: {msg}"),
            EngineError::Singular => write!(f, "Matrix is singular and cannot be inverted"),
            EngineError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            EngineError::DeserializationError(msg) => write!(f, "Deserialization error: {msg}"),
            EngineError::IoError(msg) => write!(f, "IO error: {msg}"),
            EngineError::ConfigError(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::IoError(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;
