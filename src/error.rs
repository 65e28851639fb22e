//! Error types shared by the tour core.
//!
//! Each concern gets its own enum so callers can match on exactly the failures
//! an operation can produce. Boundary conditions such as undoing an empty
//! history are not errors; those operations simply return `false`.

use thiserror::Error;

use crate::model::{HotspotId, SceneId};

/// Errors raised when an operation references scene data that does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// No scene with this id is registered
    #[error("Scene not found: {id}")]
    NotFound {
        /// The id that was looked up
        id: SceneId,
    },

    /// The scene exists but has no hotspot with this id
    #[error("Hotspot {hotspot} not found in scene {scene}")]
    HotspotNotFound {
        /// Scene that was searched
        scene: SceneId,
        /// The missing hotspot id
        hotspot: HotspotId,
    },
}

impl SceneError {
    /// Create a not-found error for a scene id.
    pub fn not_found(id: impl Into<SceneId>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

/// Failures while fetching or decoding an image source.
///
/// `Clone` is required because one in-flight load can be awaited by several
/// callers, and each of them receives the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The source could not be read
    #[error("Failed to fetch '{reference}': {message}")]
    Fetch {
        /// Image reference that was requested
        reference: String,
        /// Underlying cause
        message: String,
    },

    /// The source was readable but contained no bytes
    #[error("Image source '{reference}' is empty")]
    EmptySource {
        /// Image reference that was requested
        reference: String,
    },

    /// The bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The decoded image reports a zero-sized axis
    #[error("Image has zero dimensions ({width}x{height})")]
    ZeroDimensions {
        /// Decoded width
        width: u32,
        /// Decoded height
        height: u32,
    },

    /// The thumbnail could not be encoded
    #[error("Failed to encode thumbnail: {0}")]
    Encode(String),
}

impl LoadError {
    /// Create a fetch error for a reference.
    pub fn fetch(reference: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            reference: reference.into(),
            message: message.to_string(),
        }
    }
}

/// Error returned by an event handler or history listener.
///
/// Faults are logged where the subscriber is invoked and never reach the
/// emitter; the remaining subscribers still run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerFault {
    message: String,
}

impl HandlerFault {
    /// Create a fault with a description of what went wrong.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The fault description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of a reversible action.
///
/// A failed `execute` leaves the history untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action referenced missing scene data
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The action refused to run in the current state
    #[error("{0}")]
    Rejected(String),
}
