//! Hotspots: interactive markers anchored at a yaw/pitch on their scene.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::SceneId;

/// Unique identifier for a hotspot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HotspotId(String);

impl HotspotId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(format!("hotspot_{}", uuid::Uuid::new_v4().simple()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HotspotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HotspotId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HotspotId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a hotspot does when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotspotKind {
    /// Shows a title and free text
    Info,
    /// Switches to another scene; `content` holds the target scene id
    Link,
    /// Shows an image
    Image,
}

impl HotspotKind {
    /// Get the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            HotspotKind::Info => "Information",
            HotspotKind::Link => "Scene link",
            HotspotKind::Image => "Image",
        }
    }
}

/// A point of interaction on a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Unique identifier
    pub id: HotspotId,
    /// Behaviour on activation
    #[serde(rename = "type")]
    pub kind: HotspotKind,
    /// Label shown in the tooltip
    pub title: String,
    /// Free text, or the target scene id for links
    pub content: String,
    /// Horizontal angle
    pub yaw: f64,
    /// Vertical angle
    pub pitch: f64,
}

impl Hotspot {
    /// Create a hotspot with a generated id.
    pub fn new(
        kind: HotspotKind,
        title: impl Into<String>,
        content: impl Into<String>,
        yaw: f64,
        pitch: f64,
    ) -> Self {
        Self {
            id: HotspotId::generate(),
            kind,
            title: title.into(),
            content: content.into(),
            yaw,
            pitch,
        }
    }

    /// Informational hotspot.
    pub fn info(title: impl Into<String>, text: impl Into<String>, yaw: f64, pitch: f64) -> Self {
        Self::new(HotspotKind::Info, title, text, yaw, pitch)
    }

    /// Hotspot linking to another scene.
    pub fn link(title: impl Into<String>, target: &SceneId, yaw: f64, pitch: f64) -> Self {
        Self::new(HotspotKind::Link, title, target.as_str(), yaw, pitch)
    }

    /// Target scene of a link hotspot.
    pub fn link_target(&self) -> Option<SceneId> {
        match self.kind {
            HotspotKind::Link => Some(SceneId::from(self.content.as_str())),
            _ => None,
        }
    }
}
