//! Scene records: one panorama node of the tour.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Hotspot;
use crate::constants::{DEFAULT_FOV, DEFAULT_GROUP_ID, DEFAULT_SCENE_NAME};
use crate::loader::Thumbnail;

/// Unique identifier for a scene. Opaque and immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(format!("scene_{}", uuid::Uuid::new_v4().simple()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SceneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&SceneId> for SceneId {
    fn from(id: &SceneId) -> Self {
        id.clone()
    }
}

/// Camera orientation a scene opens with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialView {
    /// Horizontal angle
    pub yaw: f64,
    /// Vertical angle
    pub pitch: f64,
    /// Field of view in degrees
    pub fov: f64,
}

impl Default for InitialView {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            fov: DEFAULT_FOV,
        }
    }
}

/// One panorama node in the tour.
///
/// Holds a reference to the source pixels, never the decoded pixels. Only
/// [`SceneCache`](crate::SceneCache) toggles residency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Unique identifier
    pub id: SceneId,
    /// Display label
    pub name: String,
    /// URL, file path or embedded reference to the source image
    pub image_reference: String,
    /// Small preview for lists and the minimap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    /// Interactive markers, in display order
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
    /// Orientation on open
    #[serde(default)]
    pub initial_view: InitialView,
    /// Logical grouping tag
    pub group_id: String,
    /// Whether decoded resources are resident
    #[serde(default)]
    pub(crate) is_loaded: bool,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at: u64,
}

impl Scene {
    /// Whether the scene's decoded resources are currently resident.
    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    /// Find a hotspot by id.
    pub fn hotspot(&self, id: &str) -> Option<&Hotspot> {
        self.hotspots.iter().find(|h| h.id.as_str() == id)
    }

    /// Build a scene record from a draft, filling defaults.
    pub(crate) fn from_draft(draft: SceneDraft) -> Self {
        Self {
            id: draft.id.unwrap_or_else(SceneId::generate),
            name: draft.name.unwrap_or_else(|| DEFAULT_SCENE_NAME.to_string()),
            image_reference: draft.image_reference,
            thumbnail: draft.thumbnail,
            hotspots: draft.hotspots,
            initial_view: draft.initial_view.unwrap_or_default(),
            group_id: draft
                .group_id
                .unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
            is_loaded: false,
            created_at: now_millis(),
        }
    }
}

/// Input for creating a scene. Missing fields get defaults on creation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneDraft {
    /// Preassigned id; generated when absent
    pub id: Option<SceneId>,
    /// Display label
    pub name: Option<String>,
    /// Source image reference
    pub image_reference: String,
    /// Preview produced by the loader
    pub thumbnail: Option<Thumbnail>,
    /// Initial hotspots
    pub hotspots: Vec<Hotspot>,
    /// Orientation on open
    pub initial_view: Option<InitialView>,
    /// Logical grouping tag
    pub group_id: Option<String>,
}

impl SceneDraft {
    /// Draft for a scene showing the given image.
    pub fn new(image_reference: impl Into<String>) -> Self {
        Self {
            image_reference: image_reference.into(),
            ..Default::default()
        }
    }

    /// Set a preassigned id.
    pub fn with_id(mut self, id: impl Into<SceneId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a thumbnail.
    pub fn with_thumbnail(mut self, thumbnail: Thumbnail) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    /// Set the initial hotspots.
    pub fn with_hotspots(mut self, hotspots: Vec<Hotspot>) -> Self {
        self.hotspots = hotspots;
        self
    }

    /// Set the initial view.
    pub fn with_initial_view(mut self, view: InitialView) -> Self {
        self.initial_view = Some(view);
        self
    }

    /// Set the group.
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
