//! Data models for the tour: scenes and their hotspots.

mod hotspot;
mod scene;

pub use hotspot::{Hotspot, HotspotId, HotspotKind};
pub use scene::{InitialView, Scene, SceneDraft, SceneId};

pub(crate) use scene::now_millis;
