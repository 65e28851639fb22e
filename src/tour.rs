//! Tour persistence.
//!
//! A [`TourDocument`] is the plain serializable form of a scene collection.
//! Residency is runtime state and is never written.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::Thumbnail;
use crate::model::{Hotspot, HotspotId, InitialView, Scene, SceneId, now_millis};
use crate::scene_cache::SceneCache;

/// Current tour file format version.
pub const TOUR_VERSION: u32 = 1;

/// Errors raised while reading, writing or checking a tour.
#[derive(Error, Debug)]
pub enum TourError {
    /// JSON parsing or serialization error
    #[error("Invalid tour JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error when reading/writing the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file was written by a newer format
    #[error("Tour format version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// A scene-link hotspot points at a scene that is not in the tour
    #[error("Hotspot {hotspot} in scene {scene} links to missing scene {target}")]
    DanglingLink {
        scene: SceneId,
        hotspot: HotspotId,
        target: SceneId,
    },
}

/// Persisted fields of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneRecord {
    pub id: SceneId,
    pub name: String,
    pub image_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
    #[serde(default)]
    pub initial_view: InitialView,
    pub group_id: String,
    pub created_at: u64,
}

impl From<&Scene> for SceneRecord {
    fn from(scene: &Scene) -> Self {
        Self {
            id: scene.id.clone(),
            name: scene.name.clone(),
            image_reference: scene.image_reference.clone(),
            thumbnail: scene.thumbnail.clone(),
            hotspots: scene.hotspots.clone(),
            initial_view: scene.initial_view,
            group_id: scene.group_id.clone(),
            created_at: scene.created_at,
        }
    }
}

impl From<SceneRecord> for Scene {
    fn from(record: SceneRecord) -> Self {
        Scene {
            id: record.id,
            name: record.name,
            image_reference: record.image_reference,
            thumbnail: record.thumbnail,
            hotspots: record.hotspots,
            initial_view: record.initial_view,
            group_id: record.group_id,
            is_loaded: false,
            created_at: record.created_at,
        }
    }
}

/// A saved tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourDocument {
    /// Format version
    pub version: u32,
    /// Scenes in display order
    pub scenes: Vec<SceneRecord>,
    /// Scene being viewed when saved
    #[serde(default)]
    pub current_scene_id: Option<SceneId>,
    /// Save time, milliseconds since the Unix epoch
    pub saved_at: u64,
}

impl TourDocument {
    /// Snapshot a scene collection.
    pub fn from_cache(cache: &SceneCache) -> Self {
        Self {
            version: TOUR_VERSION,
            scenes: cache
                .get_all_scenes()
                .into_iter()
                .map(SceneRecord::from)
                .collect(),
            current_scene_id: cache.current_scene_id().cloned(),
            saved_at: now_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String, TourError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TourError> {
        let document: Self = serde_json::from_str(json)?;
        if document.version > TOUR_VERSION {
            return Err(TourError::UnsupportedVersion {
                found: document.version,
                supported: TOUR_VERSION,
            });
        }
        Ok(document)
    }

    /// Write the tour as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), TourError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("💾 Saved tour with {} scenes to {:?}", self.scenes.len(), path);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, TourError> {
        let json = std::fs::read_to_string(path)?;
        let document = Self::from_json(&json)?;
        log::info!("Loaded tour with {} scenes from {:?}", document.scenes.len(), path);
        Ok(document)
    }

    /// Check that every scene-link hotspot targets a scene in the tour.
    pub fn validate(&self) -> Result<(), TourError> {
        let ids: HashSet<&SceneId> = self.scenes.iter().map(|s| &s.id).collect();
        for scene in &self.scenes {
            for hotspot in &scene.hotspots {
                let Some(target) = hotspot.link_target() else {
                    continue;
                };
                if !ids.contains(&target) {
                    return Err(TourError::DanglingLink {
                        scene: scene.id.clone(),
                        hotspot: hotspot.id.clone(),
                        target,
                    });
                }
            }
        }
        Ok(())
    }

    /// Replace the cache contents with this tour. Nothing is made resident.
    ///
    /// Returns the saved current scene if it is part of the tour; switching
    /// to it is left to the caller.
    pub fn apply_to(&self, cache: &mut SceneCache) -> Option<SceneId> {
        cache.clear();
        for record in &self.scenes {
            cache.restore_scene(Scene::from(record.clone()), cache.len());
        }
        self.current_scene_id
            .clone()
            .filter(|id| cache.get_scene(id.as_str()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventBus;
    use crate::model::SceneDraft;
    use crate::scene_cache::SwitchOptions;
    use std::rc::Rc;

    fn sample_cache() -> SceneCache {
        let mut cache = SceneCache::new(Rc::new(EventBus::new()));
        let hall = cache
            .create_scene(SceneDraft::new("hall.jpg").with_id("hall").with_name("Hall"))
            .id;
        let garden = cache
            .create_scene(SceneDraft::new("garden.jpg").with_id("garden"))
            .id;
        cache
            .add_hotspot(hall.as_str(), Hotspot::link("Garden", &garden, 45.0, 0.0))
            .unwrap();
        cache
            .add_hotspot(garden.as_str(), Hotspot::info("Fountain", "1890", -20.0, 5.0))
            .unwrap();
        cache.switch_scene("garden", SwitchOptions::default()).unwrap();
        cache
    }

    #[test]
    fn test_snapshot_and_apply() {
        let cache = sample_cache();
        let document = TourDocument::from_cache(&cache);
        assert_eq!(document.version, TOUR_VERSION);
        assert_eq!(document.scenes.len(), 2);
        assert_eq!(document.current_scene_id, Some(SceneId::from("garden")));

        let mut restored = SceneCache::new(Rc::new(EventBus::new()));
        let current = document.apply_to(&mut restored);
        assert_eq!(current, Some(SceneId::from("garden")));
        assert_eq!(restored.loaded_count(), 0);
        assert!(restored.current_scene_id().is_none());

        let ids: Vec<_> = restored.get_all_scenes().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["hall", "garden"]);
        let hall = restored.get_scene("hall").unwrap();
        assert_eq!(hall, &Scene::from(document.scenes[0].clone()));
        assert_eq!(hall.hotspots.len(), 1);
    }

    #[test]
    fn test_residency_not_persisted() {
        let document = TourDocument::from_cache(&sample_cache());
        let json = document.to_json().unwrap();
        assert!(!json.contains("isLoaded"));
        assert!(json.contains("\"imageReference\": \"hall.jpg\""));
        assert_eq!(TourDocument::from_json(&json).unwrap(), document);
    }

    #[test]
    fn test_validate_reports_dangling_link() {
        let mut document = TourDocument::from_cache(&sample_cache());
        assert!(document.validate().is_ok());

        document.scenes.retain(|s| s.id.as_str() != "garden");
        match document.validate() {
            Err(TourError::DanglingLink { scene, target, .. }) => {
                assert_eq!(scene, SceneId::from("hall"));
                assert_eq!(target, SceneId::from("garden"));
            }
            other => panic!("expected dangling link, got {:?}", other),
        }
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut document = TourDocument::from_cache(&sample_cache());
        document.version = TOUR_VERSION + 1;
        let json = serde_json::to_string(&document).unwrap();
        assert!(matches!(
            TourDocument::from_json(&json),
            Err(TourError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tour.json");
        let document = TourDocument::from_cache(&sample_cache());

        document.save(&path).unwrap();
        assert_eq!(TourDocument::load(&path).unwrap(), document);
        assert!(matches!(
            TourDocument::load(&dir.path().join("missing.json")),
            Err(TourError::Io(_))
        ));
    }

    #[test]
    fn test_stale_current_scene_is_dropped() {
        let mut document = TourDocument::from_cache(&sample_cache());
        document.current_scene_id = Some(SceneId::from("gone"));
        let mut cache = SceneCache::new(Rc::new(EventBus::new()));
        assert_eq!(document.apply_to(&mut cache), None);
        assert_eq!(cache.len(), 2);
    }
}
