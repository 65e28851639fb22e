//! Scene collection and residency management.
//!
//! Keeping several full-resolution panoramas decoded is expensive, so only a
//! bounded number of scenes stay resident. Residency is ordered by recency of
//! use (LRU), and the scene being viewed is pinned: it is never unloaded.
//!
//! Every change is announced on the [`EventBus`] so that lists, minimaps and
//! persistence can follow along without the cache knowing about them.

use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::constants::{DEFAULT_MAX_LOADED_SCENES, DEFAULT_TRANSITION_DURATION_MS};
use crate::error::SceneError;
use crate::event_bus::{
    Event, EventBus, SCENE_ADDED, SCENE_LOADED, SCENE_REMOVED, SCENE_SWITCHED, SCENE_UNLOADED,
    SCENE_UPDATED,
};
use crate::model::{Hotspot, InitialView, Scene, SceneDraft, SceneId};

/// Options forwarded with a scene switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchOptions {
    /// Length of the visual transition
    pub transition_duration_ms: u32,
}

impl Default for SwitchOptions {
    fn default() -> Self {
        Self {
            transition_duration_ms: DEFAULT_TRANSITION_DURATION_MS,
        }
    }
}

/// Owns all scenes and decides which ones keep decoded resources.
pub struct SceneCache {
    /// Scene records by id
    scenes: HashMap<SceneId, Scene>,
    /// Display order
    order: Vec<SceneId>,
    /// Resident scenes, least recently used first
    resident: Vec<SceneId>,
    /// Scene being viewed
    current: Option<SceneId>,
    /// Residency cap enforced after every switch
    max_loaded_scenes: usize,
    bus: Rc<EventBus>,
}

impl SceneCache {
    /// Create an empty cache with the default residency cap.
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self::with_max_loaded(bus, DEFAULT_MAX_LOADED_SCENES)
    }

    /// Create an empty cache keeping at most `max_loaded_scenes` resident.
    pub fn with_max_loaded(bus: Rc<EventBus>, max_loaded_scenes: usize) -> Self {
        Self {
            scenes: HashMap::new(),
            order: Vec::new(),
            resident: Vec::new(),
            current: None,
            max_loaded_scenes,
            bus,
        }
    }

    /// The bus this cache publishes on.
    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn max_loaded_scenes(&self) -> usize {
        self.max_loaded_scenes
    }

    /// Change the residency cap and enforce it immediately.
    pub fn set_max_loaded_scenes(&mut self, max_loaded_scenes: usize) {
        self.max_loaded_scenes = max_loaded_scenes;
        self.unload_inactive_scenes(max_loaded_scenes);
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn get_scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    /// All scenes in display order.
    pub fn get_all_scenes(&self) -> Vec<&Scene> {
        self.order.iter().filter_map(|id| self.scenes.get(id)).collect()
    }

    pub fn get_current_scene(&self) -> Option<&Scene> {
        self.current.as_ref().and_then(|id| self.scenes.get(id))
    }

    pub fn current_scene_id(&self) -> Option<&SceneId> {
        self.current.as_ref()
    }

    /// Position of a scene in display order.
    pub fn scene_index(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|s| s.as_str() == id)
    }

    /// Resident scene ids, least recently used first.
    pub fn resident_ids(&self) -> &[SceneId] {
        &self.resident
    }

    pub fn loaded_count(&self) -> usize {
        self.resident.len()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Register a new scene. Nothing is decoded.
    ///
    /// Reusing an existing id replaces that record in place; its position and
    /// residency are kept.
    pub fn create_scene(&mut self, draft: SceneDraft) -> Scene {
        let mut scene = Scene::from_draft(draft);
        match self.scenes.get(&scene.id) {
            Some(existing) => {
                log::warn!("SceneCache: replacing existing scene {}", scene.id);
                scene.is_loaded = existing.is_loaded;
            }
            None => self.order.push(scene.id.clone()),
        }
        self.scenes.insert(scene.id.clone(), scene.clone());
        log::debug!("SceneCache: added scene {} '{}'", scene.id, scene.name);
        self.bus.emit(SCENE_ADDED, &Event::Scene(scene.clone()));
        scene
    }

    /// Put a previously removed scene back at `index` (clamped to the end).
    /// The restored scene is not resident.
    pub fn restore_scene(&mut self, mut scene: Scene, index: usize) {
        scene.is_loaded = false;
        self.order.retain(|id| *id != scene.id);
        self.resident.retain(|id| *id != scene.id);
        let index = index.min(self.order.len());
        self.order.insert(index, scene.id.clone());
        self.scenes.insert(scene.id.clone(), scene.clone());
        log::debug!("SceneCache: restored scene {} at {}", scene.id, index);
        self.bus.emit(SCENE_ADDED, &Event::Scene(scene));
    }

    /// Make `id` the current scene, loading it first if needed, then enforce
    /// the residency cap.
    pub fn switch_scene(&mut self, id: &str, options: SwitchOptions) -> Result<Scene, SceneError> {
        let Some(scene) = self.scenes.get(id) else {
            return Err(SceneError::not_found(id));
        };
        let scene_id = scene.id.clone();
        if !scene.is_loaded {
            self.load_scene(id);
        }

        self.current = Some(scene_id.clone());
        self.touch(&scene_id);

        let scene = self.scene_snapshot(&scene_id)?;
        log::debug!("SceneCache: switched to {}", scene_id);
        self.bus.emit(
            SCENE_SWITCHED,
            &Event::SceneSwitched {
                scene: scene.clone(),
                options,
            },
        );

        self.unload_inactive_scenes(self.max_loaded_scenes);
        Ok(scene)
    }

    /// Mark a scene resident. Returns false for unknown ids; already resident
    /// scenes are left as they are.
    pub fn load_scene(&mut self, id: &str) -> bool {
        let Some(scene) = self.scenes.get_mut(id) else {
            return false;
        };
        if scene.is_loaded {
            return true;
        }
        scene.is_loaded = true;
        let snapshot = scene.clone();
        self.resident.push(snapshot.id.clone());
        log::debug!("SceneCache: loaded {} ({} resident)", id, self.resident.len());
        self.bus.emit(SCENE_LOADED, &Event::Scene(snapshot));
        true
    }

    /// Release a scene's resources. The current scene and unknown ids are
    /// ignored. Returns whether the scene was unloaded.
    pub fn unload_scene(&mut self, id: &str) -> bool {
        if self.current.as_ref().is_some_and(|c| c.as_str() == id) {
            return false;
        }
        let Some(scene) = self.scenes.get_mut(id) else {
            return false;
        };
        let was_loaded = scene.is_loaded;
        scene.is_loaded = false;
        let snapshot = scene.clone();
        self.resident.retain(|r| r.as_str() != id);
        if was_loaded {
            log::debug!("SceneCache: unloaded {}", id);
            self.bus.emit(SCENE_UNLOADED, &Event::Scene(snapshot));
        }
        was_loaded
    }

    /// Unload least recently used scenes until at most `keep_count` are
    /// resident. The current scene is never chosen. Returns the unloaded ids.
    pub fn unload_inactive_scenes(&mut self, keep_count: usize) -> Vec<SceneId> {
        if self.resident.len() <= keep_count {
            return Vec::new();
        }
        let excess = self.resident.len() - keep_count;
        let victims: Vec<SceneId> = self
            .resident
            .iter()
            .filter(|id| Some(*id) != self.current.as_ref())
            .take(excess)
            .cloned()
            .collect();

        for id in &victims {
            self.unload_scene(id.as_str());
        }
        if !victims.is_empty() {
            log::debug!(
                "SceneCache: evicted {} scene(s), {} resident",
                victims.len(),
                self.resident.len()
            );
        }
        victims
    }

    /// Remove a scene permanently, hotspots included.
    ///
    /// If it was current, another scene (the first remaining one) becomes
    /// current after `scene:removed` has been published.
    pub fn delete_scene(&mut self, id: &str) -> Option<Scene> {
        if !self.scenes.contains_key(id) {
            return None;
        }
        let was_current = self.current.as_ref().is_some_and(|c| c.as_str() == id);
        if was_current {
            self.current = None;
        }
        self.unload_scene(id);

        let mut removed = self.scenes.remove(id)?;
        removed.is_loaded = false;
        self.order.retain(|s| s.as_str() != id);
        self.resident.retain(|s| s.as_str() != id);
        log::debug!("SceneCache: removed scene {}", id);
        self.bus.emit(SCENE_REMOVED, &Event::Scene(removed.clone()));

        let next = self.order.first().cloned().filter(|_| was_current);
        if let Some(next) = next {
            if let Err(e) = self.switch_scene(next.as_str(), SwitchOptions::default()) {
                log::warn!("SceneCache: could not switch after delete: {}", e);
            }
        }
        Some(removed)
    }

    /// Drop every scene and forget the current one. Publishes nothing.
    pub fn clear(&mut self) {
        self.scenes.clear();
        self.order.clear();
        self.resident.clear();
        self.current = None;
        log::debug!("SceneCache: cleared");
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Rename a scene. Returns the previous name.
    pub fn rename_scene(&mut self, id: &str, name: impl Into<String>) -> Result<String, SceneError> {
        let scene = self.scene_mut(id)?;
        let previous = std::mem::replace(&mut scene.name, name.into());
        self.publish_update(id);
        Ok(previous)
    }

    /// Change the opening view. Returns the previous view.
    pub fn set_initial_view(
        &mut self,
        id: &str,
        view: InitialView,
    ) -> Result<InitialView, SceneError> {
        let scene = self.scene_mut(id)?;
        let previous = std::mem::replace(&mut scene.initial_view, view);
        self.publish_update(id);
        Ok(previous)
    }

    /// Append a hotspot to a scene.
    pub fn add_hotspot(&mut self, scene_id: &str, hotspot: Hotspot) -> Result<(), SceneError> {
        let scene = self.scene_mut(scene_id)?;
        scene.hotspots.push(hotspot);
        self.publish_update(scene_id);
        Ok(())
    }

    /// Insert a hotspot at `index` (clamped to the end).
    pub fn insert_hotspot(
        &mut self,
        scene_id: &str,
        index: usize,
        hotspot: Hotspot,
    ) -> Result<(), SceneError> {
        let scene = self.scene_mut(scene_id)?;
        let index = index.min(scene.hotspots.len());
        scene.hotspots.insert(index, hotspot);
        self.publish_update(scene_id);
        Ok(())
    }

    /// Remove a hotspot. Returns its former position and the record.
    pub fn remove_hotspot(
        &mut self,
        scene_id: &str,
        hotspot_id: &str,
    ) -> Result<(usize, Hotspot), SceneError> {
        let scene = self.scene_mut(scene_id)?;
        let index = hotspot_position(scene, hotspot_id)?;
        let hotspot = scene.hotspots.remove(index);
        self.publish_update(scene_id);
        Ok((index, hotspot))
    }

    /// Replace the hotspot with the same id. Returns the previous record.
    pub fn replace_hotspot(
        &mut self,
        scene_id: &str,
        hotspot: Hotspot,
    ) -> Result<Hotspot, SceneError> {
        let scene = self.scene_mut(scene_id)?;
        let index = hotspot_position(scene, hotspot.id.as_str())?;
        let previous = std::mem::replace(&mut scene.hotspots[index], hotspot);
        self.publish_update(scene_id);
        Ok(previous)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn scene_mut(&mut self, id: &str) -> Result<&mut Scene, SceneError> {
        self.scenes.get_mut(id).ok_or_else(|| SceneError::not_found(id))
    }

    fn scene_snapshot(&self, id: &SceneId) -> Result<Scene, SceneError> {
        self.scenes
            .get(id)
            .cloned()
            .ok_or_else(|| SceneError::not_found(id))
    }

    /// Move a resident scene to the most-recently-used end.
    fn touch(&mut self, id: &SceneId) {
        if let Some(pos) = self.resident.iter().position(|r| r == id) {
            let id = self.resident.remove(pos);
            self.resident.push(id);
        }
    }

    fn publish_update(&self, id: &str) {
        if let Some(scene) = self.scenes.get(id) {
            self.bus.emit(SCENE_UPDATED, &Event::Scene(scene.clone()));
        }
    }
}

fn hotspot_position(scene: &Scene, hotspot_id: &str) -> Result<usize, SceneError> {
    scene
        .hotspots
        .iter()
        .position(|h| h.id.as_str() == hotspot_id)
        .ok_or_else(|| SceneError::HotspotNotFound {
            scene: scene.id.clone(),
            hotspot: hotspot_id.into(),
        })
}
