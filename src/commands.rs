//! Reversible editor commands for the tour.
//!
//! Each command captures whatever it needs to reverse itself the first time it
//! runs. Redo re-applies those same records, so ids and timestamps survive an
//! undo/redo round trip.

use crate::error::{ActionError, SceneError};
use crate::history::Action;
use crate::model::{Hotspot, HotspotId, InitialView, Scene, SceneDraft, SceneId};
use crate::scene_cache::{SceneCache, SwitchOptions};

/// A scene removed by [`EditCommand::DeleteScene`], kept for undo.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedScene {
    /// The full record, hotspots included
    pub scene: Scene,
    /// Position in display order before removal
    pub index: usize,
    /// Whether the scene was being viewed
    pub was_current: bool,
}

// ============================================================================
// Command Types
// ============================================================================

/// A reversible mutation of the scene collection.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// Create a scene
    AddScene {
        /// Creation input; always carries an id
        draft: SceneDraft,
        /// Record produced by the first execute
        created: Option<(Scene, usize)>,
    },
    /// Delete a scene and its hotspots
    DeleteScene {
        /// Scene to delete
        id: SceneId,
        /// What was removed (stored for undo)
        removed: Option<RemovedScene>,
    },
    /// Rename a scene
    RenameScene {
        /// Scene to rename
        id: SceneId,
        /// The new name
        name: String,
        /// The name before the change
        previous: Option<String>,
    },
    /// Change the view a scene opens with
    SetInitialView {
        /// Scene to change
        id: SceneId,
        /// The new view
        view: InitialView,
        /// The view before the change
        previous: Option<InitialView>,
    },
    /// Append a hotspot
    AddHotspot {
        /// Owning scene
        scene_id: SceneId,
        /// The hotspot to add
        hotspot: Hotspot,
    },
    /// Remove a hotspot
    RemoveHotspot {
        /// Owning scene
        scene_id: SceneId,
        /// Hotspot to remove
        hotspot_id: HotspotId,
        /// Former position and record (stored for undo)
        removed: Option<(usize, Hotspot)>,
    },
    /// Replace a hotspot with an edited copy carrying the same id
    UpdateHotspot {
        /// Owning scene
        scene_id: SceneId,
        /// The edited hotspot
        hotspot: Hotspot,
        /// The hotspot before the change
        previous: Option<Hotspot>,
    },
    /// Group several commands into one undo step
    Batch {
        /// Description of the batch operation
        description: String,
        /// The commands in this batch
        commands: Vec<EditCommand>,
    },
}

impl EditCommand {
    /// Create a scene. A missing id is generated now so it is stable across
    /// undo and redo.
    pub fn add_scene(mut draft: SceneDraft) -> Self {
        if draft.id.is_none() {
            draft.id = Some(SceneId::generate());
        }
        EditCommand::AddScene {
            draft,
            created: None,
        }
    }

    pub fn delete_scene(id: impl Into<SceneId>) -> Self {
        EditCommand::DeleteScene {
            id: id.into(),
            removed: None,
        }
    }

    pub fn rename_scene(id: impl Into<SceneId>, name: impl Into<String>) -> Self {
        EditCommand::RenameScene {
            id: id.into(),
            name: name.into(),
            previous: None,
        }
    }

    pub fn set_initial_view(id: impl Into<SceneId>, view: InitialView) -> Self {
        EditCommand::SetInitialView {
            id: id.into(),
            view,
            previous: None,
        }
    }

    pub fn add_hotspot(scene_id: impl Into<SceneId>, hotspot: Hotspot) -> Self {
        EditCommand::AddHotspot {
            scene_id: scene_id.into(),
            hotspot,
        }
    }

    pub fn remove_hotspot(scene_id: impl Into<SceneId>, hotspot_id: impl Into<HotspotId>) -> Self {
        EditCommand::RemoveHotspot {
            scene_id: scene_id.into(),
            hotspot_id: hotspot_id.into(),
            removed: None,
        }
    }

    pub fn update_hotspot(scene_id: impl Into<SceneId>, hotspot: Hotspot) -> Self {
        EditCommand::UpdateHotspot {
            scene_id: scene_id.into(),
            hotspot,
            previous: None,
        }
    }

    pub fn batch(description: impl Into<String>, commands: Vec<EditCommand>) -> Self {
        EditCommand::Batch {
            description: description.into(),
            commands,
        }
    }

    /// The scene a command creates, if it is an `AddScene`.
    pub fn created_scene_id(&self) -> Option<&SceneId> {
        match self {
            EditCommand::AddScene { draft, .. } => draft.id.as_ref(),
            _ => None,
        }
    }

    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            EditCommand::AddScene { .. } => "Add scene".to_string(),
            EditCommand::DeleteScene { .. } => "Delete scene".to_string(),
            EditCommand::RenameScene { name, .. } => format!("Rename scene to '{}'", name),
            EditCommand::SetInitialView { .. } => "Set initial view".to_string(),
            EditCommand::AddHotspot { hotspot, .. } => format!("Add {} hotspot", hotspot.kind.name()),
            EditCommand::RemoveHotspot { .. } => "Delete hotspot".to_string(),
            EditCommand::UpdateHotspot { .. } => "Edit hotspot".to_string(),
            EditCommand::Batch { description, .. } => description.clone(),
        }
    }
}

// ============================================================================
// Execution
// ============================================================================

impl Action<SceneCache> for EditCommand {
    type Output = ();

    fn name(&self) -> String {
        self.description()
    }

    fn execute(&mut self, cache: &mut SceneCache) -> Result<(), ActionError> {
        match self {
            EditCommand::AddScene { draft, created } => {
                if let Some((scene, index)) = created {
                    cache.restore_scene(scene.clone(), *index);
                    return Ok(());
                }
                let existing = draft
                    .id
                    .as_ref()
                    .filter(|id| cache.get_scene(id.as_str()).is_some());
                if let Some(id) = existing {
                    return Err(ActionError::Rejected(format!("Scene {} already exists", id)));
                }
                let scene = cache.create_scene(draft.clone());
                let index = cache.scene_index(scene.id.as_str()).unwrap_or(cache.len());
                *created = Some((scene, index));
            }
            EditCommand::DeleteScene { id, removed } => {
                let index = cache
                    .scene_index(id.as_str())
                    .ok_or_else(|| SceneError::not_found(&*id))?;
                let was_current = cache.current_scene_id() == Some(&*id);
                let scene = cache
                    .delete_scene(id.as_str())
                    .ok_or_else(|| SceneError::not_found(&*id))?;
                *removed = Some(RemovedScene {
                    scene,
                    index,
                    was_current,
                });
            }
            EditCommand::RenameScene { id, name, previous } => {
                *previous = Some(cache.rename_scene(id.as_str(), name.clone())?);
            }
            EditCommand::SetInitialView { id, view, previous } => {
                *previous = Some(cache.set_initial_view(id.as_str(), *view)?);
            }
            EditCommand::AddHotspot { scene_id, hotspot } => {
                let scene = cache
                    .get_scene(scene_id.as_str())
                    .ok_or_else(|| SceneError::not_found(&*scene_id))?;
                if scene.hotspot(hotspot.id.as_str()).is_some() {
                    return Err(ActionError::Rejected(format!(
                        "Hotspot {} already exists",
                        hotspot.id
                    )));
                }
                cache.add_hotspot(scene_id.as_str(), hotspot.clone())?;
            }
            EditCommand::RemoveHotspot {
                scene_id,
                hotspot_id,
                removed,
            } => {
                *removed = Some(cache.remove_hotspot(scene_id.as_str(), hotspot_id.as_str())?);
            }
            EditCommand::UpdateHotspot {
                scene_id,
                hotspot,
                previous,
            } => {
                *previous = Some(cache.replace_hotspot(scene_id.as_str(), hotspot.clone())?);
            }
            EditCommand::Batch { commands, .. } => {
                run_batch(commands, cache, |cmd, cache| cmd.execute(cache))?;
            }
        }
        Ok(())
    }

    fn undo(&mut self, cache: &mut SceneCache) {
        match self {
            EditCommand::AddScene { draft, .. } => {
                if let Some(id) = &draft.id {
                    cache.delete_scene(id.as_str());
                    log::debug!("⏪ Undid add scene {}", id);
                }
            }
            EditCommand::DeleteScene { id, removed } => {
                if let Some(removed) = removed {
                    cache.restore_scene(removed.scene.clone(), removed.index);
                    let reopened = if removed.was_current {
                        cache
                            .switch_scene(id.as_str(), SwitchOptions::default())
                            .map(drop)
                    } else {
                        Ok(())
                    };
                    log_undo_failure(reopened);
                    log::debug!("⏪ Undid delete scene {}", id);
                }
            }
            EditCommand::RenameScene { id, previous, .. } => {
                if let Some(previous) = previous {
                    log_undo_failure(cache.rename_scene(id.as_str(), previous.clone()));
                }
            }
            EditCommand::SetInitialView { id, previous, .. } => {
                if let Some(previous) = previous {
                    log_undo_failure(cache.set_initial_view(id.as_str(), *previous));
                }
            }
            EditCommand::AddHotspot { scene_id, hotspot } => {
                log_undo_failure(cache.remove_hotspot(scene_id.as_str(), hotspot.id.as_str()));
            }
            EditCommand::RemoveHotspot {
                scene_id, removed, ..
            } => {
                if let Some((index, hotspot)) = removed {
                    log_undo_failure(cache.insert_hotspot(
                        scene_id.as_str(),
                        *index,
                        hotspot.clone(),
                    ));
                }
            }
            EditCommand::UpdateHotspot {
                scene_id, previous, ..
            } => {
                if let Some(previous) = previous {
                    log_undo_failure(cache.replace_hotspot(scene_id.as_str(), previous.clone()));
                }
            }
            EditCommand::Batch { commands, .. } => {
                // Undo batch in reverse order
                for cmd in commands.iter_mut().rev() {
                    cmd.undo(cache);
                }
            }
        }
    }

    fn redo(&mut self, cache: &mut SceneCache) -> Result<(), ActionError> {
        match self {
            EditCommand::Batch { commands, .. } => {
                run_batch(commands, cache, |cmd, cache| cmd.redo(cache))
            }
            _ => self.execute(cache),
        }
    }
}

/// Apply `step` to each command in order. On failure the commands already
/// applied are undone, leaving the cache as it was before the batch.
fn run_batch(
    commands: &mut [EditCommand],
    cache: &mut SceneCache,
    step: impl Fn(&mut EditCommand, &mut SceneCache) -> Result<(), ActionError>,
) -> Result<(), ActionError> {
    let mut done = 0;
    let result = commands.iter_mut().try_for_each(|cmd| {
        step(cmd, cache)?;
        done += 1;
        Ok(())
    });
    if result.is_err() {
        for cmd in commands[..done].iter_mut().rev() {
            cmd.undo(cache);
        }
    }
    result
}

fn log_undo_failure<T>(result: Result<T, SceneError>) {
    if let Err(e) = result {
        log::warn!("Undo could not be applied: {}", e);
    }
}
