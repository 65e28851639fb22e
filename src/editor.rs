//! Editor assembly root.
//!
//! [`TourEditor`] wires one [`EventBus`] into the scene cache, the history log
//! and the shortcut map, and owns the image loader. Every edit goes through
//! the history so it can be undone.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::commands::EditCommand;
use crate::config::AppConfig;
use crate::error::{ActionError, LoadError, SceneError};
use crate::event_bus::{Event, EventBus, HISTORY_CHANGED, Handler, KEY_COMBO};
use crate::history::HistoryLog;
use crate::input::{EditorCommand, KeyEvent, ShortcutEvent, ShortcutMap};
use crate::loader::{ImageResourceLoader, LoadOptions};
use crate::model::{Scene, SceneDraft, SceneId};
use crate::scene_cache::{SceneCache, SwitchOptions};
use crate::tour::{TourDocument, TourError};

/// Errors surfaced by editor operations.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Tour(#[from] TourError),
}

/// The tour editor: scenes, history, loader and shortcuts on one bus.
pub struct TourEditor {
    bus: Rc<EventBus>,
    scenes: SceneCache,
    history: HistoryLog<SceneCache>,
    loader: ImageResourceLoader,
    shortcuts: ShortcutMap,
    /// Shortcuts received on the bus, waiting for `process_shortcuts`
    pending: Rc<RefCell<VecDeque<ShortcutEvent>>>,
    shortcut_handler: Handler,
    switch_options: SwitchOptions,
}

impl TourEditor {
    /// Editor reading images from the filesystem.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_loader(config, ImageResourceLoader::from_files(config.loader_config()))
    }

    /// Editor using a custom loader.
    pub fn with_loader(config: &AppConfig, loader: ImageResourceLoader) -> Self {
        let bus = Rc::new(EventBus::new());
        let scenes =
            SceneCache::with_max_loaded(Rc::clone(&bus), config.preferences.max_loaded_scenes);

        let mut history = HistoryLog::with_config(config.history_config());
        let history_bus = Rc::clone(&bus);
        history.add_listener(move |info| {
            history_bus.emit(HISTORY_CHANGED, &Event::History(*info));
            Ok(())
        });

        // History mutations must not run inside a bus handler, so shortcuts
        // are only queued here.
        let pending = Rc::new(RefCell::new(VecDeque::new()));
        let queue = Rc::clone(&pending);
        let shortcut_handler = bus.on(KEY_COMBO, move |event| {
            if let Some(shortcut) = event.shortcut() {
                queue.borrow_mut().push_back(shortcut.clone());
            }
            Ok(())
        });

        Self {
            bus,
            scenes,
            history,
            loader,
            shortcuts: config.to_shortcut_map(),
            pending,
            shortcut_handler,
            switch_options: config.switch_options(),
        }
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn scenes(&self) -> &SceneCache {
        &self.scenes
    }

    pub fn history(&self) -> &HistoryLog<SceneCache> {
        &self.history
    }

    pub fn loader(&self) -> &ImageResourceLoader {
        &self.loader
    }

    pub fn shortcuts_mut(&mut self) -> &mut ShortcutMap {
        &mut self.shortcuts
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    /// Load an image and add it as a new scene (undoable).
    ///
    /// The scene is named after the file stem and keeps the thumbnail.
    pub async fn import_image(
        &mut self,
        reference: &str,
        options: LoadOptions,
    ) -> Result<SceneId, EditorError> {
        let result = self.loader.load_progressive(reference, options).await?;
        let name = Path::new(reference)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(reference);

        let command = EditCommand::add_scene(
            SceneDraft::new(reference)
                .with_name(name)
                .with_thumbnail(result.thumbnail.clone()),
        );
        let id = command
            .created_scene_id()
            .cloned()
            .unwrap_or_else(SceneId::generate);
        self.history.execute(command, &mut self.scenes)?;
        log::info!("Imported '{}' as scene {}", reference, id);
        Ok(id)
    }

    /// Decode the scene's panorama (through the loader cache) and make it
    /// current.
    pub async fn open_scene(&mut self, id: &str) -> Result<Scene, EditorError> {
        let reference = self
            .scenes
            .get_scene(id)
            .map(|s| s.image_reference.clone())
            .ok_or_else(|| SceneError::not_found(id))?;
        self.loader
            .load_progressive(&reference, LoadOptions::new())
            .await?;
        Ok(self.scenes.switch_scene(id, self.switch_options)?)
    }

    /// Open the scene after the current one, wrapping around.
    pub async fn next_scene(&mut self) -> Result<Option<Scene>, EditorError> {
        self.step_scene(1).await
    }

    /// Open the scene before the current one, wrapping around.
    pub async fn prev_scene(&mut self) -> Result<Option<Scene>, EditorError> {
        self.step_scene(-1).await
    }

    async fn step_scene(&mut self, step: isize) -> Result<Option<Scene>, EditorError> {
        let count = self.scenes.len();
        if count == 0 {
            return Ok(None);
        }
        let target = match self.scenes.current_scene_id() {
            Some(current) => {
                let index = self.scenes.scene_index(current.as_str()).unwrap_or(0) as isize;
                (index + step).rem_euclid(count as isize) as usize
            }
            None => 0,
        };
        let id = self.scenes.get_all_scenes()[target].id.clone();
        self.open_scene(id.as_str()).await.map(Some)
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Run an edit through the history.
    pub fn apply(&mut self, command: EditCommand) -> Result<(), EditorError> {
        self.history.execute(command, &mut self.scenes)?;
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.scenes)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.scenes)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn export_tour(&self) -> TourDocument {
        TourDocument::from_cache(&self.scenes)
    }

    /// Replace the open tour. History is cleared and the saved scene, if
    /// any, is opened.
    pub async fn open_tour(&mut self, document: &TourDocument) -> Result<(), EditorError> {
        document.validate()?;
        let current = document.apply_to(&mut self.scenes);
        self.history.clear();
        if let Some(id) = current {
            self.open_scene(id.as_str()).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Shortcuts
    // ========================================================================

    /// Resolve a key press and publish it on the bus.
    pub fn press_key(&self, event: &KeyEvent, input_focused: bool) -> Option<ShortcutEvent> {
        self.shortcuts.dispatch(event, input_focused, &self.bus)
    }

    /// Run queued shortcut commands the editor handles itself (undo, redo,
    /// scene navigation, deleting the current scene).
    ///
    /// Returns the commands left for the caller, in arrival order.
    pub async fn process_shortcuts(&mut self) -> Vec<EditorCommand> {
        let queued: Vec<ShortcutEvent> = self.pending.borrow_mut().drain(..).collect();
        let mut unhandled = Vec::new();
        for shortcut in queued {
            let outcome = match shortcut.command {
                EditorCommand::Undo => {
                    self.undo();
                    Ok(())
                }
                EditorCommand::Redo => {
                    self.redo();
                    Ok(())
                }
                EditorCommand::NextScene => self.next_scene().await.map(drop),
                EditorCommand::PrevScene => self.prev_scene().await.map(drop),
                EditorCommand::Delete => match self.scenes.current_scene_id().cloned() {
                    Some(id) => self.apply(EditCommand::delete_scene(id)),
                    None => Ok(()),
                },
                other => {
                    unhandled.push(other);
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                log::warn!("Shortcut {} failed: {}", shortcut.combo, e);
            }
        }
        unhandled
    }
}

impl Drop for TourEditor {
    fn drop(&mut self) {
        self.bus.off(KEY_COMBO, &self.shortcut_handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::SCENE_SWITCHED;
    use crate::history::HistoryInfo;
    use crate::loader::{LoaderConfig, MemorySource, RasterCodec};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn editor(images: &[&str], max_loaded: usize) -> TourEditor {
        let source = Rc::new(MemorySource::new());
        for name in images {
            source.insert(*name, png(32, 16));
        }
        let mut config = AppConfig::new();
        config.preferences.max_loaded_scenes = max_loaded;
        let loader = ImageResourceLoader::new(
            source,
            Rc::new(RasterCodec::new()),
            LoaderConfig {
                max_cache_size: 10,
                thumbnail_size: 8,
            },
        );
        TourEditor::with_loader(&config, loader)
    }

    fn import_all(editor: &mut TourEditor, images: &[&str]) -> Vec<SceneId> {
        pollster::block_on(async {
            let mut ids = Vec::new();
            for name in images {
                ids.push(editor.import_image(name, LoadOptions::new()).await.unwrap());
            }
            ids
        })
    }

    #[test]
    fn test_import_creates_named_scene_with_thumbnail() {
        let mut editor = editor(&["rooms/lobby.png"], 5);
        let ids = import_all(&mut editor, &["rooms/lobby.png"]);

        let scene = editor.scenes().get_scene(ids[0].as_str()).unwrap();
        assert_eq!(scene.name, "lobby");
        assert_eq!(scene.image_reference, "rooms/lobby.png");
        let thumbnail = scene.thumbnail.as_ref().unwrap();
        assert_eq!((thumbnail.width, thumbnail.height), (8, 4));
        assert!(!scene.is_loaded());
        assert!(editor.history().can_undo());
    }

    #[test]
    fn test_import_failure_records_nothing() {
        let mut editor = editor(&[], 5);
        let result = pollster::block_on(editor.import_image("missing.png", LoadOptions::new()));
        assert!(matches!(result, Err(EditorError::Load(_))));
        assert!(editor.scenes().is_empty());
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_history_changes_are_published() {
        let mut editor = editor(&["a.png"], 5);
        let seen = Rc::new(RefCell::new(Vec::<HistoryInfo>::new()));
        let log = Rc::clone(&seen);
        editor.bus().on(HISTORY_CHANGED, move |event| {
            log.borrow_mut().extend(event.history().copied());
            Ok(())
        });

        import_all(&mut editor, &["a.png"]);
        assert!(editor.undo());
        assert!(editor.scenes().is_empty());

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].can_undo);
        assert!(seen[1].can_redo);
        assert_eq!(seen[1].current_index, -1);
    }

    #[test]
    fn test_open_scene_decodes_and_switches() {
        let images = ["a.png", "b.png"];
        let mut editor = editor(&images, 5);
        let ids = import_all(&mut editor, &images);

        let scene = pollster::block_on(editor.open_scene(ids[1].as_str())).unwrap();
        assert!(scene.is_loaded());
        assert_eq!(editor.scenes().current_scene_id(), Some(&ids[1]));
        // Import already decoded both; opening reuses the cache
        assert_eq!(editor.loader().decode_count(), 2);

        let missing = pollster::block_on(editor.open_scene("ghost"));
        assert!(matches!(missing, Err(EditorError::Scene(SceneError::NotFound { .. }))));
    }

    #[test]
    fn test_navigation_wraps_and_evicts() {
        let images = ["a.png", "b.png", "c.png", "d.png"];
        let mut editor = editor(&images, 2);
        let ids = import_all(&mut editor, &images);

        pollster::block_on(async {
            let first = editor.next_scene().await.unwrap().unwrap();
            assert_eq!(first.id, ids[0]);
            for _ in 0..3 {
                editor.next_scene().await.unwrap();
            }
            assert_eq!(editor.scenes().current_scene_id(), Some(&ids[3]));
            assert!(editor.scenes().loaded_count() <= 2);

            let wrapped = editor.next_scene().await.unwrap().unwrap();
            assert_eq!(wrapped.id, ids[0]);
            let back = editor.prev_scene().await.unwrap().unwrap();
            assert_eq!(back.id, ids[3]);
        });
    }

    #[test]
    fn test_navigation_on_empty_tour() {
        let mut editor = editor(&[], 5);
        assert!(pollster::block_on(editor.next_scene()).unwrap().is_none());
    }

    #[test]
    fn test_shortcuts_are_queued_then_processed() {
        let images = ["a.png", "b.png"];
        let mut editor = editor(&images, 5);
        let ids = import_all(&mut editor, &images);

        let switched = Rc::new(RefCell::new(Vec::<SceneId>::new()));
        let log = Rc::clone(&switched);
        editor.bus().on(SCENE_SWITCHED, move |event| {
            log.borrow_mut().extend(event.scene().map(|s| s.id.clone()));
            Ok(())
        });

        assert!(editor.press_key(&KeyEvent::new("ArrowRight"), false).is_some());
        assert!(editor.press_key(&KeyEvent::new("s").with_ctrl(), false).is_some());
        assert!(editor.press_key(&KeyEvent::new("z").with_ctrl(), true).is_none());
        // Nothing runs until the queue is processed
        assert!(switched.borrow().is_empty());

        let unhandled = pollster::block_on(editor.process_shortcuts());
        assert_eq!(unhandled, vec![EditorCommand::Save]);
        assert_eq!(*switched.borrow(), vec![ids[0].clone()]);

        editor.press_key(&KeyEvent::new("Delete"), false);
        pollster::block_on(editor.process_shortcuts());
        assert!(editor.scenes().get_scene(ids[0].as_str()).is_none());
        assert_eq!(editor.scenes().current_scene_id(), Some(&ids[1]));

        editor.press_key(&KeyEvent::new("z").with_meta(), false);
        pollster::block_on(editor.process_shortcuts());
        assert!(editor.scenes().get_scene(ids[0].as_str()).is_some());
        assert_eq!(editor.scenes().current_scene_id(), Some(&ids[0]));
    }

    #[test]
    fn test_drop_unsubscribes_shortcut_handler() {
        let editor = editor(&[], 5);
        let bus = Rc::clone(editor.bus());
        assert_eq!(bus.listener_count(KEY_COMBO), 1);
        drop(editor);
        assert_eq!(bus.listener_count(KEY_COMBO), 0);
    }

    #[test]
    fn test_export_and_reopen_tour() {
        let images = ["a.png", "b.png"];
        let mut editor = editor(&images, 5);
        let ids = import_all(&mut editor, &images);
        pollster::block_on(editor.open_scene(ids[1].as_str())).unwrap();
        editor
            .apply(EditCommand::rename_scene(ids[0].clone(), "Entrance"))
            .unwrap();

        let document = editor.export_tour();
        let mut other = self::editor(&images, 5);
        pollster::block_on(other.open_tour(&document)).unwrap();

        assert_eq!(other.scenes().len(), 2);
        assert_eq!(other.scenes().get_scene(ids[0].as_str()).unwrap().name, "Entrance");
        assert_eq!(other.scenes().current_scene_id(), Some(&ids[1]));
        assert!(!other.history().can_undo());
    }
}
