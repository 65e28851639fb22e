//! pano_tour - panorama tour editor core
//!
//! Scene lifecycle and resource management for a panorama tour editor: a
//! bounded set of resident scenes with LRU eviction, progressive image loading
//! behind a FIFO decode cache, and a branch-clearing undo/redo history. All
//! components talk through an explicit [`EventBus`].

pub mod commands;
pub mod config;
pub mod constants;
pub mod editor;
pub mod error;
pub mod event_bus;
pub mod history;
pub mod input;
pub mod loader;
pub mod model;
pub mod scene_cache;
pub mod tour;

pub use commands::EditCommand;
pub use config::{AppConfig, ConfigError, LogLevel};
pub use editor::{EditorError, TourEditor};
pub use error::{ActionError, HandlerFault, LoadError, SceneError};
pub use event_bus::{Event, EventBus, Handler};
pub use history::{Action, HistoryConfig, HistoryInfo, HistoryLog};
pub use loader::{CachedImageResult, ImageResourceLoader, LoadOptions, LoaderConfig};
pub use model::{Hotspot, HotspotId, HotspotKind, InitialView, Scene, SceneDraft, SceneId};
pub use scene_cache::{SceneCache, SwitchOptions};
pub use tour::{TourDocument, TourError};
