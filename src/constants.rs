//! Global constants for the tour core

/// Number of scenes allowed to keep decoded resources resident
pub const DEFAULT_MAX_LOADED_SCENES: usize = 5;

/// Undo depth of the history log
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 50;

/// Longest thumbnail edge in pixels
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// Entries kept by the decode cache before the oldest insertion is evicted
pub const DEFAULT_MAX_CACHE_SIZE: usize = 50;

/// Scene switch transition length handed to the viewer
pub const DEFAULT_TRANSITION_DURATION_MS: u32 = 1000;

/// Group assigned to scenes created without one
pub const DEFAULT_GROUP_ID: &str = "default";

/// Name assigned to scenes created without one
pub const DEFAULT_SCENE_NAME: &str = "Untitled scene";

/// Field of view (degrees) a new scene opens with
pub const DEFAULT_FOV: f64 = 90.0;

/// JPEG quality used for thumbnails
pub const THUMBNAIL_JPEG_QUALITY: u8 = 70;

/// References up to this many bytes are used verbatim as cache keys
pub const INLINE_CACHE_KEY_LIMIT: usize = 100;

/// Image load records kept for statistics
pub const MAX_LOAD_TIME_RECORDS: usize = 20;

/// Most recent load records included in a statistics snapshot
pub const RECENT_LOAD_RECORDS: usize = 5;

/// Progress checkpoints (percent) reported while loading
pub mod progress {
    /// Share of the progress bar used by fetching the source
    pub const FETCH_SHARE: f32 = 80.0;
    /// Reported once the thumbnail is being generated
    pub const THUMBNAIL: f32 = 80.0;
    /// Reported after the thumbnail callback
    pub const FINALIZING: f32 = 90.0;
    /// Load finished
    pub const COMPLETE: f32 = 100.0;
}
