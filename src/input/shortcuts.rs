//! Keyboard shortcuts for the editor.
//!
//! Key presses are normalised to a [`KeyCombo`] such as `CTRL+Z` and looked
//! up in a [`ShortcutMap`]. Matches are published on the bus as `key:combo`;
//! the editor decides what to do with them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event_bus::{Event, EventBus, KEY_COMBO};

/// Modifier names in the order they appear in a combo.
const MODIFIERS: [&str; 3] = ["CTRL", "ALT", "SHIFT"];

/// A raw key press from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    /// Key value as reported by the platform ("z", "ArrowLeft", " ", ...)
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    /// Command key; treated like Ctrl
    pub meta: bool,
}

impl KeyEvent {
    /// A press of `key` with no modifiers.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// Canonical key combination, e.g. `CTRL+SHIFT+Z`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct KeyCombo(String);

impl KeyCombo {
    /// Parse a user-written combo. Case and spacing are ignored, modifiers
    /// may appear in any order.
    pub fn parse(text: &str) -> Self {
        let mut ctrl = false;
        let mut alt = false;
        let mut shift = false;
        let mut key = None;
        for part in text.split('+') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match part.to_uppercase().as_str() {
                "CTRL" | "CONTROL" | "META" | "CMD" => ctrl = true,
                "ALT" => alt = true,
                "SHIFT" => shift = true,
                other => key = Some(key_name(other)),
            }
        }
        Self::build(ctrl, alt, shift, key)
    }

    /// Combo for a key press. Pure modifier presses yield only modifiers.
    pub fn from_event(event: &KeyEvent) -> Self {
        let upper = event.key.to_uppercase();
        let key = match upper.as_str() {
            "CONTROL" | "ALT" | "SHIFT" | "META" => None,
            _ => Some(key_name(&upper)),
        };
        Self::build(event.ctrl || event.meta, event.alt, event.shift, key)
    }

    fn build(ctrl: bool, alt: bool, shift: bool, key: Option<String>) -> Self {
        let mut parts: Vec<String> = [ctrl, alt, shift]
            .iter()
            .zip(MODIFIERS)
            .filter(|(on, _)| **on)
            .map(|(_, name)| name.to_string())
            .collect();
        parts.extend(key);
        Self(parts.join("+"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Canonical name for a (uppercased) key value.
fn key_name(upper: &str) -> String {
    match upper {
        " " | "SPACEBAR" => "SPACE".to_string(),
        "ARROWLEFT" => "LEFT".to_string(),
        "ARROWRIGHT" => "RIGHT".to_string(),
        "ARROWUP" => "UP".to_string(),
        "ARROWDOWN" => "DOWN".to_string(),
        "DEL" => "DELETE".to_string(),
        "ESC" => "ESCAPE".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeyCombo {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for KeyCombo {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<KeyCombo> for String {
    fn from(combo: KeyCombo) -> Self {
        combo.0
    }
}

/// Editor operations reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorCommand {
    Undo,
    Redo,
    Save,
    Export,
    Delete,
    PrevScene,
    NextScene,
    ToggleHotspots,
    ToggleAutoRotate,
    ToggleFullscreen,
    ShowHelp,
}

impl EditorCommand {
    /// Get the display description for this command.
    pub fn description(&self) -> &'static str {
        match self {
            EditorCommand::Undo => "Undo",
            EditorCommand::Redo => "Redo",
            EditorCommand::Save => "Save project",
            EditorCommand::Export => "Export tour",
            EditorCommand::Delete => "Delete selected",
            EditorCommand::PrevScene => "Previous scene",
            EditorCommand::NextScene => "Next scene",
            EditorCommand::ToggleHotspots => "Show/hide hotspots",
            EditorCommand::ToggleAutoRotate => "Toggle auto-rotate",
            EditorCommand::ToggleFullscreen => "Toggle fullscreen",
            EditorCommand::ShowHelp => "Show shortcuts",
        }
    }
}

/// Payload of a `key:combo` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutEvent {
    /// Normalised combo that was pressed
    pub combo: KeyCombo,
    /// Command bound to it
    pub command: EditorCommand,
}

/// Combo to command table.
#[derive(Debug, Clone)]
pub struct ShortcutMap {
    bindings: HashMap<KeyCombo, EditorCommand>,
    enabled: bool,
}

impl Default for ShortcutMap {
    fn default() -> Self {
        let mut map = Self::empty();
        for (combo, command) in [
            ("CTRL+Z", EditorCommand::Undo),
            ("CTRL+Y", EditorCommand::Redo),
            ("CTRL+S", EditorCommand::Save),
            ("CTRL+E", EditorCommand::Export),
            ("DELETE", EditorCommand::Delete),
            ("LEFT", EditorCommand::PrevScene),
            ("RIGHT", EditorCommand::NextScene),
            ("H", EditorCommand::ToggleHotspots),
            ("SPACE", EditorCommand::ToggleAutoRotate),
            ("F", EditorCommand::ToggleFullscreen),
            ("?", EditorCommand::ShowHelp),
        ] {
            map.register(combo, command);
        }
        map
    }
}

impl ShortcutMap {
    /// Map with the default bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map with no bindings.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
            enabled: true,
        }
    }

    /// Bind a combo, replacing any previous binding for it.
    pub fn register(&mut self, combo: impl Into<KeyCombo>, command: EditorCommand) {
        let combo = combo.into();
        let previous = self.bindings.insert(combo.clone(), command);
        if let Some(previous) = previous.filter(|p| *p != command) {
            log::debug!("Shortcut {} rebound from {:?} to {:?}", combo, previous, command);
        }
    }

    /// Remove a binding. Returns the command it was bound to.
    pub fn unregister(&mut self, combo: impl Into<KeyCombo>) -> Option<EditorCommand> {
        self.bindings.remove(&combo.into())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Command bound to `combo`.
    pub fn command_for(&self, combo: &KeyCombo) -> Option<EditorCommand> {
        self.bindings.get(combo).copied()
    }

    /// First combo (in sorted order) bound to `command`.
    pub fn combo_for(&self, command: EditorCommand) -> Option<KeyCombo> {
        self.bindings
            .iter()
            .filter(|(_, c)| **c == command)
            .map(|(combo, _)| combo.clone())
            .min()
    }

    /// All bindings, sorted by combo.
    pub fn all(&self) -> Vec<(KeyCombo, EditorCommand)> {
        let mut all: Vec<_> = self
            .bindings
            .iter()
            .map(|(combo, command)| (combo.clone(), *command))
            .collect();
        all.sort();
        all
    }

    /// Resolve a key press. Nothing matches while disabled or while a text
    /// input has focus.
    pub fn resolve(&self, event: &KeyEvent, input_focused: bool) -> Option<ShortcutEvent> {
        if !self.enabled || input_focused {
            return None;
        }
        let combo = KeyCombo::from_event(event);
        let command = self.command_for(&combo)?;
        Some(ShortcutEvent { combo, command })
    }

    /// Resolve a key press and publish the match on the bus.
    pub fn dispatch(
        &self,
        event: &KeyEvent,
        input_focused: bool,
        bus: &EventBus,
    ) -> Option<ShortcutEvent> {
        let shortcut = self.resolve(event, input_focused)?;
        log::debug!("Shortcut {} -> {:?}", shortcut.combo, shortcut.command);
        bus.emit(KEY_COMBO, &Event::Shortcut(shortcut.clone()));
        Some(shortcut)
    }
}
