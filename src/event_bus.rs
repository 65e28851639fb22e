//! Named publish/subscribe registry.
//!
//! The bus decouples producers (scene cache, history, input) from consumers
//! (UI, persistence, minimap). Delivery is synchronous, in registration order,
//! and re-entrant: a handler may emit, subscribe or unsubscribe while it runs.
//!
//! The bus is an ordinary value owned by the application root and shared with
//! `Rc`; there is no process-wide instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::HandlerFault;
use crate::history::HistoryInfo;
use crate::input::{Gesture, ShortcutEvent};
use crate::model::Scene;
use crate::scene_cache::SwitchOptions;

/// A scene was created or restored.
pub const SCENE_ADDED: &str = "scene:added";
/// A scene's resources became resident.
pub const SCENE_LOADED: &str = "scene:loaded";
/// A scene's resources were released.
pub const SCENE_UNLOADED: &str = "scene:unloaded";
/// A scene was permanently removed.
pub const SCENE_REMOVED: &str = "scene:removed";
/// The current scene changed.
pub const SCENE_SWITCHED: &str = "scene:switched";
/// A scene's name, view or hotspots changed.
pub const SCENE_UPDATED: &str = "scene:updated";
/// The history log changed; payload is the info snapshot.
pub const HISTORY_CHANGED: &str = "history:changed";
/// One-finger drag.
pub const GESTURE_DRAG: &str = "gesture:drag";
/// Two-finger pinch.
pub const GESTURE_PINCH: &str = "gesture:pinch";
/// Two taps in quick succession.
pub const GESTURE_DOUBLE_TAP: &str = "gesture:doubleTap";
/// Contact held without moving.
pub const GESTURE_LONG_PRESS: &str = "gesture:longPress";
/// Momentum frame after a fast drag.
pub const GESTURE_INERTIA: &str = "gesture:inertia";
/// A bound key combination was pressed.
pub const KEY_COMBO: &str = "key:combo";

/// Payload delivered with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// No payload
    Empty,
    /// A scene record (added, loaded, unloaded, removed, updated)
    Scene(Scene),
    /// The scene switched to, with the switch options
    SceneSwitched {
        /// The new current scene
        scene: Scene,
        /// Options passed to the switch
        options: SwitchOptions,
    },
    /// History snapshot after a mutation
    History(HistoryInfo),
    /// Recognised touch gesture
    Gesture(Gesture),
    /// Key combination resolved to an editor command
    Shortcut(ShortcutEvent),
}

impl Event {
    /// The scene carried by this event, if any.
    pub fn scene(&self) -> Option<&Scene> {
        match self {
            Event::Scene(scene) | Event::SceneSwitched { scene, .. } => Some(scene),
            _ => None,
        }
    }

    /// The history snapshot carried by this event, if any.
    pub fn history(&self) -> Option<&HistoryInfo> {
        match self {
            Event::History(info) => Some(info),
            _ => None,
        }
    }

    /// The gesture carried by this event, if any.
    pub fn gesture(&self) -> Option<&Gesture> {
        match self {
            Event::Gesture(gesture) => Some(gesture),
            _ => None,
        }
    }

    /// The shortcut carried by this event, if any.
    pub fn shortcut(&self) -> Option<&ShortcutEvent> {
        match self {
            Event::Shortcut(shortcut) => Some(shortcut),
            _ => None,
        }
    }
}

/// A subscriber. Identity is the `Rc` allocation, so the same handler can be
/// registered several times and removed with [`EventBus::off`].
pub type Handler = Rc<dyn Fn(&Event) -> Result<(), HandlerFault>>;

struct Registration {
    handler: Handler,
    once: bool,
}

/// Synchronous, re-entrant publish/subscribe registry.
#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<HashMap<String, Vec<Registration>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a closure. Returns the handle needed to unsubscribe it.
    pub fn on<F>(&self, event: &str, handler: F) -> Handler
    where
        F: Fn(&Event) -> Result<(), HandlerFault> + 'static,
    {
        let handler: Handler = Rc::new(handler);
        self.subscribe(event, Rc::clone(&handler));
        handler
    }

    /// Subscribe an existing handler. Registering it twice makes it run twice.
    pub fn subscribe(&self, event: &str, handler: Handler) {
        self.register(event, handler, false);
    }

    /// Subscribe a closure that runs at most once, then removes itself.
    pub fn once<F>(&self, event: &str, handler: F) -> Handler
    where
        F: Fn(&Event) -> Result<(), HandlerFault> + 'static,
    {
        let handler: Handler = Rc::new(handler);
        self.register(event, Rc::clone(&handler), true);
        handler
    }

    fn register(&self, event: &str, handler: Handler, once: bool) {
        self.handlers
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(Registration { handler, once });
    }

    /// Remove the first registration of `handler` for `event`. Unknown
    /// handlers are ignored.
    pub fn off(&self, event: &str, handler: &Handler) {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(event) else {
            return;
        };
        if let Some(index) = list.iter().position(|r| Rc::ptr_eq(&r.handler, handler)) {
            list.remove(index);
        }
        if list.is_empty() {
            handlers.remove(event);
        }
    }

    /// Deliver `payload` to every handler registered for `event` at the time
    /// of the call, in registration order. Handlers removed by an earlier
    /// handler in the same emit are skipped.
    ///
    /// A handler returning an error is logged and the remaining handlers
    /// still run.
    pub fn emit(&self, event: &str, payload: &Event) {
        // Snapshot so handlers can touch the registry while we iterate.
        let snapshot: Vec<(Handler, bool)> = match self.handlers.borrow().get(event) {
            Some(list) => list
                .iter()
                .map(|r| (Rc::clone(&r.handler), r.once))
                .collect(),
            None => return,
        };

        for (handler, once) in snapshot {
            // A once-handler may already have fired from a nested emit.
            if once && !self.take_once(event, &handler) {
                continue;
            }
            // An earlier handler may have called `off` on this one.
            if !once && !self.is_registered(event, &handler) {
                continue;
            }
            if let Err(fault) = handler(payload) {
                log::error!("EventBus: error in handler for \"{}\": {}", event, fault);
            }
        }
    }

    /// Remove a once-registration before it fires. Returns false if it is
    /// already gone.
    fn take_once(&self, event: &str, handler: &Handler) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let Some(index) = list
            .iter()
            .position(|r| r.once && Rc::ptr_eq(&r.handler, handler))
        else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            handlers.remove(event);
        }
        true
    }

    fn is_registered(&self, event: &str, handler: &Handler) -> bool {
        self.handlers
            .borrow()
            .get(event)
            .is_some_and(|list| list.iter().any(|r| Rc::ptr_eq(&r.handler, handler)))
    }

    /// Remove every registration for every event.
    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }

    /// Number of handlers registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers
            .borrow()
            .get(event)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Names of events with at least one handler, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}
