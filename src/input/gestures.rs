//! Touch gesture recognition.
//!
//! [`GestureRecognizer`] is a pure state machine: the platform feeds it touch
//! samples with timestamps and calls [`tick`](GestureRecognizer::tick) once
//! per frame. Timers (long press) and momentum (inertia) are evaluated on
//! `tick`, so nothing here spawns tasks or reads the clock.

use std::time::Duration;

use serde::Serialize;
use web_time::Instant;

use crate::event_bus::{
    Event, EventBus, GESTURE_DOUBLE_TAP, GESTURE_DRAG, GESTURE_INERTIA, GESTURE_LONG_PRESS,
    GESTURE_PINCH,
};

/// Frame duration velocities are normalised to (~60 fps).
const FRAME_MS: f64 = 16.0;
/// Release speed above which inertia starts.
const INERTIA_START_SPEED: f64 = 0.5;
/// Speed below which inertia stops.
const INERTIA_STOP_SPEED: f64 = 0.1;

/// One contact point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &TouchPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn midpoint(&self, other: &TouchPoint) -> TouchPoint {
        TouchPoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A recognised gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Gesture {
    /// One-finger movement since the previous sample
    #[serde(rename_all = "camelCase")]
    Drag {
        delta_x: f64,
        delta_y: f64,
        x: f64,
        y: f64,
    },
    /// Two-finger zoom relative to the starting distance
    #[serde(rename_all = "camelCase")]
    Pinch {
        scale: f64,
        center_x: f64,
        center_y: f64,
    },
    DoubleTap { x: f64, y: f64 },
    LongPress { x: f64, y: f64 },
    /// Momentum frame after a fast drag
    #[serde(rename_all = "camelCase")]
    Inertia { delta_x: f64, delta_y: f64 },
}

impl Gesture {
    /// Event name this gesture is published under.
    pub fn event_name(&self) -> &'static str {
        match self {
            Gesture::Drag { .. } => GESTURE_DRAG,
            Gesture::Pinch { .. } => GESTURE_PINCH,
            Gesture::DoubleTap { .. } => GESTURE_DOUBLE_TAP,
            Gesture::LongPress { .. } => GESTURE_LONG_PRESS,
            Gesture::Inertia { .. } => GESTURE_INERTIA,
        }
    }

    /// Publish on the bus under [`event_name`](Self::event_name).
    pub fn publish(&self, bus: &EventBus) {
        bus.emit(self.event_name(), &Event::Gesture(*self));
    }
}

/// Recogniser settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub enable_drag: bool,
    pub enable_pinch: bool,
    pub enable_double_tap: bool,
    pub enable_long_press: bool,
    pub enable_inertia: bool,
    /// Hold time before a still contact counts as a long press
    pub long_press_delay: Duration,
    /// Maximum gap between taps of a double tap
    pub double_tap_delay: Duration,
    /// Velocity multiplier applied every inertia frame
    pub inertia_friction: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enable_drag: true,
            enable_pinch: true,
            enable_double_tap: true,
            enable_long_press: true,
            enable_inertia: true,
            long_press_delay: Duration::from_millis(500),
            double_tap_delay: Duration::from_millis(300),
            inertia_friction: 0.95,
        }
    }
}

/// Turns raw touch samples into [`Gesture`]s.
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    touching: bool,
    last: TouchPoint,
    /// Pixels per frame
    velocity: (f64, f64),
    last_time: Option<Instant>,
    last_tap: Option<Instant>,
    /// Pending long press: fire time and position
    long_press: Option<(Instant, TouchPoint)>,
    initial_distance: f64,
    inertia_active: bool,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            touching: false,
            last: TouchPoint::new(0.0, 0.0),
            velocity: (0.0, 0.0),
            last_time: None,
            last_tap: None,
            long_press: None,
            initial_distance: 0.0,
            inertia_active: false,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Whether momentum frames are still being produced.
    pub fn is_inertia_active(&self) -> bool {
        self.inertia_active
    }

    /// Contacts went down. `touches` holds every active contact.
    pub fn touch_start(&mut self, touches: &[TouchPoint], now: Instant) -> Vec<Gesture> {
        self.touching = true;
        self.last_time = Some(now);
        self.inertia_active = false;

        match touches {
            [touch] => {
                self.last = *touch;
                self.velocity = (0.0, 0.0);

                if self.config.enable_double_tap {
                    let is_double = self
                        .last_tap
                        .is_some_and(|tap| now.duration_since(tap) < self.config.double_tap_delay);
                    if is_double {
                        self.last_tap = None;
                        self.long_press = None;
                        return vec![Gesture::DoubleTap {
                            x: touch.x,
                            y: touch.y,
                        }];
                    }
                    self.last_tap = Some(now);
                }

                if self.config.enable_long_press {
                    self.long_press = Some((now + self.config.long_press_delay, *touch));
                }
            }
            [a, b, ..] if self.config.enable_pinch => {
                self.initial_distance = a.distance(b);
                self.long_press = None;
            }
            _ => {}
        }
        Vec::new()
    }

    /// Contacts moved.
    pub fn touch_move(&mut self, touches: &[TouchPoint], now: Instant) -> Vec<Gesture> {
        if !self.touching {
            return Vec::new();
        }
        let dt_ms = self
            .last_time
            .map(|t| now.duration_since(t).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);

        let mut gestures = Vec::new();
        match touches {
            [touch] if self.config.enable_drag => {
                let delta_x = touch.x - self.last.x;
                let delta_y = touch.y - self.last.y;
                if dt_ms > 0.0 {
                    self.velocity = (delta_x / dt_ms * FRAME_MS, delta_y / dt_ms * FRAME_MS);
                }
                gestures.push(Gesture::Drag {
                    delta_x,
                    delta_y,
                    x: touch.x,
                    y: touch.y,
                });
                self.last = *touch;
                self.long_press = None;
            }
            [a, b, ..] if self.config.enable_pinch && self.initial_distance > 0.0 => {
                let center = a.midpoint(b);
                gestures.push(Gesture::Pinch {
                    scale: a.distance(b) / self.initial_distance,
                    center_x: center.x,
                    center_y: center.y,
                });
            }
            _ => {}
        }

        self.last_time = Some(now);
        gestures
    }

    /// All contacts lifted (or the touch was cancelled).
    pub fn touch_end(&mut self) {
        self.touching = false;
        self.long_press = None;

        let (vx, vy) = self.velocity;
        if self.config.enable_inertia
            && (vx.abs() > INERTIA_START_SPEED || vy.abs() > INERTIA_START_SPEED)
        {
            log::trace!("Gesture: inertia started at ({:.2}, {:.2})", vx, vy);
            self.inertia_active = true;
        }
    }

    /// Advance timers by one frame: fires a due long press and produces the
    /// next inertia frame.
    pub fn tick(&mut self, now: Instant) -> Vec<Gesture> {
        let mut gestures = Vec::new();

        let touching = self.touching;
        if let Some((_, point)) = self.long_press.filter(|(due, _)| touching && now >= *due) {
            self.long_press = None;
            gestures.push(Gesture::LongPress {
                x: point.x,
                y: point.y,
            });
        }

        if self.inertia_active {
            let friction = self.config.inertia_friction;
            self.velocity = (self.velocity.0 * friction, self.velocity.1 * friction);
            let (vx, vy) = self.velocity;
            if vx.abs() < INERTIA_STOP_SPEED && vy.abs() < INERTIA_STOP_SPEED {
                self.inertia_active = false;
            } else {
                gestures.push(Gesture::Inertia {
                    delta_x: vx,
                    delta_y: vy,
                });
            }
        }

        gestures
    }

    /// Drop all in-progress state.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

/// Publish every gesture on the bus, in order.
pub fn publish_all(bus: &EventBus, gestures: &[Gesture]) {
    for gesture in gestures {
        gesture.publish(bus);
    }
}
