//! Pointer and keyboard input as seen by the editor.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
        /// 1 for a single click, 2 for a double click.
        click_count: u8,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    /// Wheel notches; negative `delta.y` scrolls up.
    Scroll {
        position: Point,
        delta: Vec2,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Scroll { position, .. } => *position,
        }
    }
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Enter,
    Delete,
    Backspace,
    Character(char),
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Derives click counts for hosts that only report raw presses.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    last_click: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primary-button press and return its click count.
    ///
    /// A press within 500 ms and 5 px of the previous one counts as a double
    /// click. The tracker then resets so a third press starts over.
    pub fn register(&mut self, position: Point, now: Instant) -> u8 {
        if let Some((last_time, last_pos)) = self.last_click {
            let elapsed = now.saturating_duration_since(last_time);
            if elapsed < DOUBLE_CLICK_TIME && position.distance(last_pos) < DOUBLE_CLICK_DISTANCE {
                self.last_click = None;
                return 2;
            }
        }
        self.last_click = Some((now, position));
        1
    }

    pub fn reset(&mut self) {
        self.last_click = None;
    }
}
