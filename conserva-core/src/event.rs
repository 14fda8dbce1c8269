//! Input events for editor interaction.

use serde::{Deserialize, Serialize};

use crate::object::Point;

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed.
    Down,
    /// Pointer moved.
    Move,
    /// Button released.
    Up,
    /// Second click of a double-click.
    DoubleClick,
}

/// Which button generated a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    /// Primary (usually left) button or touch contact.
    #[default]
    Primary,
    /// Secondary (usually right) button.
    Secondary,
    /// Middle button.
    Middle,
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// Position in screen (viewport) pixels.
    pub position: Point,
    /// Button involved.
    #[serde(default)]
    pub button: PointerButton,
    /// Timestamp in milliseconds since editor start.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl PointerEvent {
    /// Create a primary-button event.
    #[must_use]
    pub const fn new(phase: PointerPhase, x: f64, y: f64) -> Self {
        Self {
            phase,
            position: Point::new(x, y),
            button: PointerButton::Primary,
            timestamp_ms: 0,
        }
    }

    /// Primary-button press.
    #[must_use]
    pub const fn down(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Down, x, y)
    }

    /// Pointer move.
    #[must_use]
    pub const fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::Move, x, y)
    }

    /// Double-click.
    #[must_use]
    pub const fn double_click(x: f64, y: f64) -> Self {
        Self::new(PointerPhase::DoubleClick, x, y)
    }
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    /// Confirm.
    Enter,
    /// Cancel.
    Escape,
    /// Remove the last point.
    Backspace,
    /// Remove the last point.
    Delete,
    /// Anything else.
    Other,
}

impl Key {
    /// Map a DOM-style key name (`"Enter"`, `"Escape"`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Enter" | "NumpadEnter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "Backspace" => Self::Backspace,
            "Delete" | "Del" => Self::Delete,
            _ => Self::Other,
        }
    }
}
