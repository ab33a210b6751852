//! Requested head pose bearings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Head pose the user is asked to assume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bearing {
    #[default]
    Straight,
    Left,
    Right,
    Up,
    Down,
    LeftUp,
    RightUp,
    LeftDown,
    RightDown,
}

impl Bearing {
    /// Every bearing, straight first
    pub const ALL: [Bearing; 9] = [
        Bearing::Straight,
        Bearing::Left,
        Bearing::Right,
        Bearing::Up,
        Bearing::Down,
        Bearing::LeftUp,
        Bearing::RightUp,
        Bearing::LeftDown,
        Bearing::RightDown,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Bearing::Straight => "STRAIGHT",
            Bearing::Left => "LEFT",
            Bearing::Right => "RIGHT",
            Bearing::Up => "UP",
            Bearing::Down => "DOWN",
            Bearing::LeftUp => "LEFT_UP",
            Bearing::RightUp => "RIGHT_UP",
            Bearing::LeftDown => "LEFT_DOWN",
            Bearing::RightDown => "RIGHT_DOWN",
        }
    }

    /// Prompt shown to the user
    pub fn prompt(&self) -> &'static str {
        match self {
            Bearing::Straight => "Look straight at the camera",
            Bearing::Left => "Turn your head to the left",
            Bearing::Right => "Turn your head to the right",
            Bearing::Up => "Tilt your head up",
            Bearing::Down => "Tilt your head down",
            Bearing::LeftUp => "Turn your head to the left and up",
            Bearing::RightUp => "Turn your head to the right and up",
            Bearing::LeftDown => "Turn your head to the left and down",
            Bearing::RightDown => "Turn your head to the right and down",
        }
    }

    pub(crate) fn is_left(&self) -> bool {
        matches!(self, Bearing::Left | Bearing::LeftUp | Bearing::LeftDown)
    }

    pub(crate) fn is_right(&self) -> bool {
        matches!(self, Bearing::Right | Bearing::RightUp | Bearing::RightDown)
    }

    pub(crate) fn is_up(&self) -> bool {
        matches!(self, Bearing::Up | Bearing::LeftUp | Bearing::RightUp)
    }

    pub(crate) fn is_down(&self) -> bool {
        matches!(self, Bearing::Down | Bearing::LeftDown | Bearing::RightDown)
    }
}

impl fmt::Display for Bearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rotation axis evaluated against a bearing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Yaw,
    Pitch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_groups_are_disjoint() {
        for bearing in Bearing::ALL {
            assert!(!(bearing.is_left() && bearing.is_right()), "{bearing}");
            assert!(!(bearing.is_up() && bearing.is_down()), "{bearing}");
        }
        assert!(!Bearing::Straight.is_left());
        assert!(Bearing::RightDown.is_right() && Bearing::RightDown.is_down());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Bearing::LeftUp).unwrap();
        assert_eq!(json, "\"LEFT_UP\"");
        let parsed: Bearing = serde_json::from_str("\"RIGHT_DOWN\"").unwrap();
        assert_eq!(parsed, Bearing::RightDown);
    }
}
