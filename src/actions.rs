// src/actions.rs - Discrete input actions emitted by the gesture detectors
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which detector produced an event. Also used to select which workers the
/// pipeline spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    MoveLeftRight,
    MoveFrontBack,
    Jump,
    AimShoot,
    MousePointer,
}

impl GestureKind {
    pub const ALL: [GestureKind; 5] = [
        GestureKind::MoveLeftRight,
        GestureKind::MoveFrontBack,
        GestureKind::Jump,
        GestureKind::AimShoot,
        GestureKind::MousePointer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MoveLeftRight => "move-left-right",
            Self::MoveFrontBack => "move-front-back",
            Self::Jump => "jump",
            Self::AimShoot => "aim-shoot",
            Self::MousePointer => "mouse-pointer",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardAction {
    MoveRight,
    MoveLeft,
    MoveUp,
    MoveDown,
    Jump,
    LongJump,
    Shoot,
    Stop,
    Esc,
    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
    Reload,
    Enter,
    Knife,
    Grenade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseAction {
    RightButton,
    LeftButton,
    WheelUp,
    WheelDown,
    Move,
}

/// How long an action is held by the injection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    Press,
    Release,
    PressAndRelease,
    PressAndHold,
    DoubleClickHold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEvent {
    Keyboard {
        source: GestureKind,
        action: KeyboardAction,
        persistence: Persistence,
    },
    Mouse {
        source: GestureKind,
        action: MouseAction,
        persistence: Persistence,
        x: i32,
        y: i32,
    },
}

impl ActionEvent {
    pub fn keyboard(source: GestureKind, action: KeyboardAction, persistence: Persistence) -> Self {
        Self::Keyboard { source, action, persistence }
    }

    /// Button events carry no coordinates; -1 marks "current cursor position".
    pub fn mouse_button(source: GestureKind, action: MouseAction, persistence: Persistence) -> Self {
        Self::Mouse { source, action, persistence, x: -1, y: -1 }
    }

    /// Relative pointer movement in screen pixels.
    pub fn mouse_move(source: GestureKind, dx: i32, dy: i32) -> Self {
        Self::Mouse {
            source,
            action: MouseAction::Move,
            persistence: Persistence::PressAndRelease,
            x: dx,
            y: dy,
        }
    }

    pub fn source(&self) -> GestureKind {
        match self {
            Self::Keyboard { source, .. } | Self::Mouse { source, .. } => *source,
        }
    }

    pub fn persistence(&self) -> Persistence {
        match self {
            Self::Keyboard { persistence, .. } | Self::Mouse { persistence, .. } => *persistence,
        }
    }

    pub fn is_keyboard(&self, wanted: KeyboardAction, wanted_persistence: Persistence) -> bool {
        matches!(self, Self::Keyboard { action, persistence, .. }
            if *action == wanted && *persistence == wanted_persistence)
    }

    pub fn is_mouse(&self, wanted: MouseAction, wanted_persistence: Persistence) -> bool {
        matches!(self, Self::Mouse { action, persistence, .. }
            if *action == wanted && *persistence == wanted_persistence)
    }
}

impl fmt::Display for ActionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keyboard { source, action, persistence } => {
                write!(f, "[{}] key {:?} {:?}", source, action, persistence)
            }
            Self::Mouse { source, action: MouseAction::Move, x, y, .. } => {
                write!(f, "[{}] mouse move ({}, {})", source, x, y)
            }
            Self::Mouse { source, action, persistence, .. } => {
                write!(f, "[{}] mouse {:?} {:?}", source, action, persistence)
            }
        }
    }
}
