// src/gestures/mod.rs - The closed set of gesture detectors
pub mod aim_shoot;
pub mod jump;
pub mod mouse_pointer;
pub mod movement;
pub mod window;

pub use aim_shoot::AimShootDetector;
pub use jump::JumpDetector;
pub use mouse_pointer::MousePointerDetector;
pub use movement::MovementDetector;
pub use window::{FrameWindow, MotionRule, MotionWindow};

use crate::actions::{ActionEvent, GestureKind};
use crate::config::PipelineConfig;
use crate::skeleton::TimedFrame;

/// Result of feeding one frame to a detector. Only `Detected` and
/// `Cancelled` ever come with events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// Not enough history to compare yet.
    Insufficient,
    NullTrackedSkeleton,
    NotDetected,
    Detected,
    /// A latched gesture was released this frame.
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum Detector {
    Movement(MovementDetector),
    Jump(JumpDetector),
    AimShoot(AimShootDetector),
    MousePointer(MousePointerDetector),
}

impl Detector {
    pub fn build(kind: GestureKind, config: &PipelineConfig) -> Self {
        match kind {
            GestureKind::MoveLeftRight => {
                Detector::Movement(MovementDetector::left_right(config.move_left_right.clone()))
            }
            GestureKind::MoveFrontBack => {
                Detector::Movement(MovementDetector::front_back(config.move_front_back.clone()))
            }
            GestureKind::Jump => Detector::Jump(JumpDetector::new(config.jump.clone())),
            GestureKind::AimShoot => Detector::AimShoot(AimShootDetector::new(config.shoot.clone())),
            GestureKind::MousePointer => {
                Detector::MousePointer(MousePointerDetector::new(config.mouse_pointer.clone()))
            }
        }
    }

    pub fn kind(&self) -> GestureKind {
        match self {
            Detector::Movement(d) => d.kind(),
            Detector::Jump(_) => GestureKind::Jump,
            Detector::AimShoot(_) => GestureKind::AimShoot,
            Detector::MousePointer(_) => GestureKind::MousePointer,
        }
    }

    /// Runs one frame through the detector, appending any events in the
    /// order they should reach the sink.
    pub fn process(&mut self, frame: &TimedFrame, events: &mut Vec<ActionEvent>) -> DetectionOutcome {
        match self {
            Detector::Movement(d) => d.process(frame, events),
            Detector::Jump(d) => d.process(frame, events),
            Detector::AimShoot(d) => d.process(frame, events),
            Detector::MousePointer(d) => d.process(frame, events),
        }
    }

    /// Clears windows and latches. Anything still held is released through
    /// `events`; calibrated thresholds are kept.
    pub fn reset(&mut self, events: &mut Vec<ActionEvent>) {
        match self {
            Detector::Movement(d) => d.reset(events),
            Detector::Jump(d) => d.reset(events),
            Detector::AimShoot(d) => d.reset(events),
            Detector::MousePointer(d) => d.reset(events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_covers_every_kind() {
        let config = PipelineConfig::default();
        for kind in GestureKind::ALL {
            assert_eq!(Detector::build(kind, &config).kind(), kind);
        }
    }
}
