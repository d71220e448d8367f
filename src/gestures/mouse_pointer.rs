// src/gestures/mouse_pointer.rs
use super::DetectionOutcome;
use crate::actions::{ActionEvent, GestureKind};
use crate::skeleton::{JointId, Skeleton, TimedFrame};
use crate::thresholds::MousePointerConfig;
use nalgebra::Vector2;
use tracing::trace;

/// Relative pointer driven by the left wrist while the left hand is pushed
/// out in front of the chest and above the hips.
#[derive(Debug, Clone)]
pub struct MousePointerDetector {
    config: MousePointerConfig,
    previous: Option<Vector2<f32>>,
}

impl MousePointerDetector {
    pub fn new(config: MousePointerConfig) -> Self {
        Self { config, previous: None }
    }

    pub fn is_engaged(&self) -> bool {
        self.previous.is_some()
    }

    pub fn inside_box(&self, skeleton: &Skeleton) -> bool {
        let bound = self.config.box_depth_ratio
            * (skeleton.position(JointId::Head).y - skeleton.position(JointId::Spine).y);
        let reach = skeleton.position(JointId::Spine).z - skeleton.position(JointId::HandLeft).z;
        if reach < bound {
            return false;
        }

        let wrist_y = skeleton.position(JointId::WristLeft).y;
        wrist_y >= skeleton.position(JointId::HipLeft).y && wrist_y >= skeleton.position(JointId::HipRight).y
    }

    pub fn process(&mut self, frame: &TimedFrame, events: &mut Vec<ActionEvent>) -> DetectionOutcome {
        let Some(skeleton) = frame.tracked_skeleton() else {
            return DetectionOutcome::NullTrackedSkeleton;
        };

        if !self.inside_box(skeleton) {
            if self.previous.take().is_some() {
                trace!("pointer hand left the box");
                return DetectionOutcome::Cancelled;
            }
            return DetectionOutcome::NotDetected;
        }

        let wrist = skeleton.position(JointId::WristLeft).xy();
        let Some(previous) = self.previous.replace(wrist) else {
            // First frame inside the box only seeds the reference point.
            return DetectionOutcome::Insufficient;
        };

        let delta = wrist - previous;
        let dx = (delta.x * self.config.scale_x) as i32;
        let dy = (-delta.y * self.config.scale_y) as i32;
        events.push(ActionEvent::mouse_move(GestureKind::MousePointer, dx, dy));
        DetectionOutcome::Detected
    }

    pub fn reset(&mut self, _events: &mut Vec<ActionEvent>) {
        self.previous = None;
    }
}
