// src/gestures/jump.rs
use super::window::{Axis, Direction, MotionRule, MotionWindow};
use super::DetectionOutcome;
use crate::actions::{ActionEvent, GestureKind, KeyboardAction, Persistence};
use crate::skeleton::{JointId, TimedFrame};
use crate::thresholds::WindowThresholds;
use tracing::debug;

const HIP_RISING: MotionRule = MotionRule {
    joints: &[JointId::HipCenter],
    axis: Axis::Y,
    direction: Direction::Increasing,
};

/// Hip-center rising fast enough within the window is a jump.
#[derive(Debug, Clone)]
pub struct JumpDetector {
    window: MotionWindow,
}

impl JumpDetector {
    pub fn new(thresholds: WindowThresholds) -> Self {
        Self { window: MotionWindow::new(HIP_RISING, thresholds) }
    }

    pub fn process(&mut self, frame: &TimedFrame, events: &mut Vec<ActionEvent>) -> DetectionOutcome {
        let outcome = self.window.evaluate(frame);
        if outcome == DetectionOutcome::Detected {
            debug!(frame = frame.frame().frame_number, "jump detected");
            events.push(ActionEvent::keyboard(
                GestureKind::Jump,
                KeyboardAction::Jump,
                Persistence::PressAndRelease,
            ));
        }
        outcome
    }

    pub fn reset(&mut self, _events: &mut Vec<ActionEvent>) {
        self.window.clear();
    }

    pub fn buffered(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{SkeletalFrame, SkeletonBuilder};

    fn frame(n: u64, t: f64, hip_y: f32) -> TimedFrame {
        let skeleton = SkeletonBuilder::standing()
            .joint(JointId::HipCenter, 0.0, hip_y, 2.0)
            .build();
        TimedFrame::from_frame(SkeletalFrame::single(n, t, skeleton))
    }

    #[test]
    fn rising_hip_emits_one_jump_and_clears() {
        let mut detector = JumpDetector::new(WindowThresholds::jump());
        let mut events = Vec::new();

        // 7 cm per 33 ms: crosses 0.3 on the sixth frame.
        let outcomes: Vec<_> = (0..7)
            .map(|i| detector.process(&frame(i, i as f64 * 33.0, i as f32 * 0.07), &mut events))
            .collect();

        assert_eq!(outcomes[0], DetectionOutcome::Insufficient);
        assert_eq!(outcomes[4], DetectionOutcome::NotDetected);
        assert_eq!(outcomes[5], DetectionOutcome::Detected);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_keyboard(KeyboardAction::Jump, Persistence::PressAndRelease));
        // The window restarted after the detection, so the next frame sits alone.
        assert_eq!(outcomes[6], DetectionOutcome::Insufficient);
        assert_eq!(detector.buffered(), 1);
    }

    #[test]
    fn falling_hip_clears_without_events() {
        let mut detector = JumpDetector::new(WindowThresholds::jump());
        let mut events = Vec::new();

        detector.process(&frame(0, 0.0, 0.0), &mut events);
        detector.process(&frame(1, 33.0, 0.1), &mut events);
        let outcome = detector.process(&frame(2, 66.0, 0.08), &mut events);

        assert_eq!(outcome, DetectionOutcome::NotDetected);
        assert_eq!(detector.buffered(), 0);
        assert!(events.is_empty());
    }
}
