// src/gestures/movement.rs - Stepping left/right or forward/back, held until the feet close
use super::window::{Axis, Direction, MotionRule, MotionWindow};
use super::DetectionOutcome;
use crate::actions::{ActionEvent, GestureKind, KeyboardAction, Persistence};
use crate::skeleton::{JointId, TimedFrame};
use crate::thresholds::MovementThresholds;
use tracing::debug;

/// One direction of travel and the key it holds down.
#[derive(Debug, Clone)]
struct Stride {
    window: MotionWindow,
    action: KeyboardAction,
}

/// Latching movement detector shared by the left/right and front/back
/// gestures. Once a stride is detected the key stays pressed and only the
/// feet-together check runs until it releases.
#[derive(Debug, Clone)]
pub struct MovementDetector {
    kind: GestureKind,
    positive: Stride,
    negative: Stride,
    feet_axis: Axis,
    feet_cancel_distance: f32,
    held: Option<KeyboardAction>,
}

impl MovementDetector {
    pub fn left_right(thresholds: MovementThresholds) -> Self {
        let right = MotionRule {
            joints: &[JointId::AnkleRight],
            axis: Axis::X,
            direction: Direction::Increasing,
        };
        let left = MotionRule {
            joints: &[JointId::AnkleLeft],
            axis: Axis::X,
            direction: Direction::Decreasing,
        };

        Self {
            kind: GestureKind::MoveLeftRight,
            positive: Stride {
                window: MotionWindow::new(right, thresholds.window.clone()),
                action: KeyboardAction::MoveRight,
            },
            negative: Stride {
                window: MotionWindow::new(left, thresholds.window),
                action: KeyboardAction::MoveLeft,
            },
            feet_axis: Axis::X,
            feet_cancel_distance: thresholds.feet_cancel_distance,
            held: None,
        }
    }

    /// Forward is towards the sensor (decreasing Z) and maps to `MoveUp`.
    pub fn front_back(thresholds: MovementThresholds) -> Self {
        const ANKLES: &[JointId] = &[JointId::AnkleRight, JointId::AnkleLeft];
        let forward = MotionRule { joints: ANKLES, axis: Axis::Z, direction: Direction::Decreasing };
        let back = MotionRule { joints: ANKLES, axis: Axis::Z, direction: Direction::Increasing };

        Self {
            kind: GestureKind::MoveFrontBack,
            positive: Stride {
                window: MotionWindow::new(forward, thresholds.window.clone()),
                action: KeyboardAction::MoveUp,
            },
            negative: Stride {
                window: MotionWindow::new(back, thresholds.window),
                action: KeyboardAction::MoveDown,
            },
            feet_axis: Axis::Z,
            feet_cancel_distance: thresholds.feet_cancel_distance,
            held: None,
        }
    }

    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    pub fn held(&self) -> Option<KeyboardAction> {
        self.held
    }

    pub fn process(&mut self, frame: &TimedFrame, events: &mut Vec<ActionEvent>) -> DetectionOutcome {
        if let Some(action) = self.held {
            return self.check_cancel(frame, action, events);
        }

        let outcome = self.positive.window.evaluate(frame);
        if outcome == DetectionOutcome::Detected {
            self.latch(self.positive.action, events);
            return outcome;
        }

        let outcome = self.negative.window.evaluate(frame);
        if outcome == DetectionOutcome::Detected {
            self.latch(self.negative.action, events);
        }
        outcome
    }

    fn latch(&mut self, action: KeyboardAction, events: &mut Vec<ActionEvent>) {
        debug!(gesture = %self.kind, ?action, "movement detected");
        events.push(ActionEvent::keyboard(self.kind, action, Persistence::Press));
        self.held = Some(action);
        self.positive.window.clear();
        self.negative.window.clear();
    }

    fn check_cancel(
        &mut self,
        frame: &TimedFrame,
        action: KeyboardAction,
        events: &mut Vec<ActionEvent>,
    ) -> DetectionOutcome {
        let Some(skeleton) = frame.tracked_skeleton() else {
            return DetectionOutcome::NullTrackedSkeleton;
        };

        let gap = (self.feet_axis.component(&skeleton.position(JointId::FootLeft))
            - self.feet_axis.component(&skeleton.position(JointId::FootRight)))
        .abs();

        if gap < self.feet_cancel_distance {
            debug!(gesture = %self.kind, ?action, gap, "feet together, releasing");
            events.push(ActionEvent::keyboard(self.kind, action, Persistence::Release));
            self.held = None;
            return DetectionOutcome::Cancelled;
        }

        DetectionOutcome::NotDetected
    }

    pub fn reset(&mut self, events: &mut Vec<ActionEvent>) {
        if let Some(action) = self.held.take() {
            events.push(ActionEvent::keyboard(self.kind, action, Persistence::Release));
        }
        self.positive.window.clear();
        self.negative.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{SkeletalFrame, SkeletonBuilder};

    fn timed(n: u64, t: f64, builder: SkeletonBuilder) -> TimedFrame {
        TimedFrame::from_frame(SkeletalFrame::single(n, t, builder.build()))
    }

    /// Right leg swings 0.4 outwards over one second in 60 frames.
    fn stride_right(detector: &mut MovementDetector, events: &mut Vec<ActionEvent>) -> Vec<DetectionOutcome> {
        (0..60u64)
            .map(|i| {
                let dx = 0.4 * i as f32 / 59.0;
                let t = 1000.0 * i as f64 / 59.0;
                let pose = SkeletonBuilder::standing()
                    .offset(JointId::AnkleRight, dx, 0.0, 0.0)
                    .offset(JointId::FootRight, dx, 0.0, 0.0);
                detector.process(&timed(i, t, pose), events)
            })
            .collect()
    }

    #[test]
    fn right_stride_presses_once() {
        let mut detector = MovementDetector::left_right(MovementThresholds::left_right());
        let mut events = Vec::new();

        let outcomes = stride_right(&mut detector, &mut events);

        assert_eq!(outcomes.iter().filter(|o| **o == DetectionOutcome::Detected).count(), 1);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_keyboard(KeyboardAction::MoveRight, Persistence::Press));
        assert_eq!(detector.held(), Some(KeyboardAction::MoveRight));
    }

    #[test]
    fn feet_together_releases_exactly_once() {
        let mut detector = MovementDetector::left_right(MovementThresholds::left_right());
        let mut events = Vec::new();
        stride_right(&mut detector, &mut events);
        events.clear();

        let outcomes: Vec<_> = (100..110u64)
            .map(|i| detector.process(&timed(i, i as f64 * 33.0, SkeletonBuilder::standing()), &mut events))
            .collect();

        assert_eq!(outcomes[0], DetectionOutcome::Cancelled);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_keyboard(KeyboardAction::MoveRight, Persistence::Release));
        assert_eq!(detector.held(), None);
    }

    #[test]
    fn feet_apart_keeps_key_held() {
        let mut detector = MovementDetector::left_right(MovementThresholds::left_right());
        let mut events = Vec::new();
        stride_right(&mut detector, &mut events);
        events.clear();

        let wide = SkeletonBuilder::standing().offset(JointId::FootRight, 0.4, 0.0, 0.0);
        for i in 100..105u64 {
            let outcome = detector.process(&timed(i, i as f64 * 33.0, wide.clone()), &mut events);
            assert_eq!(outcome, DetectionOutcome::NotDetected);
        }
        assert!(events.is_empty());
        assert_eq!(detector.held(), Some(KeyboardAction::MoveRight));
    }

    #[test]
    fn forward_step_presses_move_up() {
        let mut detector = MovementDetector::front_back(MovementThresholds::front_back());
        let mut events = Vec::new();

        // The right ankle passes 0.35 on the thirteenth frame.
        let mut last = DetectionOutcome::Insufficient;
        for i in 0..13u64 {
            let dz = -0.03 * i as f32;
            let pose = SkeletonBuilder::standing()
                .offset(JointId::AnkleRight, 0.0, 0.0, dz)
                .offset(JointId::AnkleLeft, 0.0, 0.0, dz / 2.0);
            last = detector.process(&timed(i, i as f64 * 33.0, pose), &mut events);
        }

        assert_eq!(last, DetectionOutcome::Detected);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_keyboard(KeyboardAction::MoveUp, Persistence::Press));
        assert_eq!(detector.kind(), GestureKind::MoveFrontBack);
    }

    #[test]
    fn reset_releases_held_key() {
        let mut detector = MovementDetector::left_right(MovementThresholds::left_right());
        let mut events = Vec::new();
        stride_right(&mut detector, &mut events);
        events.clear();

        detector.reset(&mut events);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_keyboard(KeyboardAction::MoveRight, Persistence::Release));
        assert_eq!(detector.held(), None);
    }
}
