// src/gestures/aim_shoot.rs - Right-arm aim toggle and pull-back shooting
//
// Two independent latches share the input stream: `aiming` (hand raised to
// shoulder height) and `shooting` (hand pulled back towards the body). Every
// distance is scaled by the shoulder width of the first tracked skeleton.

use super::window::{FrameWindow, Span, WindowSpan};
use super::DetectionOutcome;
use crate::actions::{ActionEvent, GestureKind, MouseAction, Persistence};
use crate::skeleton::{JointId, Skeleton, TimedFrame};
use crate::thresholds::{ShootConfig, ShootThresholds, ThresholdCalibrator};
use nalgebra::Vector3;
use tracing::{debug, trace};

const KIND: GestureKind = GestureKind::AimShoot;

#[derive(Debug, Clone)]
pub struct AimShootDetector {
    config: ShootConfig,
    calibrator: ThresholdCalibrator,
    shoot_window: FrameWindow,
    cancel_window: FrameWindow,
    aiming: bool,
    shooting: bool,
    /// Skeleton that triggered the current shot; the tolerance box is
    /// centred on its right hand.
    anchor: Option<Skeleton>,
}

fn hand(skeleton: &Skeleton) -> Vector3<f32> {
    skeleton.position(JointId::HandRight)
}

impl AimShootDetector {
    pub fn new(config: ShootConfig) -> Self {
        Self {
            calibrator: ThresholdCalibrator::new(config.clone()),
            shoot_window: FrameWindow::new(config.buffer_size),
            cancel_window: FrameWindow::new(config.buffer_size),
            config,
            aiming: false,
            shooting: false,
            anchor: None,
        }
    }

    pub fn is_aiming(&self) -> bool {
        self.aiming
    }

    pub fn is_shooting(&self) -> bool {
        self.shooting
    }

    pub fn anchor(&self) -> Option<&Skeleton> {
        self.anchor.as_ref()
    }

    pub fn thresholds(&self) -> Option<&ShootThresholds> {
        self.calibrator.thresholds()
    }

    pub fn process(&mut self, frame: &TimedFrame, events: &mut Vec<ActionEvent>) -> DetectionOutcome {
        let Some(skeleton) = frame.tracked_skeleton() else {
            return DetectionOutcome::NullTrackedSkeleton;
        };
        let Some(thresholds) = self.calibrator.calibrate(skeleton).copied() else {
            return DetectionOutcome::NotDetected;
        };

        let aim = self.update_aim(skeleton, &thresholds, events);
        let shoot = self.update_shoot(frame, skeleton, &thresholds, events);

        match (aim, shoot) {
            (DetectionOutcome::Detected, _) | (_, DetectionOutcome::Detected) => DetectionOutcome::Detected,
            (DetectionOutcome::Cancelled, _) | (_, DetectionOutcome::Cancelled) => DetectionOutcome::Cancelled,
            _ => DetectionOutcome::NotDetected,
        }
    }

    /// Aim is a toggle in the game, so entering and leaving both click the
    /// right button once.
    fn update_aim(
        &mut self,
        skeleton: &Skeleton,
        thresholds: &ShootThresholds,
        events: &mut Vec<ActionEvent>,
    ) -> DetectionOutcome {
        let hand_y = hand(skeleton).y;
        let shoulder_y = skeleton.position(JointId::ShoulderRight).y;

        if !self.aiming {
            let tolerance = self.config.aim_enter_factor * thresholds.aim_y;
            if (hand_y - shoulder_y).abs() <= tolerance {
                debug!(hand_y, shoulder_y, "aim engaged");
                events.push(ActionEvent::mouse_button(KIND, MouseAction::RightButton, Persistence::PressAndRelease));
                self.aiming = true;
                return DetectionOutcome::Detected;
            }
            return DetectionOutcome::NotDetected;
        }

        if hand_y < shoulder_y - self.config.aim_exit_factor * thresholds.aim_box {
            debug!(hand_y, shoulder_y, "aim released");
            events.push(ActionEvent::mouse_button(KIND, MouseAction::RightButton, Persistence::PressAndRelease));
            self.aiming = false;
            return DetectionOutcome::Cancelled;
        }

        DetectionOutcome::NotDetected
    }

    fn update_shoot(
        &mut self,
        frame: &TimedFrame,
        skeleton: &Skeleton,
        thresholds: &ShootThresholds,
        events: &mut Vec<ActionEvent>,
    ) -> DetectionOutcome {
        if !self.shooting && self.shoot_started(frame, thresholds) {
            debug!(frame = frame.frame().frame_number, "shoot detected");
            events.push(ActionEvent::mouse_button(KIND, MouseAction::LeftButton, Persistence::DoubleClickHold));
            self.shooting = true;
            self.cancel_window.clear();
            return DetectionOutcome::Detected;
        }

        // Leaving the box only drops the anchor; the button stays held until
        // the cancel window fires.
        self.inside_shoot_box(skeleton);

        if self.shooting && self.shoot_cancelled(frame, thresholds) {
            debug!(frame = frame.frame().frame_number, "shoot cancelled");
            events.push(ActionEvent::mouse_button(KIND, MouseAction::LeftButton, Persistence::Release));
            self.shooting = false;
            self.anchor = None;
            return DetectionOutcome::Cancelled;
        }

        DetectionOutcome::NotDetected
    }

    /// The hand drifted more than `xy` from the window's oldest position.
    fn strays(span: &WindowSpan, xy: f32) -> bool {
        let latest = hand(&span.latest);
        let oldest = hand(&span.oldest);
        (latest.y - oldest.y).abs() > xy || (latest.x - oldest.x).abs() > xy
    }

    fn shoot_started(&mut self, frame: &TimedFrame, t: &ShootThresholds) -> bool {
        self.shoot_window.push(frame.clone());
        let Span::Ready(span) = self.shoot_window.span() else {
            return false;
        };

        let latest = hand(&span.latest);
        let previous = hand(&span.previous);
        let oldest = hand(&span.oldest);
        let hip_y = span.latest.position(JointId::HipCenter).y;
        let head_y = span.latest.position(JointId::Head).y;

        let rejected = latest.z < previous.z
            || Self::strays(&span, t.shoot_xy)
            || latest.y < hip_y - t.shoot_xy
            || latest.y > head_y + t.shoot_xy;
        if rejected {
            trace!(buffered = self.shoot_window.len(), "shoot window reset");
            self.shoot_window.clear();
            return false;
        }

        if self.within_gesture_time(span.elapsed_ms) && latest.z - oldest.z > t.shoot_distance {
            self.anchor = Some(span.latest);
            self.shoot_window.clear();
            return true;
        }

        false
    }

    fn shoot_cancelled(&mut self, frame: &TimedFrame, t: &ShootThresholds) -> bool {
        self.cancel_window.push(frame.clone());
        let Span::Ready(span) = self.cancel_window.span() else {
            return false;
        };

        let latest = hand(&span.latest);
        let previous = hand(&span.previous);
        let oldest = hand(&span.oldest);
        let hip = span.latest.position(JointId::HipCenter);

        if latest.z > previous.z || Self::strays(&span, t.shoot_xy) {
            self.cancel_window.clear();
            return false;
        }

        let dropped = latest.y < hip.y - t.shoot_xy;
        let far_from_hip = latest.z < hip.z - self.config.far_from_hip_factor * t.shoot_distance;
        let pushed_forward =
            self.within_gesture_time(span.elapsed_ms) && oldest.z - latest.z > t.shoot_distance;

        if dropped || far_from_hip || pushed_forward {
            trace!(dropped, far_from_hip, pushed_forward, "shoot cancel condition");
            self.cancel_window.clear();
            return true;
        }

        false
    }

    fn within_gesture_time(&self, elapsed_ms: f64) -> bool {
        elapsed_ms > self.config.min_gesture_time_ms && elapsed_ms < self.config.gesture_time_ms
    }

    /// Checks the right hand against the tolerance box around the anchor.
    /// Leaving the box on any axis drops the anchor, so every later call
    /// reports false until the next shot re-anchors it.
    pub fn inside_shoot_box(&mut self, skeleton: &Skeleton) -> bool {
        let (Some(anchor), Some(t)) = (self.anchor.as_ref(), self.calibrator.thresholds()) else {
            return false;
        };

        let a = hand(anchor);
        let h = hand(skeleton);
        let outside = h.x > a.x + t.box_x
            || h.x < a.x - t.box_x
            || h.y > a.y + t.box_y
            || h.y < a.y - t.box_y
            || h.z < a.z - t.box_z;

        if outside {
            debug!(x = h.x, y = h.y, z = h.z, "hand left the shoot box");
            self.anchor = None;
            return false;
        }
        true
    }

    /// Drops windows and latches, releasing anything still held. Calibration
    /// survives.
    pub fn reset(&mut self, events: &mut Vec<ActionEvent>) {
        if self.shooting {
            events.push(ActionEvent::mouse_button(KIND, MouseAction::LeftButton, Persistence::Release));
        }
        if self.aiming {
            events.push(ActionEvent::mouse_button(KIND, MouseAction::RightButton, Persistence::PressAndRelease));
        }
        self.shooting = false;
        self.aiming = false;
        self.anchor = None;
        self.shoot_window.clear();
        self.cancel_window.clear();
    }
}
