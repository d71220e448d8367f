// src/gate.rs - Decides per frame whether gesture recognition is armed
use crate::skeleton::{JointId, Skeleton};
use tracing::info;

pub trait RecognitionGate: Send {
    /// Feeds the tracked skeleton of the current frame and returns whether
    /// that frame should reach the detectors.
    fn update(&mut self, skeleton: &Skeleton) -> bool;

    fn is_armed(&self) -> bool;
}

impl<G: RecognitionGate + ?Sized> RecognitionGate for Box<G> {
    fn update(&mut self, skeleton: &Skeleton) -> bool {
        (**self).update(skeleton)
    }

    fn is_armed(&self) -> bool {
        (**self).is_armed()
    }
}

/// Raise the right hand alone above the head to start; raise both to stop.
#[derive(Debug, Clone, Default)]
pub struct HandsAboveHeadGate {
    armed: bool,
    both_up_last_frame: bool,
}

impl HandsAboveHeadGate {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecognitionGate for HandsAboveHeadGate {
    fn update(&mut self, skeleton: &Skeleton) -> bool {
        let head_y = skeleton.position(JointId::Head).y;
        let right_up = skeleton.position(JointId::HandRight).y > head_y;
        let left_up = skeleton.position(JointId::HandLeft).y > head_y;
        let both_up = right_up && left_up;

        if both_up {
            if self.armed {
                info!("stop gesture, recognition disarmed");
            }
            self.armed = false;
        } else if !self.armed && right_up && !self.both_up_last_frame {
            info!("start gesture, recognition armed");
            self.armed = true;
        }

        self.both_up_last_frame = both_up;
        self.armed
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Forwards every frame. Used for replays and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysArmed;

impl RecognitionGate for AlwaysArmed {
    fn update(&mut self, _skeleton: &Skeleton) -> bool {
        true
    }

    fn is_armed(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::SkeletonBuilder;

    fn pose(right_up: bool, left_up: bool) -> Skeleton {
        let y = |up: bool| if up { 0.9 } else { 0.0 };
        SkeletonBuilder::standing()
            .joint(JointId::HandRight, 0.28, y(right_up), 2.0)
            .joint(JointId::HandLeft, -0.28, y(left_up), 2.0)
            .build()
    }

    #[test]
    fn starts_disarmed_and_arms_on_right_hand() {
        let mut gate = HandsAboveHeadGate::new();
        assert!(!gate.update(&pose(false, false)));
        assert!(gate.update(&pose(true, false)));
        // Stays armed after the hand comes down.
        assert!(gate.update(&pose(false, false)));
    }

    #[test]
    fn both_hands_disarm() {
        let mut gate = HandsAboveHeadGate::new();
        gate.update(&pose(true, false));
        assert!(!gate.update(&pose(true, true)));
        assert!(!gate.is_armed());
    }

    #[test]
    fn lowering_left_hand_after_stop_does_not_rearm() {
        let mut gate = HandsAboveHeadGate::new();
        gate.update(&pose(true, false));
        gate.update(&pose(true, true));

        assert!(!gate.update(&pose(true, false)));
        // A fresh right-hand raise on the following frame does.
        assert!(gate.update(&pose(true, false)));
    }

    #[test]
    fn always_armed_forwards_everything() {
        let mut gate = AlwaysArmed;
        assert!(gate.update(&pose(true, true)));
    }
}
