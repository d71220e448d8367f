// src/skeleton.rs - Skeletal frame data model shared by every gesture worker
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const JOINT_COUNT: usize = 20;

/// Body landmarks reported by a full-body skeletal tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointId {
    HipCenter,
    Spine,
    ShoulderCenter,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
}

impl JointId {
    pub const ALL: [JointId; JOINT_COUNT] = [
        JointId::HipCenter,
        JointId::Spine,
        JointId::ShoulderCenter,
        JointId::Head,
        JointId::ShoulderLeft,
        JointId::ElbowLeft,
        JointId::WristLeft,
        JointId::HandLeft,
        JointId::ShoulderRight,
        JointId::ElbowRight,
        JointId::WristRight,
        JointId::HandRight,
        JointId::HipLeft,
        JointId::KneeLeft,
        JointId::AnkleLeft,
        JointId::FootLeft,
        JointId::HipRight,
        JointId::KneeRight,
        JointId::AnkleRight,
        JointId::FootRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HipCenter => "hip_center",
            Self::Spine => "spine",
            Self::ShoulderCenter => "shoulder_center",
            Self::Head => "head",
            Self::ShoulderLeft => "shoulder_left",
            Self::ElbowLeft => "elbow_left",
            Self::WristLeft => "wrist_left",
            Self::HandLeft => "hand_left",
            Self::ShoulderRight => "shoulder_right",
            Self::ElbowRight => "elbow_right",
            Self::WristRight => "wrist_right",
            Self::HandRight => "hand_right",
            Self::HipLeft => "hip_left",
            Self::KneeLeft => "knee_left",
            Self::AnkleLeft => "ankle_left",
            Self::FootLeft => "foot_left",
            Self::HipRight => "hip_right",
            Self::KneeRight => "knee_right",
            Self::AnkleRight => "ankle_right",
            Self::FootRight => "foot_right",
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-joint tracking confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointTracking {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub id: JointId,
    pub position: Vector3<f32>,
    pub tracking: JointTracking,
}

/// Whole-body tracking state for one skeleton slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    NotTracked,
    PositionOnly,
    Tracked,
}

/// One body: a tracking state plus a fixed joint table indexed by [`JointId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub tracking_state: TrackingState,
    joints: [Joint; JOINT_COUNT],
}

impl Skeleton {
    pub fn new(tracking_state: TrackingState) -> Self {
        let joints = JointId::ALL.map(|id| Joint {
            id,
            position: Vector3::zeros(),
            tracking: JointTracking::NotTracked,
        });

        Self { tracking_state, joints }
    }

    pub fn is_tracked(&self) -> bool {
        self.tracking_state == TrackingState::Tracked
    }

    pub fn joint(&self, id: JointId) -> &Joint {
        &self.joints[id.index()]
    }

    pub fn position(&self, id: JointId) -> Vector3<f32> {
        self.joints[id.index()].position
    }

    pub fn set_joint(&mut self, id: JointId, position: Vector3<f32>, tracking: JointTracking) {
        self.joints[id.index()] = Joint { id, position, tracking };
    }

    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    /// Horizontal distance between the shoulders; the body-proportional unit
    /// every calibrated threshold is derived from.
    pub fn shoulder_width(&self) -> f32 {
        (self.position(JointId::ShoulderRight).x - self.position(JointId::ShoulderLeft).x).abs()
    }
}

/// A captured tick from the sensor. Immutable once built and shared by
/// reference (`Arc`) across every queue it is fanned out to.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletalFrame {
    pub frame_number: u64,
    pub timestamp_ms: f64,
    pub skeletons: Vec<Skeleton>,
}

impl SkeletalFrame {
    pub fn new(frame_number: u64, timestamp_ms: f64, skeletons: Vec<Skeleton>) -> Self {
        Self { frame_number, timestamp_ms, skeletons }
    }

    pub fn single(frame_number: u64, timestamp_ms: f64, skeleton: Skeleton) -> Self {
        Self::new(frame_number, timestamp_ms, vec![skeleton])
    }

    /// First skeleton slot whose state is `Tracked`. No fallback to
    /// position-only bodies.
    pub fn tracked_skeleton(&self) -> Option<&Skeleton> {
        self.skeletons.iter().find(|s| s.is_tracked())
    }
}

/// A frame as it travels through the pipeline: the shared frame plus the
/// timestamp window timing is measured against. [`from_frame`](Self::from_frame)
/// uses the capture timestamp, so a replayed session times out identically.
#[derive(Debug, Clone)]
pub struct TimedFrame {
    frame: Arc<SkeletalFrame>,
    timestamp_ms: f64,
}

impl TimedFrame {
    pub fn new(frame: Arc<SkeletalFrame>, timestamp_ms: f64) -> Self {
        Self { frame, timestamp_ms }
    }

    pub fn from_frame(frame: SkeletalFrame) -> Self {
        let timestamp_ms = frame.timestamp_ms;
        Self::new(Arc::new(frame), timestamp_ms)
    }

    pub fn frame(&self) -> &SkeletalFrame {
        &self.frame
    }

    pub fn shared(&self) -> &Arc<SkeletalFrame> {
        &self.frame
    }

    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }

    pub fn tracked_skeleton(&self) -> Option<&Skeleton> {
        self.frame.tracked_skeleton()
    }
}

/// Builds synthetic skeletons, starting from a neutral standing pose about
/// two metres in front of the sensor.
#[derive(Debug, Clone)]
pub struct SkeletonBuilder {
    skeleton: Skeleton,
}

impl SkeletonBuilder {
    pub fn standing() -> Self {
        let pose: [(JointId, [f32; 3]); JOINT_COUNT] = [
            (JointId::HipCenter, [0.0, 0.0, 2.0]),
            (JointId::Spine, [0.0, 0.3, 2.0]),
            (JointId::ShoulderCenter, [0.0, 0.55, 2.0]),
            (JointId::Head, [0.0, 0.75, 2.0]),
            (JointId::ShoulderLeft, [-0.2, 0.5, 2.0]),
            (JointId::ElbowLeft, [-0.25, 0.25, 2.0]),
            (JointId::WristLeft, [-0.27, 0.05, 2.0]),
            (JointId::HandLeft, [-0.28, 0.0, 2.0]),
            (JointId::ShoulderRight, [0.2, 0.5, 2.0]),
            (JointId::ElbowRight, [0.25, 0.25, 2.0]),
            (JointId::WristRight, [0.27, 0.05, 2.0]),
            (JointId::HandRight, [0.28, 0.0, 2.0]),
            (JointId::HipLeft, [-0.1, -0.05, 2.0]),
            (JointId::KneeLeft, [-0.1, -0.5, 2.0]),
            (JointId::AnkleLeft, [-0.1, -0.9, 2.0]),
            (JointId::FootLeft, [-0.1, -0.95, 1.95]),
            (JointId::HipRight, [0.1, -0.05, 2.0]),
            (JointId::KneeRight, [0.1, -0.5, 2.0]),
            (JointId::AnkleRight, [0.1, -0.9, 2.0]),
            (JointId::FootRight, [0.1, -0.95, 1.95]),
        ];

        let mut skeleton = Skeleton::new(TrackingState::Tracked);
        for (id, [x, y, z]) in pose {
            skeleton.set_joint(id, Vector3::new(x, y, z), JointTracking::Tracked);
        }

        Self { skeleton }
    }

    pub fn empty(tracking_state: TrackingState) -> Self {
        Self { skeleton: Skeleton::new(tracking_state) }
    }

    pub fn state(mut self, tracking_state: TrackingState) -> Self {
        self.skeleton.tracking_state = tracking_state;
        self
    }

    pub fn joint(mut self, id: JointId, x: f32, y: f32, z: f32) -> Self {
        self.skeleton.set_joint(id, Vector3::new(x, y, z), JointTracking::Tracked);
        self
    }

    /// Shifts a joint relative to its current position.
    pub fn offset(mut self, id: JointId, dx: f32, dy: f32, dz: f32) -> Self {
        let moved = self.skeleton.position(id) + Vector3::new(dx, dy, dz);
        self.skeleton.set_joint(id, moved, JointTracking::Tracked);
        self
    }

    pub fn build(self) -> Skeleton {
        self.skeleton
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_skeleton_skips_untracked_slots() {
        let ghost = SkeletonBuilder::standing()
            .state(TrackingState::PositionOnly)
            .offset(JointId::Head, 1.0, 0.0, 0.0)
            .build();
        let body = SkeletonBuilder::standing().build();
        let frame = SkeletalFrame::new(1, 0.0, vec![ghost, body.clone()]);

        assert_eq!(frame.tracked_skeleton(), Some(&body));
    }

    #[test]
    fn frame_without_tracked_body_has_no_skeleton() {
        let frame = SkeletalFrame::single(
            1,
            0.0,
            SkeletonBuilder::standing().state(TrackingState::NotTracked).build(),
        );
        assert!(frame.tracked_skeleton().is_none());
    }

    #[test]
    fn standing_pose_has_forty_centimetre_shoulders() {
        let skeleton = SkeletonBuilder::standing().build();
        assert!((skeleton.shoulder_width() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn timed_frames_share_one_allocation() {
        let timed = TimedFrame::from_frame(SkeletalFrame::single(
            7,
            33.0,
            SkeletonBuilder::standing().build(),
        ));
        let copy = timed.clone();

        assert!(Arc::ptr_eq(timed.shared(), copy.shared()));
        assert_eq!(copy.timestamp_ms(), 33.0);
    }
}
