// src/gestures/window.rs - Sliding frame windows and the shared motion rule
use super::DetectionOutcome;
use crate::skeleton::{JointId, Skeleton, TimedFrame};
use crate::thresholds::WindowThresholds;
use nalgebra::Vector3;
use std::collections::VecDeque;
use tracing::trace;

/// Bounded, oldest-first history of frames owned by one detector.
///
/// Never rolls: pushing into a full window empties it first.
#[derive(Debug, Clone)]
pub struct FrameWindow {
    frames: VecDeque<TimedFrame>,
    capacity: usize,
}

impl FrameWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self { frames: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, frame: TimedFrame) {
        if self.frames.len() >= self.capacity {
            trace!(capacity = self.capacity, "frame window full, restarting");
            self.frames.clear();
        }
        self.frames.push_back(frame);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resolves the oldest, previous and latest entries to their tracked
    /// skeletons.
    pub fn span(&self) -> Span {
        let len = self.frames.len();
        if len <= 1 {
            return Span::Insufficient;
        }

        let oldest = &self.frames[0];
        let previous = &self.frames[len - 2];
        let latest = &self.frames[len - 1];

        match (
            oldest.tracked_skeleton(),
            previous.tracked_skeleton(),
            latest.tracked_skeleton(),
        ) {
            (Some(o), Some(p), Some(l)) => Span::Ready(WindowSpan {
                oldest: o.clone(),
                previous: p.clone(),
                latest: l.clone(),
                elapsed_ms: latest.timestamp_ms() - oldest.timestamp_ms(),
            }),
            _ => Span::Untracked,
        }
    }
}

pub enum Span {
    Insufficient,
    Untracked,
    Ready(WindowSpan),
}

/// The three skeletons every window comparison looks at.
#[derive(Debug, Clone)]
pub struct WindowSpan {
    pub oldest: Skeleton,
    pub previous: Skeleton,
    pub latest: Skeleton,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(self, v: &Vector3<f32>) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increasing,
    Decreasing,
}

impl Direction {
    fn sign(self) -> f32 {
        match self {
            Direction::Increasing => 1.0,
            Direction::Decreasing => -1.0,
        }
    }
}

/// Which joints to watch, along which axis, in which direction.
#[derive(Debug, Clone, Copy)]
pub struct MotionRule {
    pub joints: &'static [JointId],
    pub axis: Axis,
    pub direction: Direction,
}

impl MotionRule {
    fn travel(&self, joint: JointId, from: &Skeleton, to: &Skeleton) -> f32 {
        let from = self.axis.component(&from.position(joint));
        let to = self.axis.component(&to.position(joint));
        (to - from) * self.direction.sign()
    }

    /// Every watched joint advanced since the previous frame.
    pub fn advancing(&self, span: &WindowSpan) -> bool {
        self.joints
            .iter()
            .all(|&joint| self.travel(joint, &span.previous, &span.latest) > 0.0)
    }

    /// Largest displacement of any watched joint across the whole window.
    pub fn displacement(&self, span: &WindowSpan) -> f32 {
        self.joints
            .iter()
            .map(|&joint| self.travel(joint, &span.oldest, &span.latest))
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// A [`FrameWindow`] evaluated against one [`MotionRule`]: append, guard on
/// the last step, then test elapsed time and displacement over the window.
#[derive(Debug, Clone)]
pub struct MotionWindow {
    window: FrameWindow,
    rule: MotionRule,
    thresholds: WindowThresholds,
}

impl MotionWindow {
    pub fn new(rule: MotionRule, thresholds: WindowThresholds) -> Self {
        Self {
            window: FrameWindow::new(thresholds.buffer_size),
            rule,
            thresholds,
        }
    }

    pub fn evaluate(&mut self, frame: &TimedFrame) -> DetectionOutcome {
        self.window.push(frame.clone());

        let span = match self.window.span() {
            Span::Insufficient => return DetectionOutcome::Insufficient,
            Span::Untracked => return DetectionOutcome::NullTrackedSkeleton,
            Span::Ready(span) => span,
        };

        if !self.rule.advancing(&span) {
            self.window.clear();
            return DetectionOutcome::NotDetected;
        }

        if span.elapsed_ms < self.thresholds.gesture_time_ms
            && self.rule.displacement(&span) >= self.thresholds.distance
        {
            self.window.clear();
            return DetectionOutcome::Detected;
        }

        DetectionOutcome::NotDetected
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{SkeletalFrame, SkeletonBuilder, TrackingState};

    const RISE: MotionRule = MotionRule {
        joints: &[JointId::HipCenter],
        axis: Axis::Y,
        direction: Direction::Increasing,
    };

    fn hip_frame(n: u64, t: f64, y: f32) -> TimedFrame {
        let skeleton = SkeletonBuilder::standing().joint(JointId::HipCenter, 0.0, y, 2.0).build();
        TimedFrame::from_frame(SkeletalFrame::single(n, t, skeleton))
    }

    fn thresholds(buffer_size: usize) -> WindowThresholds {
        WindowThresholds { buffer_size, gesture_time_ms: 1000.0, distance: 0.3 }
    }

    #[test]
    fn single_frame_is_insufficient() {
        let mut window = MotionWindow::new(RISE, thresholds(60));
        assert_eq!(window.evaluate(&hip_frame(0, 0.0, 0.0)), DetectionOutcome::Insufficient);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn full_window_restarts_instead_of_rolling() {
        let mut window = FrameWindow::new(3);
        for i in 0..3 {
            window.push(hip_frame(i, i as f64, 0.0));
        }
        assert_eq!(window.len(), 3);

        window.push(hip_frame(3, 3.0, 0.0));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn untracked_entry_keeps_buffer() {
        let mut window = MotionWindow::new(RISE, thresholds(60));
        window.evaluate(&hip_frame(0, 0.0, 0.0));

        let ghost = SkeletonBuilder::standing().state(TrackingState::NotTracked).build();
        let frame = TimedFrame::from_frame(SkeletalFrame::single(1, 33.0, ghost));
        assert_eq!(window.evaluate(&frame), DetectionOutcome::NullTrackedSkeleton);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn reversal_clears_window() {
        let mut window = MotionWindow::new(RISE, thresholds(60));
        window.evaluate(&hip_frame(0, 0.0, 0.0));
        window.evaluate(&hip_frame(1, 33.0, 0.1));
        assert_eq!(window.evaluate(&hip_frame(2, 66.0, 0.05)), DetectionOutcome::NotDetected);
        assert!(window.is_empty());
    }

    #[test]
    fn slow_motion_is_not_detected() {
        let mut window = MotionWindow::new(RISE, thresholds(60));
        window.evaluate(&hip_frame(0, 0.0, 0.0));
        window.evaluate(&hip_frame(1, 600.0, 0.2));
        assert_eq!(window.evaluate(&hip_frame(2, 1200.0, 0.4)), DetectionOutcome::NotDetected);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn fast_motion_is_detected_and_clears() {
        let mut window = MotionWindow::new(RISE, thresholds(60));
        window.evaluate(&hip_frame(0, 0.0, 0.0));
        window.evaluate(&hip_frame(1, 100.0, 0.2));
        assert_eq!(window.evaluate(&hip_frame(2, 200.0, 0.35)), DetectionOutcome::Detected);
        assert!(window.is_empty());
    }

    #[test]
    fn every_watched_joint_must_advance() {
        const BOTH_ANKLES: MotionRule = MotionRule {
            joints: &[JointId::AnkleRight, JointId::AnkleLeft],
            axis: Axis::Z,
            direction: Direction::Decreasing,
        };
        let base = SkeletonBuilder::standing();
        let previous = base.clone().offset(JointId::AnkleRight, 0.0, 0.0, -0.1).build();
        let latest = base
            .clone()
            .offset(JointId::AnkleRight, 0.0, 0.0, -0.2)
            .offset(JointId::AnkleLeft, 0.0, 0.0, -0.05)
            .build();
        let span = WindowSpan {
            oldest: base.build(),
            previous: previous.clone(),
            latest,
            elapsed_ms: 66.0,
        };
        assert!(BOTH_ANKLES.advancing(&span));
        assert!((BOTH_ANKLES.displacement(&span) - 0.2).abs() < 1e-5);

        let stalled = WindowSpan { latest: previous.clone(), previous, ..span };
        assert!(!BOTH_ANKLES.advancing(&stalled));
    }
}
