// src/thresholds.rs - Gesture thresholds, fixed and body-proportional
use crate::skeleton::Skeleton;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Time/distance limits for the sliding-window detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowThresholds {
    pub buffer_size: usize,
    pub gesture_time_ms: f64,
    pub distance: f32,
}

impl WindowThresholds {
    pub fn move_left_right() -> Self {
        Self { buffer_size: 60, gesture_time_ms: 1200.0, distance: 0.35 }
    }

    pub fn move_front_back() -> Self {
        Self { buffer_size: 60, gesture_time_ms: 1200.0, distance: 0.35 }
    }

    pub fn jump() -> Self {
        Self { buffer_size: 60, gesture_time_ms: 800.0, distance: 0.3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementThresholds {
    #[serde(flatten)]
    pub window: WindowThresholds,
    /// Feet closer than this (along the movement axis) release a held move.
    pub feet_cancel_distance: f32,
}

impl MovementThresholds {
    pub fn left_right() -> Self {
        Self { window: WindowThresholds::move_left_right(), feet_cancel_distance: 0.4 }
    }

    pub fn front_back() -> Self {
        Self { window: WindowThresholds::move_front_back(), feet_cancel_distance: 0.4 }
    }
}

/// Shoulder-width multipliers used by [`ThresholdCalibrator`], plus the fixed
/// timing of the shoot windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShootConfig {
    pub buffer_size: usize,
    pub gesture_time_ms: f64,
    pub min_gesture_time_ms: f64,
    pub aim_y_ratio: f32,
    pub shoot_distance_ratio: f32,
    pub shoot_xy_ratio: f32,
    pub box_xy_ratio: f32,
    pub box_z_ratio: f32,
    pub aim_box_ratio: f32,
    /// Aim engages while the hand is within `aim_enter_factor * aim_y` of the shoulder.
    pub aim_enter_factor: f32,
    /// Aim disengages once the hand drops `aim_exit_factor * aim_box` below the shoulder.
    pub aim_exit_factor: f32,
    /// Shooting stops once the hand is this many shoot distances in front of the hip.
    pub far_from_hip_factor: f32,
}

impl Default for ShootConfig {
    fn default() -> Self {
        Self {
            buffer_size: 60,
            gesture_time_ms: 1200.0,
            min_gesture_time_ms: 200.0,
            aim_y_ratio: 0.8,
            shoot_distance_ratio: 0.20,
            shoot_xy_ratio: 0.15,
            box_xy_ratio: 0.35,
            box_z_ratio: 0.2,
            aim_box_ratio: 1.0,
            aim_enter_factor: 0.5,
            aim_exit_factor: 0.7,
            far_from_hip_factor: 2.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MousePointerConfig {
    pub scale_x: f32,
    pub scale_y: f32,
    /// Fraction of the head-to-spine height the hand must be pushed forward
    /// of the chest before the pointer engages.
    pub box_depth_ratio: f32,
}

impl Default for MousePointerConfig {
    fn default() -> Self {
        Self { scale_x: 800.0, scale_y: 600.0, box_depth_ratio: 0.75 }
    }
}

/// Aim/shoot distances derived from one user's shoulder width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShootThresholds {
    pub shoulder_width: f32,
    pub aim_y: f32,
    pub shoot_distance: f32,
    pub shoot_xy: f32,
    pub box_x: f32,
    pub box_y: f32,
    pub box_z: f32,
    pub aim_box: f32,
}

impl ShootThresholds {
    pub fn from_shoulder_width(width: f32, config: &ShootConfig) -> Self {
        let box_xy = width * config.box_xy_ratio;
        Self {
            shoulder_width: width,
            aim_y: width * config.aim_y_ratio,
            shoot_distance: width * config.shoot_distance_ratio,
            shoot_xy: width * config.shoot_xy_ratio,
            box_x: box_xy,
            box_y: box_xy,
            box_z: width * config.box_z_ratio,
            aim_box: width * config.aim_box_ratio,
        }
    }
}

/// Latches body-proportional thresholds from the first usable skeleton.
#[derive(Debug, Clone)]
pub struct ThresholdCalibrator {
    config: ShootConfig,
    thresholds: Option<ShootThresholds>,
}

impl ThresholdCalibrator {
    pub fn new(config: ShootConfig) -> Self {
        Self { config, thresholds: None }
    }

    pub fn is_threshold_set(&self) -> bool {
        self.thresholds.is_some()
    }

    pub fn thresholds(&self) -> Option<&ShootThresholds> {
        self.thresholds.as_ref()
    }

    /// Computes thresholds on the first call with a non-degenerate shoulder
    /// width; every later call returns the latched values untouched.
    pub fn calibrate(&mut self, skeleton: &Skeleton) -> Option<&ShootThresholds> {
        if self.thresholds.is_none() {
            let width = skeleton.shoulder_width();
            if width > f32::EPSILON {
                let thresholds = ShootThresholds::from_shoulder_width(width, &self.config);
                info!(
                    shoulder_width = width,
                    aim_y = thresholds.aim_y,
                    shoot_distance = thresholds.shoot_distance,
                    "aim/shoot thresholds calibrated"
                );
                self.thresholds = Some(thresholds);
            } else {
                debug!("shoulders collapsed, calibration deferred");
            }
        }
        self.thresholds.as_ref()
    }
}
