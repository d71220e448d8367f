// src/config.rs - Pipeline settings persisted as JSON
use crate::actions::GestureKind;
use crate::error::{PipelineError, Result};
use crate::queue::DEFAULT_QUEUE_CAPACITY;
use crate::sink::KeyBindings;
use crate::thresholds::{MousePointerConfig, MovementThresholds, ShootConfig, WindowThresholds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "pipeline.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    /// Panics a worker may absorb before its gesture is disabled.
    pub max_worker_faults: u32,
    pub visual_output_stopped: bool,
    pub move_left_right: MovementThresholds,
    pub move_front_back: MovementThresholds,
    pub jump: WindowThresholds,
    pub shoot: ShootConfig,
    pub mouse_pointer: MousePointerConfig,
    pub enabled_gestures: Vec<GestureKind>,
    pub key_bindings: KeyBindings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_worker_faults: 16,
            visual_output_stopped: false,
            move_left_right: MovementThresholds::left_right(),
            move_front_back: MovementThresholds::front_back(),
            jump: WindowThresholds::jump(),
            shoot: ShootConfig::default(),
            mouse_pointer: MousePointerConfig::default(),
            enabled_gestures: GestureKind::ALL.to_vec(),
            key_bindings: KeyBindings::default(),
        }
    }
}

fn check_window(name: &str, window: &WindowThresholds) -> Result<()> {
    if window.buffer_size < 2 {
        return Err(PipelineError::Config(format!("{name}: buffer_size must be at least 2")));
    }
    if !(window.gesture_time_ms > 0.0) {
        return Err(PipelineError::Config(format!("{name}: gesture_time_ms must be positive")));
    }
    if !(window.distance > 0.0) {
        return Err(PipelineError::Config(format!("{name}: distance must be positive")));
    }
    Ok(())
}

impl PipelineConfig {
    /// Platform config location, e.g. `~/.config/skeletal-input/pipeline.json`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "skeletal-input", "skeletal-input")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Loads from [`default_path`](Self::default_path), or falls back to
    /// defaults when no file exists there.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "saved pipeline config");
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(PipelineError::Config("queue_capacity must be positive".into()));
        }
        if self.max_worker_faults == 0 {
            return Err(PipelineError::Config("max_worker_faults must be positive".into()));
        }

        check_window("move_left_right", &self.move_left_right.window)?;
        check_window("move_front_back", &self.move_front_back.window)?;
        check_window("jump", &self.jump)?;

        let shoot = &self.shoot;
        if shoot.buffer_size < 2 {
            return Err(PipelineError::Config("shoot: buffer_size must be at least 2".into()));
        }
        if shoot.min_gesture_time_ms >= shoot.gesture_time_ms {
            return Err(PipelineError::Config(
                "shoot: min_gesture_time_ms must be below gesture_time_ms".into(),
            ));
        }
        let ratios = [
            shoot.aim_y_ratio,
            shoot.shoot_distance_ratio,
            shoot.shoot_xy_ratio,
            shoot.box_xy_ratio,
            shoot.box_z_ratio,
            shoot.aim_box_ratio,
        ];
        if ratios.iter().any(|r| !(*r > 0.0)) {
            return Err(PipelineError::Config("shoot: ratios must be positive".into()));
        }

        for (i, kind) in self.enabled_gestures.iter().enumerate() {
            if self.enabled_gestures[..i].contains(kind) {
                return Err(PipelineError::Config(format!("gesture {kind} enabled twice")));
            }
        }

        self.key_bindings.validate()
    }

    pub fn is_enabled(&self, kind: GestureKind) -> bool {
        self.enabled_gestures.contains(&kind)
    }
}
