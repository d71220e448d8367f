// src/recording.rs - Skeletal session capture to CSV and replay back into frames
use crate::error::{PipelineError, Result};
use crate::skeleton::{JointId, JointTracking, SkeletalFrame, Skeleton, TrackingState, JOINT_COUNT};
use chrono::Local;
use csv::{Reader, StringRecord, WriterBuilder};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const FRAMES_FILE_NAME: &str = "frames.csv";

const LEADING_COLUMNS: usize = 3;
const COLUMN_COUNT: usize = LEADING_COLUMNS + JOINT_COUNT * 3;

fn header() -> Vec<String> {
    let mut columns = vec![
        "frame_number".to_string(),
        "timestamp_ms".to_string(),
        "tracking_state".to_string(),
    ];
    for joint in JointId::ALL {
        for axis in ["x", "y", "z"] {
            columns.push(format!("{}_{}", joint.as_str(), axis));
        }
    }
    columns
}

/// One CSV row. `coordinates` holds x, y, z for every joint in
/// [`JointId::ALL`] order and fills the trailing columns.
#[derive(Debug, Serialize, Deserialize)]
struct FrameRow {
    frame_number: u64,
    timestamp_ms: f64,
    tracking_state: TrackingState,
    coordinates: Vec<f32>,
}

impl FrameRow {
    fn from_recorded(recorded: &RecordedFrame) -> Self {
        match &recorded.skeleton {
            Some(skeleton) => Self {
                frame_number: recorded.frame_number,
                timestamp_ms: recorded.timestamp_ms,
                tracking_state: skeleton.tracking_state,
                coordinates: skeleton
                    .joints()
                    .flat_map(|joint| [joint.position.x, joint.position.y, joint.position.z])
                    .collect(),
            },
            None => Self {
                frame_number: recorded.frame_number,
                timestamp_ms: recorded.timestamp_ms,
                tracking_state: TrackingState::NotTracked,
                coordinates: vec![0.0; JOINT_COUNT * 3],
            },
        }
    }

    fn into_frame(self) -> SkeletalFrame {
        if self.tracking_state == TrackingState::NotTracked {
            return SkeletalFrame::new(self.frame_number, self.timestamp_ms, Vec::new());
        }

        let mut skeleton = Skeleton::new(self.tracking_state);
        for (joint, xyz) in JointId::ALL.into_iter().zip(self.coordinates.chunks_exact(3)) {
            skeleton.set_joint(joint, Vector3::new(xyz[0], xyz[1], xyz[2]), JointTracking::Tracked);
        }
        SkeletalFrame::single(self.frame_number, self.timestamp_ms, skeleton)
    }
}

#[derive(Debug, Clone)]
struct RecordedFrame {
    frame_number: u64,
    timestamp_ms: f64,
    skeleton: Option<Skeleton>,
}

/// Buffers frames in memory and writes them as one CSV per session.
pub struct FrameRecorder {
    output_dir: PathBuf,
    session_name: String,
    frames: Vec<RecordedFrame>,
}

impl FrameRecorder {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name
            .unwrap_or_else(|| format!("session_{}", Local::now().format("%Y%m%d_%H%M%S")));

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            frames: Vec::new(),
        }
    }

    /// `~/Documents/SkeletalInput`, or `./recordings` when there is no
    /// documents folder.
    pub fn default_output_dir() -> PathBuf {
        directories::UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|p| p.join("SkeletalInput")))
            .unwrap_or_else(|| PathBuf::from("./recordings"))
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Keeps the tracked skeleton only. A frame without one is still
    /// recorded, as a not-tracked row, so replay timing is preserved.
    pub fn add_frame(&mut self, frame: &SkeletalFrame) {
        self.frames.push(RecordedFrame {
            frame_number: frame.frame_number,
            timestamp_ms: frame.timestamp_ms,
            skeleton: frame.tracked_skeleton().cloned(),
        });
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.session_name).join(FRAMES_FILE_NAME)
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.csv_path();
        if let Some(parent) = csv_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Per-axis joint columns, so the header is not derived from FrameRow.
        let mut writer = WriterBuilder::new().has_headers(false).from_path(&csv_path)?;
        writer.write_record(header())?;
        for recorded in &self.frames {
            writer.serialize(FrameRow::from_recorded(recorded))?;
        }

        writer.flush()?;
        info!(path = %csv_path.display(), frames = self.frames.len(), "recording exported");
        Ok(csv_path)
    }
}

fn parse_row(record: &StringRecord, row: usize) -> Result<SkeletalFrame> {
    if record.len() != COLUMN_COUNT {
        return Err(PipelineError::Recording(format!(
            "row {row}: expected {COLUMN_COUNT} columns, found {}",
            record.len()
        )));
    }

    let parsed: FrameRow = record
        .deserialize(None)
        .map_err(|e| PipelineError::Recording(format!("row {row}: {e}")))?;
    Ok(parsed.into_frame())
}

/// Loads a CSV written by [`FrameRecorder::export_csv`].
pub fn read_frames(path: impl AsRef<Path>) -> Result<Vec<SkeletalFrame>> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path)?;

    let mut frames = Vec::new();
    for (row, record) in reader.records().enumerate() {
        frames.push(parse_row(&record?, row + 1)?);
    }

    debug!(path = %path.display(), frames = frames.len(), "recording loaded");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::SkeletonBuilder;
    use tempfile::TempDir;

    #[test]
    fn default_session_name_is_timestamped() {
        let recorder = FrameRecorder::new("/tmp", None);
        let name = recorder.session_name();
        assert!(name.starts_with("session_"));
        assert_eq!(name.len(), "session_20240101_120000".len());
    }

    #[test]
    fn export_then_read_restores_frames() {
        let dir = TempDir::new().unwrap();
        let mut recorder = FrameRecorder::new(dir.path(), Some("take1".into()));

        let raised = SkeletonBuilder::standing().joint(JointId::HandRight, 0.3, 0.8, 1.7).build();
        recorder.add_frame(&SkeletalFrame::single(1, 0.0, SkeletonBuilder::standing().build()));
        recorder.add_frame(&SkeletalFrame::new(2, 33.5, Vec::new()));
        recorder.add_frame(&SkeletalFrame::single(3, 67.0, raised.clone()));

        let path = recorder.export_csv().unwrap();
        assert_eq!(path, dir.path().join("take1").join(FRAMES_FILE_NAME));

        let frames = read_frames(&path).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[1].tracked_skeleton().is_none());
        assert_eq!(frames[1].timestamp_ms, 33.5);

        let restored = frames[2].tracked_skeleton().unwrap();
        assert_eq!(restored.position(JointId::HandRight), raised.position(JointId::HandRight));
        assert_eq!(frames[2].frame_number, 3);
    }

    #[test]
    fn truncated_rows_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FRAMES_FILE_NAME);
        fs::write(&path, "frame_number,timestamp_ms,tracking_state\n1,0,tracked\n").unwrap();

        assert!(matches!(read_frames(&path), Err(PipelineError::Recording(_))));
    }

    #[test]
    fn rows_use_snake_case_state_names() {
        let dir = TempDir::new().unwrap();
        let mut recorder = FrameRecorder::new(dir.path(), Some("states".into()));
        let ghost = SkeletonBuilder::standing().state(TrackingState::PositionOnly).build();
        recorder.add_frame(&SkeletalFrame::single(1, 0.0, SkeletonBuilder::standing().build()));
        recorder.add_frame(&SkeletalFrame::single(2, 33.0, ghost));

        let path = recorder.export_csv().unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = text.lines().collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].split(',').count(), COLUMN_COUNT);
        assert!(rows[0].starts_with("frame_number,timestamp_ms,tracking_state,hip_center_x"));
        assert!(rows[1].starts_with("1,0.0,tracked,"));
        assert!(rows[2].starts_with("2,33.0,not_tracked,"));
    }

    #[test]
    fn unknown_tracking_state_is_a_recording_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FRAMES_FILE_NAME);
        let zeros = vec!["0"; JOINT_COUNT * 3].join(",");
        let mut text = header().join(",");
        text.push_str(&format!("\n1,0,sitting,{zeros}\n"));
        fs::write(&path, text).unwrap();

        let err = read_frames(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Recording(ref msg) if msg.starts_with("row 1")));
    }
}
