// src/lib.rs - Skeletal-tracking frames in, keyboard and mouse actions out
pub mod actions;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod gestures;
pub mod pipeline;
pub mod queue;
pub mod recording;
pub mod sink;
pub mod skeleton;
pub mod thresholds;
pub mod worker;

pub use actions::{ActionEvent, GestureKind, KeyboardAction, MouseAction, Persistence};
pub use config::PipelineConfig;
pub use dispatcher::{DispatchOutcome, RenderQueue};
pub use error::{PipelineError, Result};
pub use gate::{AlwaysArmed, HandsAboveHeadGate, RecognitionGate};
pub use gestures::{DetectionOutcome, Detector};
pub use pipeline::{GesturePipeline, PipelineReport};
pub use queue::BoundedQueue;
pub use sink::{ActionSink, KeyBindings, KeyStateSink, RecordingSink, TracingInjector};
pub use skeleton::{JointId, SkeletalFrame, Skeleton, SkeletonBuilder, TimedFrame, TrackingState};
