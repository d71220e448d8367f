// src/worker.rs - One dedicated thread per gesture detector
use crate::actions::{ActionEvent, GestureKind};
use crate::error::{PipelineError, Result};
use crate::gestures::{DetectionOutcome, Detector};
use crate::queue::BoundedQueue;
use crate::skeleton::TimedFrame;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, trace, warn};

/// What a worker thread needs from its detector.
pub trait GestureDetector: Send + 'static {
    fn kind(&self) -> GestureKind;
    fn process(&mut self, frame: &TimedFrame, events: &mut Vec<ActionEvent>) -> DetectionOutcome;
    fn reset(&mut self, events: &mut Vec<ActionEvent>);
}

impl GestureDetector for Detector {
    fn kind(&self) -> GestureKind {
        Detector::kind(self)
    }

    fn process(&mut self, frame: &TimedFrame, events: &mut Vec<ActionEvent>) -> DetectionOutcome {
        Detector::process(self, frame, events)
    }

    fn reset(&mut self, events: &mut Vec<ActionEvent>) {
        Detector::reset(self, events)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub kind: GestureKind,
    pub frames: u64,
    pub detections: u64,
    /// Latched gestures released (a held move or shot let go).
    pub cancellations: u64,
    pub faults: u32,
}

impl WorkerReport {
    fn new(kind: GestureKind) -> Self {
        Self { kind, frames: 0, detections: 0, cancellations: 0, faults: 0 }
    }
}

/// Owns a detector's frame queue and thread. Frames go in through
/// [`submit`](Self::submit); events come out on the shared event queue
/// handed to [`start`](Self::start).
pub struct GestureWorker {
    kind: GestureKind,
    frames: Arc<BoundedQueue<TimedFrame>>,
    alive: Arc<AtomicBool>,
    handle: Option<JoinHandle<WorkerReport>>,
}

impl GestureWorker {
    pub fn start<D: GestureDetector>(
        detector: D,
        events: Arc<BoundedQueue<ActionEvent>>,
        capacity: usize,
        max_faults: u32,
    ) -> Result<Self> {
        let kind = detector.kind();
        let frames = Arc::new(BoundedQueue::new(capacity));
        let alive = Arc::new(AtomicBool::new(true));

        let handle = thread::Builder::new().name(format!("gesture-{kind}")).spawn({
            let frames = Arc::clone(&frames);
            let alive = Arc::clone(&alive);
            move || run(detector, frames, events, alive, max_faults)
        })?;

        info!(gesture = %kind, capacity, "gesture worker started");
        Ok(Self { kind, frames, alive, handle: Some(handle) })
    }

    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    pub fn is_running(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn backlog(&self) -> usize {
        self.frames.size()
    }

    pub fn submit(&self, frame: TimedFrame) -> Result<()> {
        if !self.is_running() {
            return Err(PipelineError::WorkerStopped(self.kind.to_string()));
        }
        self.frames
            .enqueue(frame)
            .map_err(|_| PipelineError::WorkerStopped(self.kind.to_string()))
    }

    /// Releases the queue and waits for the thread. Frames already queued
    /// are still processed before the thread exits.
    pub fn stop(mut self) -> WorkerReport {
        self.join()
    }

    fn join(&mut self) -> WorkerReport {
        self.frames.release();
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                error!(gesture = %self.kind, "gesture worker thread panicked outside detection");
                WorkerReport::new(self.kind)
            }),
            None => WorkerReport::new(self.kind),
        }
    }
}

impl Drop for GestureWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.join();
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn forward(kind: GestureKind, emitted: &mut Vec<ActionEvent>, events: &BoundedQueue<ActionEvent>) {
    for event in emitted.drain(..) {
        trace!(gesture = %kind, %event, "emit");
        if events.enqueue(event).is_err() {
            warn!(gesture = %kind, "event queue closed, dropping event");
        }
    }
}

fn run<D: GestureDetector>(
    mut detector: D,
    frames: Arc<BoundedQueue<TimedFrame>>,
    events: Arc<BoundedQueue<ActionEvent>>,
    alive: Arc<AtomicBool>,
    max_faults: u32,
) -> WorkerReport {
    let kind = detector.kind();
    let mut report = WorkerReport::new(kind);
    let mut emitted = Vec::new();

    while let Some(frame) = frames.dequeue() {
        report.frames += 1;

        let result = panic::catch_unwind(AssertUnwindSafe(|| detector.process(&frame, &mut emitted)));
        match result {
            Ok(outcome) => {
                match outcome {
                    DetectionOutcome::Detected => report.detections += 1,
                    DetectionOutcome::Cancelled => report.cancellations += 1,
                    _ => {}
                }
                trace!(gesture = %kind, frame = frame.frame().frame_number, ?outcome, "processed");
            }
            Err(payload) => {
                report.faults += 1;
                error!(
                    gesture = %kind,
                    faults = report.faults,
                    panic = %panic_message(&*payload),
                    "detector panicked, resetting state"
                );
                // Whatever the failed frame half-emitted is discarded.
                emitted.clear();
                detector.reset(&mut emitted);

                if report.faults >= max_faults {
                    error!(gesture = %kind, max_faults, "too many faults, gesture disabled");
                    forward(kind, &mut emitted, &events);
                    break;
                }
            }
        }

        forward(kind, &mut emitted, &events);
    }

    alive.store(false, Ordering::Release);
    frames.release();
    info!(
        gesture = %kind,
        frames = report.frames,
        detections = report.detections,
        cancellations = report.cancellations,
        faults = report.faults,
        "gesture worker stopped"
    );
    report
}
