// src/dispatcher.rs - Fans each tracked frame out to the detectors and the renderer
use crate::actions::GestureKind;
use crate::error::Result;
use crate::gate::RecognitionGate;
use crate::queue::BoundedQueue;
use crate::skeleton::{SkeletalFrame, TimedFrame};
use crate::worker::{GestureWorker, WorkerReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Frames handed to the external renderer.
pub type RenderQueue = Arc<BoundedQueue<TimedFrame>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered to this many running detectors.
    Dispatched { detectors: usize },
    /// Tracked, but the gate held it back from the detectors.
    Disarmed,
    /// No tracked body; the frame was dropped.
    NullTrackedSkeleton,
}

pub struct Dispatcher {
    workers: Vec<GestureWorker>,
    gate: Box<dyn RecognitionGate>,
    render: RenderQueue,
    visual_output_stopped: Arc<AtomicBool>,
    frames_seen: u64,
}

impl Dispatcher {
    pub fn new(
        workers: Vec<GestureWorker>,
        gate: Box<dyn RecognitionGate>,
        render: RenderQueue,
        visual_output_stopped: Arc<AtomicBool>,
    ) -> Self {
        Self { workers, gate, render, visual_output_stopped, frames_seen: 0 }
    }

    pub fn dispatch(&mut self, frame: SkeletalFrame) -> Result<DispatchOutcome> {
        self.frames_seen += 1;

        let Some(skeleton) = frame.tracked_skeleton() else {
            trace!(frame = frame.frame_number, "no tracked skeleton, frame dropped");
            return Ok(DispatchOutcome::NullTrackedSkeleton);
        };
        let armed = self.gate.update(skeleton);
        let timed = TimedFrame::from_frame(frame);

        let outcome = if armed {
            self.prune_stopped();
            let mut delivered = 0;
            for worker in &self.workers {
                match worker.submit(timed.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!(gesture = %worker.kind(), error = %e, "frame not delivered"),
                }
            }
            DispatchOutcome::Dispatched { detectors: delivered }
        } else {
            DispatchOutcome::Disarmed
        };

        if !self.visual_output_stopped.load(Ordering::Relaxed) {
            self.render.enqueue(timed)?;
        }

        Ok(outcome)
    }

    fn prune_stopped(&mut self) {
        self.workers.retain(|worker| {
            let running = worker.is_running();
            if !running {
                warn!(gesture = %worker.kind(), "dropping stopped gesture worker");
            }
            running
        });
    }

    pub fn active_gestures(&self) -> Vec<GestureKind> {
        self.workers.iter().filter(|w| w.is_running()).map(|w| w.kind()).collect()
    }

    pub fn is_armed(&self) -> bool {
        self.gate.is_armed()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Stops every worker, letting each finish its backlog first.
    pub fn stop_workers(&mut self) -> Vec<WorkerReport> {
        debug!(workers = self.workers.len(), "stopping gesture workers");
        self.workers.drain(..).map(GestureWorker::stop).collect()
    }
}
