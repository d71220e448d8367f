// src/pipeline.rs - Wires dispatcher, gesture workers and the event forwarder together
use crate::actions::ActionEvent;
use crate::config::PipelineConfig;
use crate::dispatcher::{DispatchOutcome, Dispatcher, RenderQueue};
use crate::error::{PipelineError, Result};
use crate::gate::RecognitionGate;
use crate::gestures::Detector;
use crate::queue::BoundedQueue;
use crate::sink::ActionSink;
use crate::skeleton::SkeletalFrame;
use crate::worker::{panic_message, GestureWorker, WorkerReport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    pub forwarded: u64,
    pub sink_errors: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub workers: Vec<WorkerReport>,
    pub events: ForwarderStats,
}

impl PipelineReport {
    pub fn total_faults(&self) -> u32 {
        self.workers.iter().map(|w| w.faults).sum()
    }
}

/// Running gesture pipeline.
///
/// Frames go in through [`submit`](Self::submit) on the caller's thread.
/// Every enabled gesture runs on its own worker thread; their events meet
/// in one queue that a single forwarder thread drains into the sink.
pub struct GesturePipeline {
    dispatcher: Option<Dispatcher>,
    events: Arc<BoundedQueue<ActionEvent>>,
    forwarder: Option<JoinHandle<ForwarderStats>>,
    render: RenderQueue,
    visual_output_stopped: Arc<AtomicBool>,
}

fn forward_events<S: ActionSink>(mut sink: S, events: Arc<BoundedQueue<ActionEvent>>) -> ForwarderStats {
    let mut stats = ForwarderStats::default();
    while let Some(event) = events.dequeue() {
        match sink.handle(&event) {
            Ok(()) => stats.forwarded += 1,
            Err(e) => {
                stats.sink_errors += 1;
                warn!(%event, error = %e, "sink rejected event");
            }
        }
    }
    if let Err(e) = sink.finish() {
        warn!(error = %e, "sink failed to finish");
    }
    info!(forwarded = stats.forwarded, errors = stats.sink_errors, "event forwarder stopped");
    stats
}

/// A forwarder panic is logged here and surfaces as `WorkerStopped`.
fn join_forwarder(handle: JoinHandle<ForwarderStats>) -> Result<ForwarderStats> {
    handle.join().map_err(|payload| {
        error!(panic = %panic_message(&*payload), "event forwarder panicked");
        PipelineError::WorkerStopped("gesture-events".into())
    })
}

impl GesturePipeline {
    pub fn start<S, G>(config: &PipelineConfig, sink: S, gate: G) -> Result<Self>
    where
        S: ActionSink + 'static,
        G: RecognitionGate + 'static,
    {
        config.validate()?;

        let events = Arc::new(BoundedQueue::new(config.queue_capacity));
        let forwarder = thread::Builder::new().name("gesture-events".into()).spawn({
            let events = Arc::clone(&events);
            move || forward_events(sink, events)
        })?;

        let mut workers = Vec::with_capacity(config.enabled_gestures.len());
        for &kind in &config.enabled_gestures {
            let started = GestureWorker::start(
                Detector::build(kind, config),
                Arc::clone(&events),
                config.queue_capacity,
                config.max_worker_faults,
            );
            match started {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    error!(gesture = %kind, error = %e, "failed to start gesture worker");
                    drop(workers);
                    events.release();
                    // The caller gets the startup error; a forwarder panic is only logged.
                    if let Err(join_error) = join_forwarder(forwarder) {
                        warn!(error = %join_error, "event forwarder failed during startup cleanup");
                    }
                    return Err(e);
                }
            }
        }

        let render = Arc::new(BoundedQueue::new(config.queue_capacity));
        let visual_output_stopped = Arc::new(AtomicBool::new(config.visual_output_stopped));
        let dispatcher = Dispatcher::new(
            workers,
            Box::new(gate),
            Arc::clone(&render),
            Arc::clone(&visual_output_stopped),
        );

        info!(gestures = ?dispatcher.active_gestures(), "gesture pipeline started");
        Ok(Self {
            dispatcher: Some(dispatcher),
            events,
            forwarder: Some(forwarder),
            render,
            visual_output_stopped,
        })
    }

    pub fn submit(&mut self, frame: SkeletalFrame) -> Result<DispatchOutcome> {
        match self.dispatcher.as_mut() {
            Some(dispatcher) => dispatcher.dispatch(frame),
            None => Err(PipelineError::QueueReleased),
        }
    }

    /// Queue the external renderer reads from. Released on shutdown.
    pub fn render_queue(&self) -> RenderQueue {
        Arc::clone(&self.render)
    }

    pub fn set_visual_output_stopped(&self, stopped: bool) {
        self.visual_output_stopped.store(stopped, Ordering::Relaxed);
    }

    pub fn is_armed(&self) -> bool {
        self.dispatcher.as_ref().is_some_and(Dispatcher::is_armed)
    }

    /// Stops taking frames, lets every worker finish its backlog, then
    /// drains the remaining events into the sink. Safe to call twice.
    pub fn shutdown(&mut self) -> Result<PipelineReport> {
        let workers = match self.dispatcher.take() {
            Some(mut dispatcher) => dispatcher.stop_workers(),
            None => Vec::new(),
        };

        self.events.release();
        self.render.release();

        let events = match self.forwarder.take() {
            Some(handle) => join_forwarder(handle)?,
            None => ForwarderStats::default(),
        };

        info!(workers = workers.len(), forwarded = events.forwarded, "gesture pipeline shut down");
        Ok(PipelineReport { workers, events })
    }
}

impl Drop for GesturePipeline {
    fn drop(&mut self) {
        if self.forwarder.is_some() {
            if let Err(e) = self.shutdown() {
                error!(error = %e, "pipeline shutdown failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::GestureKind;
    use crate::gate::AlwaysArmed;
    use crate::sink::RecordingSink;
    use crate::skeleton::{JointId, SkeletonBuilder};

    struct CrashingSink;

    impl ActionSink for CrashingSink {
        fn handle(&mut self, event: &ActionEvent) -> Result<()> {
            panic!("injector crashed on {event}");
        }
    }

    fn quiet_config(gestures: Vec<GestureKind>) -> PipelineConfig {
        PipelineConfig { enabled_gestures: gestures, visual_output_stopped: true, ..PipelineConfig::default() }
    }

    #[test]
    fn submit_after_shutdown_is_rejected() {
        let mut pipeline = GesturePipeline::start(&quiet_config(vec![GestureKind::Jump]), RecordingSink::new(), AlwaysArmed).unwrap();
        pipeline.shutdown().unwrap();

        let frame = SkeletalFrame::single(0, 0.0, SkeletonBuilder::standing().build());
        assert!(matches!(pipeline.submit(frame), Err(PipelineError::QueueReleased)));
        assert!(pipeline.shutdown().unwrap().workers.is_empty());
    }

    #[test]
    fn invalid_config_does_not_start() {
        let mut config = quiet_config(vec![GestureKind::Jump]);
        config.queue_capacity = 0;
        assert!(matches!(
            GesturePipeline::start(&config, RecordingSink::new(), AlwaysArmed),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn shutdown_finishes_sink_and_reports_workers() {
        let sink = RecordingSink::new();
        let config = quiet_config(vec![GestureKind::Jump, GestureKind::AimShoot]);
        let mut pipeline = GesturePipeline::start(&config, sink.clone(), AlwaysArmed).unwrap();

        for n in 0..5 {
            pipeline.submit(SkeletalFrame::single(n, n as f64 * 33.0, SkeletonBuilder::standing().build())).unwrap();
        }
        let report = pipeline.shutdown().unwrap();

        assert!(sink.is_finished());
        assert_eq!(report.workers.len(), 2);
        assert!(report.workers.iter().all(|w| w.frames == 5));
        assert_eq!(report.total_faults(), 0);
    }

    #[test]
    fn render_queue_receives_frames_when_visuals_enabled() {
        let config = PipelineConfig { enabled_gestures: vec![GestureKind::Jump], ..PipelineConfig::default() };
        let mut pipeline = GesturePipeline::start(&config, RecordingSink::new(), AlwaysArmed).unwrap();
        let render = pipeline.render_queue();

        pipeline.submit(SkeletalFrame::single(0, 0.0, SkeletonBuilder::standing().build())).unwrap();
        pipeline.set_visual_output_stopped(true);
        pipeline.submit(SkeletalFrame::single(1, 33.0, SkeletonBuilder::standing().build())).unwrap();

        assert_eq!(render.size(), 1);
        pipeline.shutdown().unwrap();
        assert_eq!(render.dequeue().map(|f| f.frame().frame_number), Some(0));
        assert!(render.dequeue().is_none());
    }

    #[test]
    fn forwarder_panic_is_reported_as_stopped_worker() {
        let handle = thread::spawn(|| -> ForwarderStats { panic!("sink gone") });
        assert!(matches!(
            join_forwarder(handle),
            Err(PipelineError::WorkerStopped(ref name)) if name == "gesture-events"
        ));
    }

    #[test]
    fn crashing_sink_fails_shutdown_once() {
        let mut pipeline = GesturePipeline::start(&quiet_config(vec![GestureKind::Jump]), CrashingSink, AlwaysArmed).unwrap();
        for step in 0..7u64 {
            let skeleton = SkeletonBuilder::standing()
                .offset(JointId::HipCenter, 0.0, 0.07 * step as f32, 0.0)
                .build();
            pipeline.submit(SkeletalFrame::single(step, step as f64 * 33.0, skeleton)).unwrap();
        }

        assert!(matches!(pipeline.shutdown(), Err(PipelineError::WorkerStopped(_))));
        // The forwarder handle is gone; a second shutdown has nothing to report.
        assert_eq!(pipeline.shutdown().unwrap().events, ForwarderStats::default());
    }
}
