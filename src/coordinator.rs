use crate::{
    common::Frame,
    config::Configuration,
    error::{MeterError, PipelineError},
    metrics::{FrameEvent, MeasurementListener, PerformanceMeasurer, SharedMeasurer},
    pipeline::{
        services::{Detector, FrameSource, SourceStats},
        types::{best_detection, Detection},
    },
};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Handed from the inference stage to the render stage.
struct RenderJob {
    frame: Frame,
    best: Option<Detection>,
    done: oneshot::Sender<()>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub captured: u64,
    pub dropped: u64,
    pub inferred: u64,
    pub rendered: u64,
}

/// Runs capture, inference and render as separate tasks sharing one measurer.
///
/// The inference stage starts a measurement and labels `endInference`; the
/// render stage ends it. The inference stage waits for the render stage to
/// finish a frame before taking the next one.
pub struct Coordinator {
    source_task: Option<JoinHandle<SourceStats>>,
    inference_task: Option<JoinHandle<u64>>,
    render_task: Option<JoinHandle<u64>>,
    measurer: SharedMeasurer,
    cancel_token: CancellationToken,
}

impl Coordinator {
    fn new(
        configuration: Configuration,
        detector: Box<dyn Detector>,
        listener: Option<Weak<dyn MeasurementListener>>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let mut measurer = PerformanceMeasurer::from_configuration(&configuration);
        if let Some(listener) = listener {
            measurer.set_weak_listener(listener);
        }
        let measurer = SharedMeasurer::new(measurer);

        let (frame_tx, frame_rx) = mpsc::channel(configuration.frame_buffer_size.max(1));
        let (render_tx, render_rx) = mpsc::channel(1);

        let source = FrameSource::new(configuration.frame_rate, frame_tx);
        let source_task = tokio::spawn(source.run(cancel_token.clone()));
        let inference_task = Self::start_inference_task(
            detector,
            frame_rx,
            render_tx,
            measurer.clone(),
            cancel_token.clone(),
        );
        let render_task = Self::start_render_task(render_rx, measurer.clone());

        Self {
            source_task: Some(source_task),
            inference_task: Some(inference_task),
            render_task: Some(render_task),
            measurer,
            cancel_token,
        }
    }

    fn start_inference_task(
        mut detector: Box<dyn Detector>,
        mut frame_rx: Receiver<Frame>,
        render_tx: Sender<RenderJob>,
        measurer: SharedMeasurer,
        cancel_token: CancellationToken,
    ) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut inferred = 0;
            loop {
                let frame = tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    frame = frame_rx.recv() => match frame {
                        Some(frame) => frame,
                        None => break,
                    },
                };

                match Self::infer(&mut *detector, frame, &render_tx, &measurer).await {
                    Ok(()) => inferred += 1,
                    Err(PipelineError::ChannelClosed(stage)) => {
                        warn!("{} stage closed, stopping inference", stage);
                        break;
                    }
                    Err(e) => warn!("Inference error: {}", e),
                }
            }
            debug!(inferred, "inference stage stopped");
            inferred
        })
    }

    #[instrument(skip_all, fields(frame = %frame.id(), sequence = frame.sequence()))]
    async fn infer(
        detector: &mut dyn Detector,
        frame: Frame,
        render_tx: &Sender<RenderJob>,
        measurer: &SharedMeasurer,
    ) -> Result<(), PipelineError> {
        measurer.start_measurement();
        let detections = detector.detect(&frame).await?;
        measurer.label_event(FrameEvent::EndInference);

        let best = best_detection(&detections).cloned();
        debug!(
            detector = detector.name(),
            count = detections.len(),
            "inference finished"
        );

        let (done, rendered) = oneshot::channel();
        render_tx
            .send(RenderJob { frame, best, done })
            .await
            .map_err(|_| PipelineError::ChannelClosed("render"))?;
        rendered
            .await
            .map_err(|_| PipelineError::ChannelClosed("render"))
    }

    fn start_render_task(
        mut render_rx: Receiver<RenderJob>,
        measurer: SharedMeasurer,
    ) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut rendered = 0;
            while let Some(job) = render_rx.recv().await {
                match &job.best {
                    Some(best) => debug!(frame = %job.frame.id(), "best detection: {}", best),
                    None => debug!(frame = %job.frame.id(), "no detections"),
                }
                measurer.end_measurement();
                rendered += 1;
                let _ = job.done.send(());
            }
            debug!(rendered, "render stage stopped");
            rendered
        })
    }

    pub fn measurer(&self) -> &SharedMeasurer {
        &self.measurer
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Cancels the pipeline and waits for every stage to drain.
    pub async fn shutdown(mut self) -> Result<CoordinatorStats, MeterError> {
        self.stop();
        let mut stats = CoordinatorStats::default();
        if let Some(task) = self.source_task.take() {
            let source = task.await.map_err(PipelineError::from)?;
            stats.captured = source.captured;
            stats.dropped = source.dropped;
        }
        if let Some(task) = self.inference_task.take() {
            stats.inferred = task.await.map_err(PipelineError::from)?;
        }
        if let Some(task) = self.render_task.take() {
            stats.rendered = task.await.map_err(PipelineError::from)?;
        }
        Ok(stats)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
        for task in [self.inference_task.take(), self.render_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
        if let Some(task) = self.source_task.take() {
            task.abort();
        }
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    detector: Option<Box<dyn Detector>>,
    listener: Option<Weak<dyn MeasurementListener>>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            detector: None,
            listener: None,
        }
    }

    // Overrides the configured ring capacity.
    pub fn ring_capacity(mut self, ring_capacity: usize) -> Self {
        self.configuration.ring_capacity = ring_capacity;
        self
    }

    // Overrides the configured filter window.
    pub fn filter_window(mut self, filter_window: usize) -> Self {
        self.configuration.filter_window = filter_window;
        self
    }

    // Overrides the simulated capture rate.
    pub fn frame_rate(mut self, frame_rate: f64) -> Self {
        self.configuration.frame_rate = frame_rate;
        self
    }

    pub fn frame_buffer_size(mut self, frame_buffer_size: usize) -> Self {
        self.configuration.frame_buffer_size = frame_buffer_size;
        self
    }

    pub fn detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn listener<L: MeasurementListener + 'static>(mut self, listener: &Arc<L>) -> Self {
        let listener = Arc::downgrade(listener);
        let listener: Weak<dyn MeasurementListener> = listener;
        self.listener = Some(listener);
        self
    }

    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Coordinator, MeterError> {
        self.configuration.validate()?;
        let detector = self
            .detector
            .ok_or_else(|| PipelineError::NotConfigured("detector not set".to_string()))?;
        Ok(Coordinator::new(self.configuration, detector, self.listener))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::metrics::MetricChannel;
    use crate::pipeline::services::{MetricsDisplay, SimulatedDetector};
    use crate::pipeline::types::BoundingBox;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedDetector {
        latency: Duration,
        fail_every: Option<u64>,
        calls: u64,
    }

    #[async_trait]
    impl Detector for FixedDetector {
        async fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, PipelineError> {
            self.calls += 1;
            tokio::time::sleep(self.latency).await;
            if let Some(n) = self.fail_every {
                if self.calls % n == 0 {
                    return Err(PipelineError::DetectorError(
                        frame.id(),
                        "model failed".to_string(),
                    ));
                }
            }
            Ok(vec![Detection::new(
                Some("person"),
                0.8,
                BoundingBox::new(0.2, 0.2, 0.5, 0.5),
            )])
        }

        fn name(&self) -> &'static str {
            "FixedDetector"
        }
    }

    fn fixed(latency_ms: u64, fail_every: Option<u64>) -> Box<dyn Detector> {
        Box::new(FixedDetector {
            latency: Duration::from_millis(latency_ms),
            fail_every,
            calls: 0,
        })
    }

    #[tokio::test]
    async fn build_requires_detector() {
        let result = CoordinatorBuilder::new(Configuration::default()).build();
        assert!(matches!(
            result,
            Err(MeterError::PipelineError(PipelineError::NotConfigured(_)))
        ));
    }

    #[tokio::test]
    async fn build_validates_configuration() {
        let result = CoordinatorBuilder::new(Configuration::default())
            .ring_capacity(0)
            .detector(fixed(1, None))
            .build();
        assert!(matches!(result, Err(MeterError::ConfigError(_))));
    }

    #[tokio::test]
    async fn build_rejects_untickable_frame_rate() {
        let result = CoordinatorBuilder::new(Configuration::default())
            .frame_rate(1e12)
            .detector(fixed(1, None))
            .build();
        assert!(matches!(
            result,
            Err(MeterError::ConfigError(ConfigError::InvalidFrameRate(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn pipeline_reports_smoothed_metrics() {
        let display = Arc::new(MetricsDisplay::new(false, 10));
        let coordinator = CoordinatorBuilder::new(Configuration::default())
            .frame_rate(20.0)
            .filter_window(5)
            .detector(fixed(10, None))
            .listener(&display)
            .build()
            .expect("Failed to build coordinator");

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let measurer = coordinator.measurer().clone();
        let stats = coordinator.shutdown().await.unwrap();

        assert!(stats.rendered >= 10);
        assert_eq!(stats.inferred, stats.rendered);
        assert!(display.updates() >= 9);

        let latest = display.latest().unwrap();
        assert_eq!(latest, measurer.snapshot());
        assert!(latest.inference_time_ms > 9.9);
        assert!(latest.execution_time_ms >= latest.inference_time_ms);
        assert!(latest.fps > 0.0 && latest.fps <= 20.5);
        assert_eq!(measurer.average(MetricChannel::Fps), latest.fps);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_detector_drops_frames() {
        let coordinator = CoordinatorBuilder::new(Configuration::default())
            .frame_rate(100.0)
            .detector(fixed(35, None))
            .build()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let stats = coordinator.shutdown().await.unwrap();

        assert!(stats.dropped > 0);
        assert!(stats.captured > stats.rendered);
    }

    #[tokio::test(start_paused = true)]
    async fn detector_errors_do_not_stop_the_pipeline() {
        let display = Arc::new(MetricsDisplay::new(false, 1));
        let coordinator = CoordinatorBuilder::new(Configuration::default())
            .frame_rate(50.0)
            .detector(fixed(2, Some(3)))
            .listener(&display)
            .build()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        let stats = coordinator.shutdown().await.unwrap();

        assert!(stats.rendered > 0);
        assert!(display.updates() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_with_simulated_detector() {
        let configuration = Configuration {
            detector_seed: Some(3),
            ..Configuration::default()
        };
        let detector = SimulatedDetector::from_configuration(&configuration);
        let coordinator = CoordinatorBuilder::new(configuration)
            .detector(Box::new(detector))
            .build()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        let stats = coordinator.shutdown().await.unwrap();
        assert!(stats.rendered > 0);
    }
}
