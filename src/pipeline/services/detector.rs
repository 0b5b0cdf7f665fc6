use crate::common::Frame;
use crate::config::Configuration;
use crate::error::PipelineError;
use crate::pipeline::types::{BoundingBox, Detection};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{instrument, trace};

/// An object detection model. Opaque to the rest of the pipeline.
#[async_trait]
pub trait Detector: Send {
    async fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, PipelineError>;

    fn name(&self) -> &'static str;
}

const YOLO_LABELS: [&str; 10] = [
    "person",
    "bicycle",
    "car",
    "motorbike",
    "bus",
    "dog",
    "cat",
    "bottle",
    "chair",
    "tvmonitor",
];

const MAX_DETECTIONS: usize = 4;

/// Stands in for a YOLO model: waits a random latency and returns random boxes.
pub struct SimulatedDetector {
    rng: StdRng,
    latency_ms: (f64, f64),
}

impl SimulatedDetector {
    pub fn new(latency_min_ms: f64, latency_max_ms: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            latency_ms: (latency_min_ms, latency_max_ms.max(latency_min_ms)),
        }
    }

    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self::new(
            configuration.inference_latency_min_ms,
            configuration.inference_latency_max_ms,
            configuration.detector_seed,
        )
    }

    fn random_detection(&mut self) -> Detection {
        let width = self.rng.random_range(0.05f32..=0.6);
        let height = self.rng.random_range(0.05f32..=0.6);
        let bounding_box = BoundingBox::new(
            self.rng.random_range(0.0..=1.0 - width),
            self.rng.random_range(0.0..=1.0 - height),
            width,
            height,
        );
        let label = YOLO_LABELS[self.rng.random_range(0..YOLO_LABELS.len())];
        Detection::new(Some(label), self.rng.random_range(0.05f32..=0.99), bounding_box)
    }
}

#[async_trait]
impl Detector for SimulatedDetector {
    #[instrument(skip(self, frame), fields(frame = %frame.id()))]
    async fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, PipelineError> {
        let (low, high) = self.latency_ms;
        let latency = self.rng.random_range(low..=high);
        tokio::time::sleep(Duration::from_secs_f64(latency / 1000.0)).await;

        let count = self.rng.random_range(0..=MAX_DETECTIONS);
        let detections: Vec<Detection> = (0..count).map(|_| self.random_detection()).collect();
        trace!(count, latency_ms = latency, "simulated inference finished");
        Ok(detections)
    }

    fn name(&self) -> &'static str {
        "SimulatedDetector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn seeded_detector_is_reproducible() {
        let frame = Frame::capture(0);
        let mut first = SimulatedDetector::new(5.0, 10.0, Some(42));
        let mut second = SimulatedDetector::new(5.0, 10.0, Some(42));

        for _ in 0..5 {
            let a = first.detect(&frame).await.unwrap();
            let b = second.detect(&frame).await.unwrap();
            assert_eq!(a, b);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn detections_stay_inside_the_image() {
        let frame = Frame::capture(0);
        let mut detector = SimulatedDetector::new(1.0, 1.0, Some(7));
        for _ in 0..50 {
            for detection in detector.detect(&frame).await.unwrap() {
                let bbox = detection.bounding_box;
                assert!(bbox.x >= 0.0 && bbox.x + bbox.width <= 1.0 + f32::EPSILON);
                assert!(bbox.y >= 0.0 && bbox.y + bbox.height <= 1.0 + f32::EPSILON);
                assert!((0.0..=1.0).contains(&detection.confidence));
                assert!(YOLO_LABELS.contains(&detection.label.as_str()));
            }
        }
        assert_eq!(detector.name(), "SimulatedDetector");
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_simulated_latency() {
        let frame = Frame::capture(0);
        let mut detector = SimulatedDetector::new(20.0, 20.0, Some(1));
        let started = tokio::time::Instant::now();
        detector.detect(&frame).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
