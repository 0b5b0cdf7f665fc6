pub mod services;
pub mod types;

pub use services::{Detector, FrameSource, MetricsDisplay, SimulatedDetector};
pub use types::{best_detection, BoundingBox, Detection};
