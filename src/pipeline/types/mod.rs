pub mod detection;

pub use detection::{best_detection, BoundingBox, Detection};
