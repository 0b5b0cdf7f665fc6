pub mod detector;
pub mod frame_source;
pub mod metrics_display;

pub use detector::{Detector, SimulatedDetector};
pub use frame_source::{FrameSource, SourceStats};
pub use metrics_display::MetricsDisplay;
