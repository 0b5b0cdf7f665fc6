pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod pipeline;

pub use crate::config::Configuration;
pub use crate::coordinator::{Coordinator, CoordinatorBuilder, CoordinatorStats};
pub use crate::error::{ConfigError, MeterError, ParseError, PipelineError};
pub use crate::metrics::{
    FrameEvent, FrameTimer, MeasurementListener, MetricChannel, MovingAverageFilter,
    PerformanceMeasurer, SharedMeasurer, SmoothedMetrics,
};
