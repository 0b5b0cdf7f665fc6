pub mod channels;
pub mod clock;
pub mod frame_timer;
pub mod measurer;
pub mod moving_average;

pub use channels::{MetricChannel, MetricFilters, SmoothedMetrics};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use frame_timer::{FrameEvent, FrameTimer, FrameTiming, MeasurementSlot};
pub use measurer::{MeasurementListener, PerformanceMeasurer, SharedMeasurer};
pub use moving_average::MovingAverageFilter;
