use super::channels::{MetricChannel, MetricFilters, SmoothedMetrics};
use super::clock::{Clock, MonotonicClock};
use super::frame_timer::{FrameEvent, FrameTimer};
use crate::config::Configuration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, trace};

/// Receives smoothed metrics once per fully timed frame.
pub trait MeasurementListener: Send + Sync {
    fn on_measurement_update(&self, metrics: &SmoothedMetrics);
}

/// Turns per-frame timestamps into smoothed inference time, execution time and FPS.
pub struct PerformanceMeasurer {
    timer: FrameTimer,
    filters: MetricFilters,
    clock: Arc<dyn Clock>,
    listener: Option<Weak<dyn MeasurementListener>>,
}

impl PerformanceMeasurer {
    pub fn new(ring_capacity: usize, filter_window: usize) -> Self {
        Self {
            timer: FrameTimer::new(ring_capacity),
            filters: MetricFilters::new(filter_window),
            clock: Arc::new(MonotonicClock::new()),
            listener: None,
        }
    }

    pub fn from_configuration(configuration: &Configuration) -> Self {
        let mut measurer = Self::new(configuration.ring_capacity, configuration.filter_window);
        measurer.timer = measurer
            .timer
            .with_min_frame_interval(configuration.min_frame_interval_secs);
        measurer
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_min_frame_interval(mut self, secs: f64) -> Self {
        self.timer = self.timer.with_min_frame_interval(secs);
        self
    }

    /// Holds only a weak reference; a dropped listener stops receiving updates.
    pub fn set_listener<L: MeasurementListener + 'static>(&mut self, listener: &Arc<L>) {
        let listener = Arc::downgrade(listener);
        let listener: Weak<dyn MeasurementListener> = listener;
        self.set_weak_listener(listener);
    }

    pub fn set_weak_listener(&mut self, listener: Weak<dyn MeasurementListener>) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn start_measurement(&mut self) {
        let now = self.clock.now();
        self.timer.start_at(now);
    }

    pub fn label_event(&mut self, event: FrameEvent) {
        let now = self.clock.now();
        self.timer.label_at(event, now);
    }

    pub fn label_measurement(&mut self, name: Option<&str>) {
        let now = self.clock.now();
        self.timer.label_named_at(name, now);
    }

    /// Ends the current frame and notifies the listener if it was fully timed.
    pub fn end_measurement(&mut self) -> Option<SmoothedMetrics> {
        let metrics = self.finish_frame()?;
        if let Some(listener) = self.upgrade_listener() {
            listener.on_measurement_update(&metrics);
        }
        Some(metrics)
    }

    pub fn append(&mut self, channel: MetricChannel, value: f64) {
        self.filters.append(channel, value);
    }

    pub fn average(&self, channel: MetricChannel) -> f64 {
        self.filters.average(channel)
    }

    pub fn snapshot(&self) -> SmoothedMetrics {
        self.filters.snapshot()
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
    }

    fn finish_frame(&mut self) -> Option<SmoothedMetrics> {
        let now = self.clock.now();
        let timing = self.timer.end_at(now)?;

        self.filters
            .append(MetricChannel::InferenceTime, timing.inference_secs * 1000.0);
        self.filters
            .append(MetricChannel::ExecutionTime, timing.execution_secs * 1000.0);
        self.filters.append(MetricChannel::Fps, timing.fps());

        let metrics = self.filters.snapshot();
        trace!(?timing, %metrics, "frame measured");
        Some(metrics)
    }

    fn upgrade_listener(&mut self) -> Option<Arc<dyn MeasurementListener>> {
        let listener = self.listener.as_ref()?.upgrade();
        if listener.is_none() {
            debug!("measurement listener dropped, detaching");
            self.listener = None;
        }
        listener
    }
}

impl Default for PerformanceMeasurer {
    fn default() -> Self {
        Self::from_configuration(&Configuration::default())
    }
}

/// Thread-safe handle to a [`PerformanceMeasurer`].
///
/// Every call takes the same lock, so starts, labels and ends coming from
/// different tasks never interleave. The listener runs after the lock is
/// released and may call back into the handle.
#[derive(Clone)]
pub struct SharedMeasurer {
    inner: Arc<Mutex<PerformanceMeasurer>>,
}

impl SharedMeasurer {
    pub fn new(measurer: PerformanceMeasurer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(measurer)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PerformanceMeasurer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_listener<L: MeasurementListener + 'static>(&self, listener: &Arc<L>) {
        self.lock().set_listener(listener);
    }

    pub fn start_measurement(&self) {
        self.lock().start_measurement();
    }

    pub fn label_event(&self, event: FrameEvent) {
        self.lock().label_event(event);
    }

    pub fn label_measurement(&self, name: Option<&str>) {
        self.lock().label_measurement(name);
    }

    pub fn end_measurement(&self) -> Option<SmoothedMetrics> {
        let (metrics, listener) = {
            let mut measurer = self.lock();
            let metrics = measurer.finish_frame()?;
            (metrics, measurer.upgrade_listener())
        };
        if let Some(listener) = listener {
            listener.on_measurement_update(&metrics);
        }
        Some(metrics)
    }

    pub fn append(&self, channel: MetricChannel, value: f64) {
        self.lock().append(channel, value);
    }

    pub fn average(&self, channel: MetricChannel) -> f64 {
        self.lock().average(channel)
    }

    pub fn snapshot(&self) -> SmoothedMetrics {
        self.lock().snapshot()
    }
}

impl From<PerformanceMeasurer> for SharedMeasurer {
    fn from(measurer: PerformanceMeasurer) -> Self {
        Self::new(measurer)
    }
}
