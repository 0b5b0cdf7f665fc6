use super::moving_average::MovingAverageFilter;
use crate::error::ParseError;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A smoothed metric stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricChannel {
    InferenceTime,
    ExecutionTime,
    Fps,
}

impl MetricChannel {
    pub const ALL: [MetricChannel; 3] = [
        MetricChannel::InferenceTime,
        MetricChannel::ExecutionTime,
        MetricChannel::Fps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricChannel::InferenceTime => "inferenceTime",
            MetricChannel::ExecutionTime => "executionTime",
            MetricChannel::Fps => "fps",
        }
    }
}

impl fmt::Display for MetricChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricChannel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricChannel::ALL
            .into_iter()
            .find(|channel| channel.as_str() == s)
            .ok_or_else(|| ParseError::UnknownMetric(s.to_string()))
    }
}

/// One moving average filter per channel.
#[derive(Debug, Clone)]
pub struct MetricFilters {
    filters: IndexMap<MetricChannel, MovingAverageFilter>,
}

impl MetricFilters {
    pub fn new(window: usize) -> Self {
        Self {
            filters: MetricChannel::ALL
                .into_iter()
                .map(|channel| (channel, MovingAverageFilter::new(window)))
                .collect(),
        }
    }

    pub fn append(&mut self, channel: MetricChannel, value: f64) {
        if let Some(filter) = self.filters.get_mut(&channel) {
            filter.append(value);
        }
    }

    pub fn average(&self, channel: MetricChannel) -> f64 {
        self.filters
            .get(&channel)
            .map(MovingAverageFilter::average)
            .unwrap_or(0.0)
    }

    pub fn filter(&self, channel: MetricChannel) -> Option<&MovingAverageFilter> {
        self.filters.get(&channel)
    }

    pub fn snapshot(&self) -> SmoothedMetrics {
        SmoothedMetrics {
            inference_time_ms: self.average(MetricChannel::InferenceTime),
            execution_time_ms: self.average(MetricChannel::ExecutionTime),
            fps: self.average(MetricChannel::Fps),
        }
    }

    pub fn reset(&mut self) {
        for filter in self.filters.values_mut() {
            filter.reset();
        }
    }
}

/// Post-filter values handed to listeners. Rounded only when displayed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothedMetrics {
    pub inference_time_ms: f64,
    pub execution_time_ms: f64,
    pub fps: f64,
}

impl fmt::Display for SmoothedMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inference {:.1} ms | execution {:.1} ms | {:.1} fps",
            self.inference_time_ms, self.execution_time_ms, self.fps
        )
    }
}
