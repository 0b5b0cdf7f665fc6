use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

const ENV_PREFIX: &str = "DETECTMETER";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Number of frames kept in the timing ring.
    pub ring_capacity: usize,
    /// Samples held by each moving average filter.
    pub filter_window: usize,
    /// Frames whose start is closer than this to the previous start are not reported.
    pub min_frame_interval_secs: f64,
    pub frame_rate: f64,
    pub frame_buffer_size: usize,
    pub run_for_secs: Option<u64>,
    pub log_level: String,
    pub json_report: bool,
    /// Log every Nth metrics update.
    pub report_every_frames: u64,
    pub inference_latency_min_ms: f64,
    pub inference_latency_max_ms: f64,
    pub detector_seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            ring_capacity: 30,
            filter_window: 10,
            min_frame_interval_secs: 1e-6,
            frame_rate: 30.0,
            frame_buffer_size: 1,
            run_for_secs: None,
            log_level: "info".to_string(),
            json_report: false,
            report_every_frames: 30,
            inference_latency_min_ms: 8.0,
            inference_latency_max_ms: 25.0,
            detector_seed: None,
        }
    }
}

impl Configuration {
    /// Loads defaults, then the optional file, then `DETECTMETER_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let configuration: Configuration = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_capacity == 0 {
            return Err(ConfigError::InvalidRingCapacity(self.ring_capacity));
        }
        if self.filter_window == 0 {
            return Err(ConfigError::InvalidFilterWindow(self.filter_window));
        }
        if !self.min_frame_interval_secs.is_finite() || self.min_frame_interval_secs < 0.0 {
            return Err(ConfigError::InvalidFrameInterval(
                self.min_frame_interval_secs,
            ));
        }
        if !self.frame_rate.is_finite()
            || self.frame_rate <= 0.0
            || self.frame_period() == Duration::ZERO
        {
            return Err(ConfigError::InvalidFrameRate(self.frame_rate));
        }
        let (low, high) = (self.inference_latency_min_ms, self.inference_latency_max_ms);
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
            return Err(ConfigError::InvalidLatencyRange(low, high));
        }
        self.max_log_level()?;
        Ok(())
    }

    /// Capture period for `frame_rate`. Zero when the rate is too high to tick.
    pub fn frame_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.frame_rate).unwrap_or(Duration::ZERO)
    }

    pub fn max_log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}
