use thiserror::Error;
use uuid::Uuid;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Configuration Error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Parse Error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Pipeline Error: {0}")]
    PipelineError(#[from] PipelineError),
}

// Configuration Error Type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),
    #[error("Ring capacity must be at least 1, got {0}")]
    InvalidRingCapacity(usize),
    #[error("Filter window must be at least 1, got {0}")]
    InvalidFilterWindow(usize),
    #[error("Minimum frame interval must be finite and non-negative, got {0}")]
    InvalidFrameInterval(f64),
    #[error("Frame rate must be finite and positive, got {0}")]
    InvalidFrameRate(f64),
    #[error("Invalid inference latency range {0}..{1} ms")]
    InvalidLatencyRange(f64, f64),
    #[error("Unknown log level: {0}")]
    InvalidLogLevel(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown metric channel: {0}")]
    UnknownMetric(String),
    #[error("Unknown frame event: {0}")]
    UnknownEvent(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Detector failed on frame {0}: {1}")]
    DetectorError(Uuid, String),
    #[error("Stage channel closed: {0}")]
    ChannelClosed(&'static str),
    #[error("Pipeline not set up: {0}")]
    NotConfigured(String),
    #[error("Pipeline task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}
