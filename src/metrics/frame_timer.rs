use crate::error::ParseError;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_RING_CAPACITY: usize = 30;

/// Frames starting closer together than this are not reported.
pub const DEFAULT_MIN_FRAME_INTERVAL_SECS: f64 = 1e-6;

/// Timestamped points in a frame's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameEvent {
    Start,
    EndInference,
    End,
}

impl FrameEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameEvent::Start => "start",
            FrameEvent::EndInference => "endInference",
            FrameEvent::End => "end",
        }
    }
}

impl fmt::Display for FrameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameEvent {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(FrameEvent::Start),
            "endInference" => Ok(FrameEvent::EndInference),
            "end" => Ok(FrameEvent::End),
            other => Err(ParseError::UnknownEvent(other.to_string())),
        }
    }
}

/// Timestamps recorded for a single frame.
///
/// The three events the timer computes with are plain fields. Any other
/// label lands in `marks`, a short association list in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSlot {
    start: Option<f64>,
    end_inference: Option<f64>,
    end: Option<f64>,
    marks: Vec<(String, f64)>,
}

impl MeasurementSlot {
    pub fn get(&self, event: FrameEvent) -> Option<f64> {
        match event {
            FrameEvent::Start => self.start,
            FrameEvent::EndInference => self.end_inference,
            FrameEvent::End => self.end,
        }
    }

    /// Looks up any label, known event or custom mark.
    pub fn mark(&self, name: &str) -> Option<f64> {
        match name.parse::<FrameEvent>() {
            Ok(event) => self.get(event),
            Err(_) => self
                .marks
                .iter()
                .find(|(mark, _)| mark == name)
                .map(|(_, at)| *at),
        }
    }

    pub fn marks(&self) -> impl Iterator<Item = (&str, f64)> {
        self.marks.iter().map(|(name, at)| (name.as_str(), *at))
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end_inference.is_none()
            && self.end.is_none()
            && self.marks.is_empty()
    }

    fn stamp(&mut self, event: FrameEvent, at: f64) {
        match event {
            FrameEvent::Start => self.start = Some(at),
            FrameEvent::EndInference => self.end_inference = Some(at),
            FrameEvent::End => self.end = Some(at),
        }
    }

    fn stamp_named(&mut self, name: &str, at: f64) {
        match name.parse::<FrameEvent>() {
            Ok(event) => self.stamp(event, at),
            Err(_) => match self.marks.iter_mut().find(|(mark, _)| mark == name) {
                Some(entry) => entry.1 = at,
                None => self.marks.push((name.to_string(), at)),
            },
        }
    }

    fn clear(&mut self) {
        self.start = None;
        self.end_inference = None;
        self.end = None;
        self.marks.clear();
    }
}

/// Raw timings of one completed frame, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    pub inference_secs: f64,
    pub execution_secs: f64,
    /// Gap between this frame's start and the previous frame's start.
    pub frame_interval_secs: f64,
}

impl FrameTiming {
    pub fn fps(&self) -> f64 {
        1.0 / self.frame_interval_secs
    }
}

/// Ring of per-frame timestamp records.
///
/// `slots[index]` is the frame in flight and `slots[index - 1]` the one before
/// it. Starting a frame reuses the oldest slot, so a frame that never ends is
/// simply overwritten `capacity` frames later.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    slots: Vec<MeasurementSlot>,
    index: usize,
    min_frame_interval_secs: f64,
}

impl FrameTimer {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![MeasurementSlot::default(); capacity],
            // First start lands on slot 0.
            index: capacity - 1,
            min_frame_interval_secs: DEFAULT_MIN_FRAME_INTERVAL_SECS,
        }
    }

    pub fn with_min_frame_interval(mut self, secs: f64) -> Self {
        self.min_frame_interval_secs = secs;
        self
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &MeasurementSlot {
        &self.slots[self.index]
    }

    pub fn previous(&self) -> &MeasurementSlot {
        &self.slots[self.previous_index()]
    }

    pub fn slot(&self, index: usize) -> Option<&MeasurementSlot> {
        self.slots.get(index)
    }

    fn previous_index(&self) -> usize {
        (self.index + self.capacity() - 1) % self.capacity()
    }

    pub fn start_at(&mut self, at: f64) {
        self.index = (self.index + 1) % self.capacity();
        let slot = &mut self.slots[self.index];
        slot.clear();
        slot.stamp(FrameEvent::Start, at);
    }

    pub fn label_at(&mut self, event: FrameEvent, at: f64) {
        self.slots[self.index].stamp(event, at);
    }

    /// Stamps an arbitrary label. `None` and empty names are ignored.
    pub fn label_named_at(&mut self, name: Option<&str>, at: f64) {
        match name {
            Some(name) if !name.is_empty() => self.slots[self.index].stamp_named(name, at),
            _ => {}
        }
    }

    /// Stamps `end` and derives the frame's timings.
    ///
    /// Returns `None` when any of the current `start`, `endInference`, `end`
    /// or the previous `start` is missing, or when the gap between the two
    /// starts is not positive or below the minimum frame interval.
    pub fn end_at(&mut self, at: f64) -> Option<FrameTiming> {
        self.slots[self.index].stamp(FrameEvent::End, at);

        let current = self.current();
        let (Some(start), Some(end_inference), Some(end)) = (
            current.get(FrameEvent::Start),
            current.get(FrameEvent::EndInference),
            current.get(FrameEvent::End),
        ) else {
            debug!(index = self.index, "incomplete frame timestamps, skipping");
            return None;
        };
        let Some(previous_start) = self.previous().get(FrameEvent::Start) else {
            debug!(index = self.index, "no previous frame start, skipping");
            return None;
        };

        let frame_interval_secs = start - previous_start;
        let usable =
            frame_interval_secs > 0.0 && frame_interval_secs >= self.min_frame_interval_secs;
        if !usable {
            debug!(
                index = self.index,
                frame_interval_secs, "frame interval below minimum, skipping"
            );
            return None;
        }

        Some(FrameTiming {
            inference_secs: end_inference - start,
            execution_secs: end - start,
            frame_interval_secs,
        })
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}
