use serde::Serialize;
use std::fmt;

/// Box in normalized image coordinates, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

impl Detection {
    pub const UNKNOWN_LABEL: &'static str = "unknown";

    /// Models may return observations without a class; those are labelled `unknown`.
    pub fn new(label: Option<&str>, confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            label: label.unwrap_or(Self::UNKNOWN_LABEL).to_string(),
            confidence,
            bounding_box,
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2}) at [{:.3}, {:.3}, {:.3}, {:.3}]",
            self.label,
            self.confidence,
            self.bounding_box.x,
            self.bounding_box.y,
            self.bounding_box.width,
            self.bounding_box.height
        )
    }
}

/// Highest-confidence detection. NaN confidences never win.
pub fn best_detection(detections: &[Detection]) -> Option<&Detection> {
    detections
        .iter()
        .filter(|detection| !detection.confidence.is_nan())
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection::new(Some(label), confidence, BoundingBox::new(0.1, 0.2, 0.3, 0.4))
    }

    #[test]
    fn picks_highest_confidence() {
        let detections = vec![detection("cat", 0.4), detection("dog", 0.9), detection("car", 0.7)];
        assert_eq!(best_detection(&detections).unwrap().label, "dog");
    }

    #[test]
    fn empty_and_nan_inputs() {
        assert!(best_detection(&[]).is_none());
        assert!(best_detection(&[detection("cat", f32::NAN)]).is_none());

        let detections = vec![detection("cat", f32::NAN), detection("dog", 0.1)];
        assert_eq!(best_detection(&detections).unwrap().label, "dog");
    }

    #[test]
    fn missing_label_is_unknown() {
        let detection = Detection::new(None, 0.5, BoundingBox::new(0.0, 0.0, 0.5, 0.5));
        assert_eq!(detection.label, Detection::UNKNOWN_LABEL);
        assert_eq!(detection.bounding_box.area(), 0.25);
        assert_eq!(
            detection.to_string(),
            "unknown (0.50) at [0.000, 0.000, 0.500, 0.500]"
        );
    }
}
