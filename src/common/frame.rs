use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A captured camera frame. Pixel data stays with the capture backend.
#[derive(Debug, Clone)]
pub struct Frame {
    frame_id: Uuid,
    sequence: u64,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(sequence: u64, captured_at: DateTime<Utc>) -> Self {
        Self {
            frame_id: Uuid::new_v4(),
            sequence,
            captured_at,
        }
    }

    pub fn capture(sequence: u64) -> Self {
        Self::new(sequence, Utc::now())
    }

    pub fn id(&self) -> Uuid {
        self.frame_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
