use serde::{Deserialize, Serialize};

use crate::shared::face::Bounds;

/// A spatial region within a container signal (an image).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub container_id: String,
    pub bounds: Bounds,
}

impl Segment {
    pub fn new(container_id: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            container_id: container_id.into(),
            bounds,
        }
    }

    /// The identity of this segment, used to join annotation streams that
    /// refer to the same region of the same image.
    pub fn key(&self) -> SegmentKey {
        SegmentKey {
            container_id: self.container_id.clone(),
            bounds: self.bounds,
        }
    }
}

/// Join key for per-segment annotations: container id plus bounds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentKey {
    pub container_id: String,
    pub bounds: Bounds,
}
