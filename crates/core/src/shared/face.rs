use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Pixel-space rectangle of a detected face within its source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Bounds {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y1 - self.y0).max(0)
    }
}

/// One face observation produced by the external recognition capability.
///
/// The embedding is treated as opaque; the engine only carries it along so a
/// downstream consumer can persist or compare memorized faces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub bounds: Bounds,
    pub embedding: Array1<f32>,
    pub confidence: f32,
}

impl Face {
    pub fn new(bounds: Bounds, embedding: Array1<f32>, confidence: f32) -> Self {
        Self {
            bounds,
            embedding,
            confidence,
        }
    }
}
