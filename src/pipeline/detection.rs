use std::fmt;

use serde::Serialize;

/// Pixel-space rectangle, `(x0, y0)` top-left and `(x1, y1)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{:.1}, {:.1}, {:.1}, {:.1}]",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Position in the model's output; unique only within one call.
    pub id: String,
    pub label: String,
    pub score: f32,
    pub location: BoundingBox,
}

pub type Detections = Vec<DetectionResult>;

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({:.1}%) {}",
            self.id,
            self.label,
            self.score * 100.0,
            self.location
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let det = DetectionResult {
            id: "3".to_string(),
            label: "person".to_string(),
            score: 0.875,
            location: BoundingBox {
                x0: 1.0,
                y0: 2.0,
                x1: 11.0,
                y1: 22.5,
            },
        };
        assert_eq!(det.to_string(), "[3] person (87.5%) [1.0, 2.0, 11.0, 22.5]");
        assert_eq!(det.location.width(), 10.0);
        assert_eq!(det.location.height(), 20.5);
    }
}
