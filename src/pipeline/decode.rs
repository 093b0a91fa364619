use crate::pipeline::detection::{BoundingBox, DetectionResult, Detections};
use crate::pipeline::labels::{LabelSet, UNKNOWN_LABEL};

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.07;

/// The four output tensors of an SSD postprocess op, borrowed as flat slices.
///
/// `boxes` holds `(y0, x0, y1, x1)` per detection in normalized coordinates.
/// `count` is the raw float the model reports; buffers are expected to hold at
/// least that many detections.
#[derive(Debug, Clone, Copy)]
pub struct RawDetections<'a> {
    pub boxes: &'a [f32],
    pub scores: &'a [f32],
    pub classes: &'a [f32],
    pub count: f32,
}

/// Rounds the model's detection count; negative or non-finite counts are 0.
pub fn detection_count(count: f32) -> usize {
    if !count.is_finite() || count <= 0.0 {
        return 0;
    }
    count.round() as usize
}

impl RawDetections<'_> {
    /// Number of complete detections the buffers can hold.
    pub fn capacity(&self) -> usize {
        (self.boxes.len() / 4)
            .min(self.scores.len())
            .min(self.classes.len())
    }

    /// Detection count, capped at buffer capacity.
    pub fn len(&self) -> usize {
        let reported = detection_count(self.count);
        let capacity = self.capacity();
        if reported > capacity {
            tracing::warn!(reported, capacity, "detection count exceeds output buffers");
            capacity
        } else {
            reported
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn class_index(raw: f32) -> Option<usize> {
    // truncation toward zero, so (-1, 0) still maps to class 0
    if raw.is_finite() && raw > -1.0 {
        Some(raw as usize)
    } else {
        None
    }
}

fn to_pixels(normalized: f32, extent: u32) -> f32 {
    let upper = (extent as f32 - 1.0).max(0.0);
    (normalized * extent as f32).max(0.0).min(upper)
}

/// Converts raw SSD outputs into pixel-space detections for a `width` x
/// `height` image, keeping those scoring strictly above `threshold` in the
/// model's output order.
pub fn decode(
    raw: &RawDetections,
    labels: &LabelSet,
    width: u32,
    height: u32,
    threshold: f32,
) -> Detections {
    let num_detections = raw.len();
    let mut detections = Detections::new();

    for index in 0..num_detections {
        let score = raw.scores[index];
        if !(score > threshold) {
            continue;
        }

        let ymin = raw.boxes[4 * index];
        let xmin = raw.boxes[4 * index + 1];
        let ymax = raw.boxes[4 * index + 2];
        let xmax = raw.boxes[4 * index + 3];
        let location = BoundingBox {
            x0: to_pixels(xmin, width),
            y0: to_pixels(ymin, height),
            x1: to_pixels(xmax, width),
            y1: to_pixels(ymax, height),
        };

        let class = raw.classes[index];
        let label = match class_index(class).and_then(|id| labels.get(id)) {
            Some(label) => label,
            None => {
                tracing::warn!(class, labels = labels.len(), "class id outside label map");
                UNKNOWN_LABEL
            }
        };

        tracing::trace!("det {index} {label} with score {score} at {location}");
        detections.push(DetectionResult {
            id: index.to_string(),
            label: label.to_string(),
            score,
            location,
        });
    }

    detections
}
