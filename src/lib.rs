//! Single-shot multibox detector adapter.
//!
//! Loads a label map, feeds RGB frames to an inference session and decodes
//! the SSD postprocess outputs (boxes, scores, classes, count) into labeled
//! pixel-space boxes.

pub mod app;
pub mod error;
pub mod pipeline;
pub mod session;

pub use app::config::DetectorConfig;
pub use error::{DetectorError, Result};
pub use pipeline::{
    AssetRoot, BoundingBox, Classifier, DetectionResult, Detections, LabelSet, SingleShotDetector,
};
pub use session::{InferenceSession, StubSession};
