mod classifier;
pub mod decode;
mod detection;
mod detector;
pub mod labels;
pub mod marshal;
pub mod timer;

pub use classifier::Classifier;
pub use decode::{decode, RawDetections, DEFAULT_SCORE_THRESHOLD};
pub use detection::{BoundingBox, DetectionResult, Detections};
pub use detector::SingleShotDetector;
pub use labels::{AssetRoot, LabelSet, UNKNOWN_LABEL};
