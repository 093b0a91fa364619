use image::RgbImage;

use crate::pipeline::detection::Detections;
use crate::Result;

/// An image model that reports labeled boxes.
///
/// Implementations hold native resources; `close` releases them early and
/// must be safe to call more than once.
pub trait Classifier {
    fn detect(&mut self, image: &RgbImage) -> Result<Detections>;

    fn enable_stat_logging(&mut self, log_stats: bool);

    fn stat_string(&self) -> String;

    fn close(&mut self);
}
