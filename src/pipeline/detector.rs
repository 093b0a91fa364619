use image::RgbImage;

use crate::app::config::{DetectorConfig, OutputTensors};
use crate::pipeline::classifier::Classifier;
use crate::pipeline::decode::{self, RawDetections};
use crate::pipeline::detection::Detections;
use crate::pipeline::labels::{AssetRoot, LabelSet};
use crate::pipeline::marshal;
use crate::pipeline::timer::{Split, SplitSummary, SplitTimer};
use crate::session::InferenceSession;
use crate::{DetectorError, Result};

/// Object detector for SSD models exported with the TF detection postprocess
/// op (boxes, scores, classes, count outputs).
pub struct SingleShotDetector<S: InferenceSession> {
    config: DetectorConfig,
    outputs: OutputTensors,
    labels: LabelSet,
    session: Option<S>,
    pixels: Vec<u8>,
    log_stats: bool,
    last_splits: Vec<Split>,
}

impl<S: InferenceSession> SingleShotDetector<S> {
    /// Takes ownership of `session`; it is closed again if the config is
    /// invalid or the label map cannot be read. The config is checked first.
    pub fn create(config: DetectorConfig, mut session: S, assets: &AssetRoot) -> Result<Self> {
        let labels = match config
            .validate()
            .and_then(|_| LabelSet::load(assets, &config.labels_path))
        {
            Ok(labels) => labels,
            Err(err) => {
                tracing::error!("detector setup failed: {err}");
                session.close();
                return Err(err);
            }
        };
        Self::with_labels(config, session, labels)
    }

    /// Builds a detector around an already loaded label set.
    pub fn with_labels(config: DetectorConfig, mut session: S, labels: LabelSet) -> Result<Self> {
        let outputs = match config.validate().and_then(|_| config.output_tensors()) {
            Ok(outputs) => outputs,
            Err(err) => {
                tracing::error!("detector setup failed: {err}");
                session.close();
                return Err(err);
            }
        };
        tracing::info!(%config, labels = labels.len(), "single shot detector ready");
        let side = config.input_size as usize;
        Ok(Self {
            pixels: Vec::with_capacity(side * side * 3),
            config,
            outputs,
            labels,
            session: Some(session),
            log_stats: false,
            last_splits: Vec::new(),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    pub fn last_splits(&self) -> &[Split] {
        &self.last_splits
    }
}

impl<S: InferenceSession> Classifier for SingleShotDetector<S> {
    fn detect(&mut self, image: &RgbImage) -> Result<Detections> {
        let session = self.session.as_mut().ok_or(DetectorError::Closed)?;
        let mut timer = SplitTimer::new("detect");

        let side = self.config.input_size;
        marshal::pack_rgb(image, side, &mut self.pixels);
        let side = side as usize;
        session.feed(&self.config.input_name, &self.pixels, [1, side, side, 3])?;
        timer.end_split("ready for inference");

        session.run(&self.config.output_names, self.log_stats)?;
        timer.end_split("ran inference");

        let mut count = [0.0f32; 1];
        session.fetch(&self.outputs.count, &mut count)?;
        let reported = decode::detection_count(count[0]);
        let num_detections = bounded_count(reported, self.config.max_detections);

        let mut boxes = vec![0.0f32; num_detections * 4];
        let mut scores = vec![0.0f32; num_detections];
        let mut classes = vec![0.0f32; num_detections];
        let boxes_len = session.fetch(&self.outputs.boxes, &mut boxes)?;
        let scores_len = session.fetch(&self.outputs.scores, &mut scores)?;
        let classes_len = session.fetch(&self.outputs.classes, &mut classes)?;

        let raw = RawDetections {
            boxes: &boxes[..boxes_len],
            scores: &scores[..scores_len],
            classes: &classes[..classes_len],
            count: num_detections as f32,
        };
        let detections = decode::decode(
            &raw,
            &self.labels,
            image.width(),
            image.height(),
            self.config.score_threshold,
        );
        timer.end_split("processed results");

        tracing::debug!(
            reported,
            kept = detections.len(),
            "{}x{} frame decoded",
            image.width(),
            image.height()
        );
        self.last_splits = timer.into_splits();
        Ok(detections)
    }

    fn enable_stat_logging(&mut self, log_stats: bool) {
        self.log_stats = log_stats;
    }

    fn stat_string(&self) -> String {
        let Some(session) = self.session.as_ref() else {
            return String::new();
        };
        let session_stats = session.stat_string();
        if !self.log_stats || self.last_splits.is_empty() {
            return session_stats;
        }
        let splits = SplitSummary(&self.last_splits);
        if session_stats.is_empty() {
            splits.to_string()
        } else {
            format!("{session_stats}\n{splits}")
        }
    }

    fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
            tracing::debug!("detector closed");
        }
    }
}

/// Caps the model's reported count at `max_detections`, which also sizes the
/// fetch buffers.
fn bounded_count(reported: usize, max_detections: usize) -> usize {
    if reported > max_detections {
        tracing::warn!(reported, max_detections, "detection count capped");
        max_detections
    } else {
        reported
    }
}

impl<S: InferenceSession> Drop for SingleShotDetector<S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StubSession;
    use image::Rgb;

    fn config() -> DetectorConfig {
        DetectorConfig {
            input_size: 4,
            output_names: ["boxes", "scores", "classes", "count"]
                .map(String::from)
                .to_vec(),
            ..DetectorConfig::default()
        }
    }

    fn session(count: f32) -> StubSession {
        StubSession::new()
            .with_output("boxes", vec![0.1, 0.2, 0.5, 0.6, 0.0, 0.0, 1.0, 1.0])
            .with_output("scores", vec![0.9, 0.05])
            .with_output("classes", vec![1.0, 0.0])
            .with_output("count", vec![count])
    }

    fn labels() -> LabelSet {
        ["background", "person"].into_iter().collect()
    }

    fn detector(config: DetectorConfig, count: f32) -> SingleShotDetector<StubSession> {
        SingleShotDetector::with_labels(config, session(count), labels()).unwrap()
    }

    #[test]
    fn test_detect_feeds_and_decodes() {
        let mut detector = detector(config(), 2.0);
        let image = RgbImage::from_pixel(100, 200, Rgb([1, 2, 3]));
        let dets = detector.detect(&image).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].id, "0");
        assert_eq!(dets[0].label, "person");
        assert!((dets[0].location.x1 - 60.0).abs() < 1e-3);
        assert!((dets[0].location.y1 - 100.0).abs() < 1e-3);

        let fed = detector.session().unwrap().last_input().unwrap();
        assert_eq!(fed.name, "image_tensor");
        assert_eq!(fed.dims, [1, 4, 4, 3]);
        assert_eq!(fed.data.len(), 48);
    }

    #[test]
    fn test_zero_count() {
        let mut detector = detector(config(), 0.0);
        let image = RgbImage::new(4, 4);
        assert!(detector.detect(&image).unwrap().is_empty());
    }

    #[test]
    fn test_count_bounded_by_max_detections() {
        let mut cfg = config();
        cfg.max_detections = 1;
        let mut detector = detector(cfg, 2.0);
        let dets = detector.detect(&RgbImage::new(4, 4)).unwrap();
        assert_eq!(dets.len(), 1);
    }

    #[test]
    fn test_bounded_count_fits_fetch_buffers() {
        assert_eq!(bounded_count(0, 100), 0);
        assert_eq!(bounded_count(10, 100), 10);
        assert_eq!(bounded_count(250, 100), 100);

        // buffers sized from the bounded count hold every detection it claims
        let num_detections = bounded_count(decode::detection_count(250.0), 3);
        let boxes = vec![0.5f32; num_detections * 4];
        let scores = vec![0.9f32; num_detections];
        let classes = vec![1.0f32; num_detections];
        let raw = RawDetections {
            boxes: &boxes,
            scores: &scores,
            classes: &classes,
            count: num_detections as f32,
        };
        assert_eq!(raw.capacity(), 3);
        assert_eq!(decode::detection_count(raw.count), raw.capacity());
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn test_large_count_decodes_up_to_max_detections() {
        let mut cfg = config();
        cfg.max_detections = 2;
        let mut detector = detector(cfg, 500.0);
        let dets = detector.detect(&RgbImage::new(4, 4)).unwrap();
        // second detection scores 0.05, below the default threshold
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "person");
    }

    #[test]
    fn test_stats_only_when_enabled() {
        let mut detector = detector(config(), 1.0);
        detector.detect(&RgbImage::new(4, 4)).unwrap();
        assert_eq!(detector.stat_string(), "");

        detector.enable_stat_logging(true);
        detector.detect(&RgbImage::new(4, 4)).unwrap();
        let stats = detector.stat_string();
        assert!(stats.starts_with("stub runs: 2"), "{stats}");
        assert!(stats.contains("ran inference"), "{stats}");
        assert_eq!(detector.last_splits().len(), 3);
    }

    #[test]
    fn test_detect_after_close() {
        let mut detector = detector(config(), 1.0);
        detector.close();
        detector.close();
        assert!(detector.session().is_none());
        assert!(matches!(
            detector.detect(&RgbImage::new(4, 4)),
            Err(DetectorError::Closed)
        ));
        assert_eq!(detector.stat_string(), "");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = config();
        cfg.output_names.pop();
        let err = SingleShotDetector::with_labels(cfg, session(1.0), labels())
            .err()
            .unwrap();
        assert!(matches!(err, DetectorError::Config(_)));
    }
}
