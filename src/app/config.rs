use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use config::Config;

use crate::pipeline::decode::DEFAULT_SCORE_THRESHOLD;
use crate::{DetectorError, Result};

pub const ENV_PREFIX: &str = "SSDETECT";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    pub labels_path: String,
    pub input_name: String,
    /// Side length of the square input tensor.
    pub input_size: u32,
    /// boxes, scores, classes, count; either a list or one comma-separated string.
    #[serde(deserialize_with = "deserialize_output_names")]
    pub output_names: Vec<String>,
    pub score_threshold: f32,
    pub num_threads: usize,
    pub max_detections: usize,
}

/// Output tensor names by role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTensors {
    pub boxes: String,
    pub scores: String,
    pub classes: String,
    pub count: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("detect.tflite"),
            labels_path: "file:///android_asset/coco_labels_list.txt".to_string(),
            input_name: "image_tensor".to_string(),
            input_size: 300,
            output_names: split_names(
                "detection_boxes,detection_scores,detection_classes,num_detections",
            ),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            num_threads: 1,
            max_detections: 100,
        }
    }
}

impl fmt::Display for DetectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "model {}, labels {}, input {} {}x{}, outputs [{}], threshold {}",
            self.model_path.display(),
            self.labels_path,
            self.input_name,
            self.input_size,
            self.input_size,
            self.output_names.join(","),
            self.score_threshold
        )
    }
}

impl DetectorConfig {
    /// Loads a config file (format by extension) overlaid with `SSDETECT_*`
    /// environment variables, then validates it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let cfg: Self = Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_name.trim().is_empty() {
            return Err(DetectorError::config("input_name must not be empty"));
        }
        if self.input_size == 0 {
            return Err(DetectorError::config("input_size must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(DetectorError::config(format!(
                "score_threshold must be within [0, 1], got {}",
                self.score_threshold
            )));
        }
        if self.max_detections == 0 {
            return Err(DetectorError::config("max_detections must be greater than zero"));
        }
        self.output_tensors().map(|_| ())
    }

    pub fn output_tensors(&self) -> Result<OutputTensors> {
        match self.output_names.as_slice() {
            [boxes, scores, classes, count] => Ok(OutputTensors {
                boxes: boxes.clone(),
                scores: scores.clone(),
                classes: classes.clone(),
                count: count.clone(),
            }),
            names => Err(DetectorError::config(format!(
                "expected 4 output names (boxes, scores, classes, count), got {}",
                names.len()
            ))),
        }
    }
}

fn split_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

fn deserialize_output_names<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Names {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Names::deserialize(deserializer)? {
        Names::Joined(joined) => split_names(&joined),
        Names::List(list) => list,
    })
}
