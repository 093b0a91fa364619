pub mod config;

use std::path::{Path, PathBuf};

use crate::app::config::DetectorConfig;
use crate::pipeline::{AssetRoot, Classifier, Detections, SingleShotDetector};
#[cfg(feature = "tflite")]
use crate::session::TfliteSession;
use crate::session::StubSession;
#[cfg(not(feature = "tflite"))]
use crate::DetectorError;
use crate::Result;

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub config_path: PathBuf,
    /// Asset root; defaults to the config file's directory.
    pub assets: Option<PathBuf>,
    /// Canned output tensors (JSON) used instead of a model.
    pub stub_outputs: Option<PathBuf>,
    pub stats: bool,
}

pub struct App {
    classifier: Box<dyn Classifier>,
}

impl App {
    pub fn start(options: &AppOptions) -> Result<App> {
        let config = DetectorConfig::from_file(&options.config_path)?;
        let assets = match &options.assets {
            Some(root) => AssetRoot::new(root),
            None => AssetRoot::new(options.config_path.parent().unwrap_or(Path::new("."))),
        };
        tracing::debug!(root = %assets.root().display(), "asset root");

        let mut classifier = build_classifier(config, &assets, options.stub_outputs.as_deref())?;
        classifier.enable_stat_logging(options.stats);
        Ok(Self { classifier })
    }

    pub fn process(&mut self, image_path: &Path) -> Result<Detections> {
        let image = image::open(image_path)?.to_rgb8();
        tracing::debug!(
            "processing {} ({}x{})",
            image_path.display(),
            image.width(),
            image.height()
        );
        self.classifier.detect(&image)
    }

    pub fn stat_string(&self) -> String {
        self.classifier.stat_string()
    }

    pub fn stop(&mut self) {
        self.classifier.close();
    }
}

#[cfg_attr(not(feature = "tflite"), allow(unused_variables))]
fn build_classifier(
    config: DetectorConfig,
    assets: &AssetRoot,
    stub_outputs: Option<&Path>,
) -> Result<Box<dyn Classifier>> {
    if let Some(path) = stub_outputs {
        tracing::info!("using stub outputs from {}", path.display());
        let session = StubSession::from_json_file(path)?;
        return Ok(Box::new(SingleShotDetector::create(config, session, assets)?));
    }

    #[cfg(feature = "tflite")]
    {
        let model_path = assets.resolve(&config.model_path.to_string_lossy());
        let session = TfliteSession::open(&model_path, config.num_threads)?;
        Ok(Box::new(SingleShotDetector::create(config, session, assets)?))
    }

    #[cfg(not(feature = "tflite"))]
    {
        Err(DetectorError::config(
            "built without the `tflite` feature; use stub outputs to run without a model",
        ))
    }
}
