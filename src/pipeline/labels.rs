use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::{DetectorError, Result};

/// Scheme prefix used by packaged asset identifiers.
pub const ASSET_PREFIX: &str = "file:///android_asset/";

/// Label reported for class ids the label map has no entry for.
pub const UNKNOWN_LABEL: &str = "?";

/// Directory that packaged assets (models, label maps) are resolved against.
#[derive(Debug, Clone)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps an asset identifier to a filesystem path.
    ///
    /// `file:///android_asset/coco.txt` and `coco.txt` both resolve to
    /// `<root>/coco.txt`; absolute paths are returned unchanged.
    pub fn resolve(&self, resource: &str) -> PathBuf {
        let relative = resource.strip_prefix(ASSET_PREFIX).unwrap_or(resource);
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for AssetRoot {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Ordered class names; line N of the label file names class id N.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Reads one label per line. Blank lines are kept so that line numbers
    /// stay aligned with class ids.
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let labels = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
        Ok(Self { labels })
    }

    pub fn load(assets: &AssetRoot, resource: &str) -> Result<Self> {
        let path = assets.resolve(resource);
        let load_err = |source| DetectorError::LabelLoad {
            resource: resource.to_string(),
            source,
        };
        let file = File::open(&path).map_err(load_err)?;
        let labels = Self::from_reader(BufReader::new(file)).map_err(load_err)?;
        tracing::info!(path = %path.display(), count = labels.len(), "loaded label map");
        Ok(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(Into::into).collect(),
        }
    }
}
