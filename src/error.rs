use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("problem reading label file '{resource}': {source}")]
    LabelLoad {
        resource: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid detector config: {0}")]
    Config(String),
    #[error("failed to load config: {0}")]
    ConfigSource(#[from] config::ConfigError),
    #[error("inference session: {0}")]
    Session(String),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("stub outputs: {0}")]
    Json(#[from] serde_json::Error),
    #[error("detector has been closed")]
    Closed,
}

impl DetectorError {
    pub fn config(msg: impl Into<String>) -> Self {
        DetectorError::Config(msg.into())
    }

    pub fn session(msg: impl Into<String>) -> Self {
        DetectorError::Session(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;
