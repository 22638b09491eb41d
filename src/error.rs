//! Error types for the configurator.

use std::path::PathBuf;

/// Parsing failures for configuration values coming from form controls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid color `{0}`, expected #rrggbb")]
    InvalidColor(String),

    #[error("unknown {kind} `{value}`")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Failures of [`ConfigurationStore::update`](crate::store::ConfigurationStore::update).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown field path `{0}`")]
    UnknownPath(String),

    #[error("`{value}` is not a number (field `{path}`)")]
    NotANumber { path: &'static str, value: String },

    #[error("`{value}` is not a boolean (field `{path}`)")]
    NotABoolean { path: &'static str, value: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures raised by a rendering engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("QR encode error: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("canvas {width}x{height} with margin {margin} cannot hold {modules} modules")]
    CanvasTooSmall {
        width: u32,
        height: u32,
        margin: u32,
        modules: u32,
    },

    #[error("malformed logo data URI: {0}")]
    MalformedDataUri(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures of the render sink adapter itself.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("render sink is already attached to a surface")]
    AlreadyAttached,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Failures while reading an uploaded logo.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a recognised image")]
    NotAnImage { path: PathBuf },

    #[error("upload worker for {path} went away")]
    Disconnected { path: PathBuf },

    #[error("upload worker for {path} panicked: {message}")]
    Panicked { path: PathBuf, message: String },
}

/// Failures while loading [`StudioSettings`](crate::settings::StudioSettings).
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
