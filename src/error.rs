//! Error types surfaced by the engine and its providers

use thiserror::Error;

/// Failure reported by a landmark or object provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Errors the detector reports to its caller.
///
/// Steady-state noise (a provider hiccup, no face in view) is absorbed into
/// the classification instead of showing up here.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("no provider could be initialized (landmarks: {landmarks}; objects: {objects})")]
    ProvidersUnavailable { landmarks: String, objects: String },

    #[error("detector used before a successful initialize()")]
    NotInitialized,

    #[error("malformed landmark frame: {0}")]
    MalformedFrame(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DetectorError>;
