//! Error types for each boundary of the renderer.
//!
//! Every asynchronous or I/O-shaped boundary (image decoding, highlighting,
//! persistence, rasterization) has its own error enum. [`StudioError`]
//! aggregates them for callers driving the whole editor.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while normalizing a user-selected background image.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The input bytes are not an image the decoder understands.
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The resampled surface could not be encoded.
    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Quality or maximum width outside the accepted range.
    #[error("invalid normalize options: {0}")]
    InvalidOptions(String),
}

/// Errors produced while parsing or decoding a `data:` URL.
#[derive(Debug, Error)]
pub enum DataUrlError {
    #[error("not a base64 data URL")]
    Malformed,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("data URL does not contain an image: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors reported by a [`Highlighter`](crate::Highlighter).
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("highlighting failed: {0}")]
    Failed(String),
}

impl From<syntect::Error> for HighlightError {
    fn from(err: syntect::Error) -> Self {
        Self::Failed(err.to_string())
    }
}

/// Errors produced by the settings store and its backends.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown setting: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("could not read settings file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write settings file: {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("could not locate the configuration directory")]
    DirectoryUnavailable,
}

/// Errors produced while rasterizing or saving an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Export was requested before any code was rendered.
    #[error("nothing has been rendered yet")]
    NothingRendered,

    #[error("rasterization failed: {0}")]
    Raster(String),

    #[error("could not encode export: {0}")]
    Encode(#[from] image::ImageError),

    #[error("could not write export: {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error for [`Studio`](crate::Studio) operations.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Highlight(#[from] HighlightError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl StudioError {
    /// A short message suitable for a non-blocking notice.
    pub fn user_message(&self) -> String {
        match self {
            StudioError::Normalize(NormalizeError::Decode(_)) => {
                "That file could not be read as an image.".to_string()
            }
            StudioError::Normalize(_) => "The background image could not be processed.".to_string(),
            StudioError::Highlight(HighlightError::UnknownTheme(theme)) => {
                format!("Theme \"{theme}\" is not available.")
            }
            StudioError::Highlight(_) => {
                "Highlighting failed; showing the last rendered code.".to_string()
            }
            StudioError::Export(ExportError::NothingRendered) => {
                "There is nothing to export yet.".to_string()
            }
            StudioError::Export(_) => "Export failed. Try again.".to_string(),
            StudioError::Settings(err) => err.to_string(),
        }
    }
}
