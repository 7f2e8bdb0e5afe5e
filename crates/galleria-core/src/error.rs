//! Error types for Galleria.
//!
//! Every fallible operation in the library returns [`GalleriaError`]. Most
//! callers inside the mutation pipeline never propagate these past a single
//! file: they log and move on (see [`GalleriaError::is_transient`]).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Galleria library.
#[derive(Debug, Error)]
pub enum GalleriaError {
    // Vault / file system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    // Sidecar document errors
    #[error("Front matter error in {path}: {message}")]
    FrontMatter { path: String, message: String },

    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: Option<serde_yaml::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Media analysis errors
    #[error("Image decode failed: {message}")]
    ImageDecode {
        message: String,
        #[source]
        source: Option<image::ImageError>,
    },

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Background task failed: {0}")]
    Task(String),

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("File watcher error: {0}")]
    Watcher(String),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Galleria operations.
pub type Result<T> = std::result::Result<T, GalleriaError>;

impl From<std::io::Error> for GalleriaError {
    fn from(err: std::io::Error) -> Self {
        GalleriaError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for GalleriaError {
    fn from(err: serde_json::Error) -> Self {
        GalleriaError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_yaml::Error> for GalleriaError {
    fn from(err: serde_yaml::Error) -> Self {
        GalleriaError::Yaml {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<image::ImageError> for GalleriaError {
    fn from(err: image::ImageError) -> Self {
        GalleriaError::ImageDecode {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<notify::Error> for GalleriaError {
    fn from(err: notify::Error) -> Self {
        GalleriaError::Watcher(err.to_string())
    }
}

impl From<tokio::task::JoinError> for GalleriaError {
    fn from(err: tokio::task::JoinError) -> Self {
        GalleriaError::Task(err.to_string())
    }
}

impl GalleriaError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::AlreadyExists {
            let path: PathBuf = path.into();
            return GalleriaError::AlreadyExists(path.to_string_lossy().to_string());
        }
        GalleriaError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether this error came from a host I/O call.
    ///
    /// Transient failures are logged and the affected file is skipped; they
    /// never abort a batch.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GalleriaError::Io { .. }
                | GalleriaError::FileNotFound(_)
                | GalleriaError::AlreadyExists(_)
                | GalleriaError::Task(_)
        )
    }

    /// Whether this error reports a benign create race.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, GalleriaError::AlreadyExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GalleriaError::FileNotFound("x/a.png".into());
        assert_eq!(err.to_string(), "File not found: x/a.png");
    }

    #[test]
    fn test_io_with_path_maps_already_exists() {
        let io = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists");
        let err = GalleriaError::io_with_path(io, "a.png.sidecar.md");
        assert!(err.is_already_exists());
        assert_eq!(err.to_string(), "File already exists: a.png.sidecar.md");
    }

    #[test]
    fn test_transient_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(GalleriaError::io_with_path(io, "a.png").is_transient());
        assert!(!GalleriaError::InvalidColor("#zz".into()).is_transient());
    }
}
