//! Error types for Vbook tooling

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the Vbook error
pub type Result<T> = std::result::Result<T, Error>;

/// Vbook error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid app URL format: {0} (expected formats: http://IP:PORT, https://IP:PORT, http://IP, https://IP, IP:PORT or IP)")]
    InvalidUrl(String),

    #[error("network error during {operation} to {url}: {source}")]
    Network {
        operation: String,
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("file system error during {operation} on {}: {source}", path.display())]
    Filesystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("project error in {}: {message}", path.display())]
    Project { path: PathBuf, message: String },

    #[error("invalid plugin.json: {0}")]
    Manifest(String),

    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("no suitable network interface found")]
    NoSuitableInterface,

    #[error("installation failed: {0}")]
    InstallFailed(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn network(operation: impl Into<String>, url: impl Into<String>, source: std::io::Error) -> Self {
        Error::Network {
            operation: operation.into(),
            url: url.into(),
            source,
        }
    }

    pub fn filesystem(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    pub fn project(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Project {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Short message suitable for showing to the person running the CLI.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidUrl(input) => format!(
                "'{}' is not a valid app address. Use an IPv4 address such as http://192.168.1.7:8080",
                input
            ),
            Error::Network { url, .. } => format!(
                "Failed to connect to {}. Please check the URL and ensure the Vbook app is running.",
                url
            ),
            Error::Timeout { operation, seconds } => {
                format!("The Vbook app did not answer the {} request within {}s.", operation, seconds)
            }
            Error::Filesystem { operation, path, .. } => match operation.as_str() {
                "read" => format!(
                    "Cannot read file: {}. Please check if the file exists and you have permission to read it.",
                    path.display()
                ),
                "write" => format!(
                    "Cannot write file: {}. Please check if you have permission to write to this location.",
                    path.display()
                ),
                _ => format!("File system error: {}", self),
            },
            Error::Project { message, .. } => format!("Project error: {}", message),
            Error::Validation { field, message } => format!("Invalid {}: {}", field, message),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_keeps_source() {
        let err = Error::network(
            "test",
            "http://192.168.1.7:8080",
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("192.168.1.7:8080"));
        assert!(err.user_message().contains("ensure the Vbook app is running"));
    }

    #[test]
    fn test_filesystem_user_message() {
        let err = Error::filesystem(
            "read",
            "/tmp/missing.js",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.user_message().starts_with("Cannot read file: /tmp/missing.js"));
    }

    #[test]
    fn test_validation_message() {
        let err = Error::validation("metadata.name", "is required");
        assert_eq!(err.to_string(), "validation failed for metadata.name: is required");
        assert_eq!(err.user_message(), "Invalid metadata.name: is required");
    }
}
