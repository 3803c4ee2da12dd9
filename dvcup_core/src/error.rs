//! Error types for dvcup_core.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using dvcup_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The four failure classes every operation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An object or a configuration entry is absent.
    NotFound,
    /// Disk or transport failure.
    IoFailure,
    /// A configured backend location is malformed.
    InvalidLocation,
    /// Manifest, pointer, config or address bytes are not in the expected format.
    DecodeFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::IoFailure => "io-failure",
            ErrorKind::InvalidLocation => "invalid-location",
            ErrorKind::DecodeFailure => "decode-failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during store, config and manifest operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// I/O error tied to a specific object or file.
    #[error("I/O error at {path}: {source}")]
    IoAt {
        path: PathBuf,
        source: std::io::Error,
    },

    /// HTTP transport failure or unexpected status.
    #[error("Transfer failed for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Object not found in store.
    #[error("Object not found: {address} in {location}")]
    ObjectNotFound { address: String, location: String },

    /// Named remote is not configured.
    #[error("Remote not found: {name}")]
    RemoteNotFound { name: String },

    /// No `core.remote` setting.
    #[error("No default remote configured (set `remote` in the [core] section)")]
    NoDefaultRemote,

    /// Remote location cannot be turned into a backend.
    #[error("Invalid location for remote {name}: {location} ({reason})")]
    InvalidLocation {
        name: String,
        location: String,
        reason: String,
    },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Configuration document could not be parsed.
    #[error("Invalid config{}: {reason}", at_line(.line))]
    InvalidConfig {
        line: Option<usize>,
        reason: String,
    },

    /// Directory manifest bytes are malformed.
    #[error("Invalid directory manifest {address}: {reason}")]
    InvalidManifest { address: String, reason: String },

    /// Pointer file is malformed.
    #[error("Invalid pointer file {path}: {reason}")]
    InvalidPointer { path: String, reason: String },
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { source } | Error::IoAt { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                ErrorKind::NotFound
            }
            Error::Io { .. } | Error::IoAt { .. } | Error::Transport { .. } => {
                ErrorKind::IoFailure
            }
            Error::ObjectNotFound { .. } | Error::RemoteNotFound { .. } | Error::NoDefaultRemote => {
                ErrorKind::NotFound
            }
            Error::InvalidLocation { .. } => ErrorKind::InvalidLocation,
            Error::InvalidHash { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidManifest { .. }
            | Error::InvalidPointer { .. } => ErrorKind::DecodeFailure,
        }
    }

    /// Create an IoAt error.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Create a Transport error.
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an ObjectNotFound error.
    pub fn object_not_found(address: impl Into<String>, location: impl Into<String>) -> Self {
        Error::ObjectNotFound {
            address: address.into(),
            location: location.into(),
        }
    }

    /// Create a RemoteNotFound error.
    pub fn remote_not_found(name: impl Into<String>) -> Self {
        Error::RemoteNotFound { name: name.into() }
    }

    /// Create an InvalidLocation error.
    pub fn invalid_location(
        name: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidLocation {
            name: name.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(line: Option<usize>, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            line,
            reason: reason.into(),
        }
    }

    /// Create an InvalidManifest error.
    pub fn invalid_manifest(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidManifest {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidPointer error.
    pub fn invalid_pointer(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPointer {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

fn at_line(line: &Option<usize>) -> String {
    line.map(|n| format!(" at line {}", n)).unwrap_or_default()
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::object_not_found("abc", "/data").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(Error::NoDefaultRemote.kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::transport("http://x", "refused").kind(),
            ErrorKind::IoFailure
        );
        assert_eq!(
            Error::invalid_location("r", "rel", "not absolute").kind(),
            ErrorKind::InvalidLocation
        );
        assert_eq!(
            Error::invalid_manifest("abc.dir", "eof").kind(),
            ErrorKind::DecodeFailure
        );
    }

    #[test]
    fn test_io_not_found_is_not_found() {
        let err = Error::io_at(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = Error::from(std::io::Error::other("disk on fire"));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_config_line_is_optional() {
        let msg = Error::invalid_config(Some(4), "bad header").to_string();
        assert_eq!(msg, "Invalid config at line 4: bad header");

        let msg = Error::invalid_config(None, "not UTF-8").to_string();
        assert_eq!(msg, "Invalid config: not UTF-8");
    }

    #[test]
    fn test_messages_name_the_subject() {
        let msg = Error::object_not_found("0000.dir", "/data").to_string();
        assert!(msg.contains("0000.dir"));
        assert!(msg.contains("/data"));
    }
}
