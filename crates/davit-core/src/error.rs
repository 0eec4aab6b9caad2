//! Error types for `davit-core`.
//!
//! Every storage backend reports faults through this one tagged enum so the
//! HTTP layer can map storage outcomes to status codes by pattern-matching,
//! never by downcasting backend-specific error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The client-supplied path is empty, contains forbidden characters, or
  /// tries to escape the namespace root.
  #[error("invalid resource path: {0}")]
  InvalidPath(String),

  #[error("resource not found: {0}")]
  NotFound(String),

  #[error("resource already exists: {0}")]
  AlreadyExists(String),

  /// Name collision, non-empty directory, or a parent that is not a
  /// collection.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("access denied: {0}")]
  AccessDenied(String),

  #[error("insufficient storage: {0}")]
  InsufficientStorage(String),

  /// The operation observed its cancellation signal and stopped early.
  #[error("operation cancelled: {0}")]
  Cancelled(String),

  #[error("storage i/o fault: {0}")]
  Io(String),

  /// Metadata-index fault (indexed backend only).
  #[error("index fault: {0}")]
  Index(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classify a filesystem fault against the taxonomy, keyed by the resource
/// path it occurred on.
pub fn classify_io(path: &str, err: std::io::Error) -> Error {
  use std::io::ErrorKind;

  match err.kind() {
    ErrorKind::NotFound => Error::NotFound(path.to_owned()),
    ErrorKind::PermissionDenied => Error::AccessDenied(path.to_owned()),
    ErrorKind::AlreadyExists => Error::AlreadyExists(path.to_owned()),
    ErrorKind::DirectoryNotEmpty => {
      Error::Conflict(format!("{path}: directory not empty"))
    }
    ErrorKind::NotADirectory | ErrorKind::IsADirectory => {
      Error::Conflict(format!("{path}: {err}"))
    }
    ErrorKind::StorageFull | ErrorKind::QuotaExceeded => {
      Error::InsufficientStorage(path.to_owned())
    }
    _ => Error::Io(format!("{path}: {err}")),
  }
}
