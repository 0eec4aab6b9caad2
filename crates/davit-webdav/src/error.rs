//! Error types and axum `IntoResponse` implementation.
//!
//! Storage faults arrive as [`davit_core::Error`] and are translated here by
//! pattern-matching; nothing crosses the handler→transport boundary
//! unmapped. Internal faults surface only their immediate message, never
//! paths or stack detail beyond it.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("not found")]
  NotFound,
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("access denied: {0}")]
  Forbidden(String),
  #[error("unsupported media type: {0}")]
  UnsupportedMediaType(String),
  #[error("malformed XML: {0}")]
  InvalidXml(String),
  #[error("resource is locked")]
  Locked,
  #[error("precondition failed")]
  PreconditionFailed,
  #[error("method not allowed")]
  MethodNotAllowed,
  #[error("request body too large")]
  PayloadTooLarge,
  #[error("request cancelled")]
  RequestTimeout,
  #[error("insufficient storage: {0}")]
  InsufficientStorage(String),
  #[error("internal error: {0}")]
  Internal(String),
}

impl From<davit_core::Error> for Error {
  fn from(e: davit_core::Error) -> Self {
    use davit_core::Error as Core;
    match e {
      Core::InvalidPath(msg) => Error::BadRequest(msg),
      Core::NotFound(_) => Error::NotFound,
      Core::AlreadyExists(msg) | Core::Conflict(msg) => Error::Conflict(msg),
      Core::AccessDenied(msg) => Error::Forbidden(msg),
      Core::InsufficientStorage(msg) => Error::InsufficientStorage(msg),
      Core::Cancelled(_) => Error::RequestTimeout,
      Core::Io(msg) | Core::Index(msg) => Error::Internal(msg),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
      Error::NotFound => (StatusCode::NOT_FOUND, "Resource not found.".into()),
      Error::Conflict(msg) => (StatusCode::CONFLICT, msg),
      Error::Forbidden(_) => (StatusCode::FORBIDDEN, "Access denied.".into()),
      Error::UnsupportedMediaType(msg) => {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg)
      }
      Error::InvalidXml(msg) => {
        (StatusCode::BAD_REQUEST, format!("Malformed XML: {msg}"))
      }
      Error::Locked => {
        (StatusCode::LOCKED, "Resource is locked.".into())
      }
      Error::PreconditionFailed => {
        (StatusCode::PRECONDITION_FAILED, "Precondition failed.".into())
      }
      Error::MethodNotAllowed => {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.".into())
      }
      Error::PayloadTooLarge => {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large.".into())
      }
      Error::RequestTimeout => {
        (StatusCode::REQUEST_TIMEOUT, "Request was cancelled.".into())
      }
      Error::InsufficientStorage(msg) => {
        tracing::error!(fault = %msg, "storage exhausted");
        (StatusCode::INSUFFICIENT_STORAGE, "Insufficient storage.".into())
      }
      Error::Internal(msg) => {
        tracing::error!(fault = %msg, "internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, msg)
      }
    };
    (status, body).into_response()
  }
}
