//! LOCK and UNLOCK handlers.

use axum::{
  body::Body,
  http::{HeaderMap, HeaderName, StatusCode, header},
  response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;

use crate::{
  AppState,
  error::Error,
  handlers::require_xml_content_type,
  headers,
  lock::LockScope,
  xml,
};

/// LOCK: issue a token and return the lockdiscovery body. Locking a path
/// that does not exist yet is allowed so clients can reserve a name
/// before the first PUT.
pub async fn lock<S>(
  state: &AppState<S>,
  req_headers: &HeaderMap,
  path: &str,
  body: &[u8],
  _cancel: &CancellationToken,
) -> Result<Response, Error> {
  require_xml_content_type(req_headers)?;
  let request = xml::parse_lock(body)?;
  let scope = LockScope::from_local_name(&request.scope).ok_or_else(|| {
    Error::BadRequest(format!("unknown lock scope: {}", request.scope))
  })?;

  let lock = state
    .locks
    .lock(path, scope, &request.owner)
    .ok_or(Error::Locked)?;

  let body = xml::activelock_body(&lock, &request.lock_type);
  Ok(
    Response::builder()
      .status(StatusCode::OK)
      .header(header::CONTENT_TYPE, "application/xml; charset=utf-8")
      .header(
        HeaderName::from_static("lock-token"),
        format!("<opaquelocktoken:{}>", lock.token),
      )
      .body(Body::from(body))
      .unwrap(),
  )
}

/// UNLOCK: release the lock named by the `Lock-Token` header.
pub async fn unlock<S>(
  state: &AppState<S>,
  req_headers: &HeaderMap,
  path: &str,
) -> Result<Response, Error> {
  let token = headers::lock_token(req_headers)
    .ok_or_else(|| Error::BadRequest("missing Lock-Token header".into()))?;

  if !state.locks.unlock(path, &token) {
    return Err(Error::Conflict("no matching lock to release".into()));
  }
  Ok(StatusCode::NO_CONTENT.into_response())
}
