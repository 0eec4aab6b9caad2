//! MKCOL handler — create a collection.

use axum::{
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
};
use davit_core::store::ResourceStore;
use tokio_util::sync::CancellationToken;

use crate::{AppState, error::Error, headers};

pub async fn handler<S>(
  state: &AppState<S>,
  req_headers: &HeaderMap,
  path: &str,
  body: &[u8],
  cancel: &CancellationToken,
) -> Result<Response, Error>
where
  S: ResourceStore,
{
  // RFC 4918 §9.3: a request body is allowed to exist but no body format
  // is defined; servers that do not understand one must answer 415.
  if !body.is_empty() {
    return Err(Error::UnsupportedMediaType(
      "MKCOL request bodies are not supported".into(),
    ));
  }

  let token = headers::lock_token(req_headers);
  if state.locks.conflicts(path, token.as_deref()) {
    return Err(Error::Locked);
  }

  match state.store.create_collection(path, cancel).await {
    Ok(_) => Ok(StatusCode::CREATED.into_response()),
    // A missing intermediate collection is a 409, not a 404.
    Err(davit_core::Error::NotFound(msg)) => Err(Error::Conflict(msg)),
    Err(e) => Err(e.into()),
  }
}
