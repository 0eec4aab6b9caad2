//! PUT handler — create or replace a file resource.

use axum::{
  body::Body,
  http::{HeaderMap, StatusCode, header},
  response::Response,
};
use davit_core::store::{ResourceReader, ResourceStore};
use tokio_util::sync::CancellationToken;

use crate::{AppState, error::Error, etag, headers};

pub async fn handler<S>(
  state: &AppState<S>,
  req_headers: &HeaderMap,
  path: &str,
  content: ResourceReader,
  cancel: &CancellationToken,
) -> Result<Response, Error>
where
  S: ResourceStore,
{
  let token = headers::lock_token(req_headers);
  if state.locks.conflicts(path, token.as_deref()) {
    return Err(Error::Locked);
  }

  let existing = state.store.get_resource(path, cancel).await?;
  if existing.as_ref().is_some_and(|i| i.is_directory) {
    return Err(Error::Conflict("path names a collection".into()));
  }

  if let Some(if_match) = req_headers
    .get(header::IF_MATCH)
    .and_then(|v| v.to_str().ok())
  {
    match &existing {
      None => return Err(Error::PreconditionFailed),
      Some(info) if !etag::if_match_matches(if_match, &info.etag) => {
        return Err(Error::PreconditionFailed);
      }
      Some(_) => {}
    }
  }

  state.store.save_resource(path, content, cancel).await?;

  let saved = state
    .store
    .get_resource(path, cancel)
    .await?
    .ok_or_else(|| Error::Internal("saved resource vanished".into()))?;

  Ok(
    Response::builder()
      .status(StatusCode::CREATED)
      .header(header::ETAG, etag::quote(&saved.etag))
      .body(Body::empty())
      .unwrap(),
  )
}
