//! DELETE handler — remove a file or a whole collection.

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
  cancel: &CancellationToken,
) -> Result<Response, Error>
where
  S: ResourceStore,
{
  let token = headers::lock_token(req_headers);
  if state.locks.conflicts(path, token.as_deref()) {
    return Err(Error::Locked);
  }

  state.store.delete_resource(path, cancel).await?;
  Ok(StatusCode::NO_CONTENT.into_response())
}
