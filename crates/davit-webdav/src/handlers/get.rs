//! GET and HEAD handlers — stream file content out of the store.

use axum::{
  body::Body,
  http::{Method, StatusCode, header},
  response::Response,
};
use davit_core::{copy::COPY_BUF_LEN, store::ResourceStore};
use tokio_util::{io::ReaderStream, sync::CancellationToken};

use crate::{AppState, error::Error, etag, handlers::http_date};

pub async fn handler<S>(
  state: &AppState<S>,
  method: &Method,
  path: &str,
  cancel: &CancellationToken,
) -> Result<Response, Error>
where
  S: ResourceStore,
{
  let info = state
    .store
    .get_resource(path, cancel)
    .await?
    .ok_or(Error::NotFound)?;

  // Collections have no byte content to serve.
  if info.is_directory {
    return Err(Error::NotFound);
  }

  let builder = Response::builder()
    .status(StatusCode::OK)
    .header(
      header::CONTENT_TYPE,
      info
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream"),
    )
    .header(header::CONTENT_LENGTH, info.length)
    .header(header::ACCEPT_RANGES, "bytes")
    .header(header::ETAG, etag::quote(&info.etag))
    .header(header::LAST_MODIFIED, http_date(&info.last_write_time));

  if *method == Method::HEAD {
    return Ok(builder.body(Body::empty()).unwrap());
  }

  let reader = state.store.open_resource(path, cancel).await?;
  let stream = ReaderStream::with_capacity(reader, COPY_BUF_LEN);
  Ok(builder.body(Body::from_stream(stream)).unwrap())
}
