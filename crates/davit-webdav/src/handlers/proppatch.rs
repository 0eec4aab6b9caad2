//! PROPPATCH handler.
//!
//! Dead properties are not persisted; every set/remove is acknowledged
//! with `200 OK` in the multistatus so clients that insist on patching
//! (Windows Explorer sets Win32 attributes on every copy) proceed
//! without error.

use axum::{http::HeaderMap, response::Response};
use davit_core::store::ResourceStore;
use tokio_util::sync::CancellationToken;

use crate::{
  AppState,
  error::Error,
  headers,
  handlers::{href_for, multistatus_response, require_xml_content_type},
  xml::{self, MultistatusBuilder, Property},
};

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
  require_xml_content_type(req_headers)?;
  let update = xml::parse_proppatch(body)?;

  let info = state
    .store
    .get_resource(path, cancel)
    .await?
    .ok_or(Error::NotFound)?;

  let token = headers::lock_token(req_headers);
  if state.locks.conflicts(path, token.as_deref()) {
    return Err(Error::Locked);
  }

  let href = href_for(&info.path, info.is_directory);
  let mut ms = MultistatusBuilder::new();
  for name in update.set.iter().chain(update.remove.iter()) {
    ms.response(&href).propstat_ok(&[Property::Named(name.clone())]);
  }

  Ok(multistatus_response(ms.finish()))
}
