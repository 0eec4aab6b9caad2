//! COPY and MOVE handlers — `Destination` / `Overwrite` negotiation shared
//! between the two methods.

use axum::{
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
};
use davit_core::{path as dav_path, store::ResourceStore};
use tokio_util::sync::CancellationToken;

use crate::{AppState, error::Error, handlers::DAV_PREFIX, headers};

#[derive(Clone, Copy, PartialEq)]
pub enum Mode {
  Copy,
  Move,
}

pub async fn handler<S>(
  state: &AppState<S>,
  mode: Mode,
  req_headers: &HeaderMap,
  path: &str,
  cancel: &CancellationToken,
) -> Result<Response, Error>
where
  S: ResourceStore,
{
  let src = dav_path::normalize(path)?;
  let dst_raw = headers::destination(req_headers, DAV_PREFIX)?;
  let dst = dav_path::normalize(&dst_raw)?;

  if src == dst {
    return Err(Error::Forbidden(
      "source and destination are the same resource".into(),
    ));
  }
  if dav_path::is_descendant(&dst, &src) {
    return Err(Error::Forbidden(
      "destination is inside the source collection".into(),
    ));
  }

  state
    .store
    .get_resource(&src, cancel)
    .await?
    .ok_or(Error::NotFound)?;

  // RFC 4918 §9.8.5: all destination ancestors must already exist. The
  // backends create missing directories for their own bookkeeping, so the
  // check lives here.
  if let Some(parent) = dav_path::parent(&dst) {
    match state.store.get_resource(parent, cancel).await? {
      Some(info) if info.is_directory => {}
      _ => {
        return Err(Error::Conflict(format!(
          "{parent}: destination ancestor does not exist"
        )));
      }
    }
  }

  let token = headers::lock_token(req_headers);
  if state.locks.conflicts(&dst, token.as_deref())
    || (mode == Mode::Move && state.locks.conflicts(&src, token.as_deref()))
  {
    return Err(Error::Locked);
  }

  let dst_existed = state.store.resource_exists(&dst, cancel).await?;
  if dst_existed {
    if !headers::overwrite(req_headers)? {
      return Err(Error::PreconditionFailed);
    }
    state.store.delete_resource(&dst, cancel).await?;
  }

  let result = match mode {
    Mode::Copy => state.store.copy_resource(&src, &dst, cancel).await,
    Mode::Move => state.store.move_resource(&src, &dst, cancel).await,
  };
  match result {
    Ok(()) => {}
    // The source was just seen, so a missing path here is a destination
    // ancestor: that is a conflict, not a 404.
    Err(davit_core::Error::NotFound(msg)) => {
      return Err(Error::Conflict(msg));
    }
    Err(e) => return Err(e.into()),
  }

  let status = if dst_existed {
    StatusCode::NO_CONTENT
  } else {
    StatusCode::CREATED
  };
  Ok(status.into_response())
}
