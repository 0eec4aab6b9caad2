//! PROPFIND handler — multistatus property listings at depth 0, 1, or
//! infinity.

use axum::response::Response;
use davit_core::{resource::ResourceInfo, store::ResourceStore, tree};
use tokio_util::sync::CancellationToken;

use crate::{
  AppState,
  error::Error,
  headers::Depth,
  handlers::{href_for, http_date, multistatus_response},
  xml::{self, MultistatusBuilder, Property},
};

pub async fn handler<S>(
  state: &AppState<S>,
  path: &str,
  depth: Depth,
  body: &[u8],
  cancel: &CancellationToken,
) -> Result<Response, Error>
where
  S: ResourceStore,
{
  xml::parse_propfind(body)?;

  let root = state
    .store
    .get_resource(path, cancel)
    .await?
    .ok_or(Error::NotFound)?;

  let mut ms = MultistatusBuilder::new();
  write_response(&mut ms, &root);

  if root.is_directory {
    match depth {
      Depth::Zero => {}
      Depth::One => {
        for child in state.store.get_children(path, cancel).await? {
          write_response(&mut ms, &child);
        }
      }
      Depth::Infinity => {
        for entry in tree::walk(&*state.store, path, cancel).await? {
          write_response(&mut ms, &entry);
        }
      }
    }
  }

  Ok(multistatus_response(ms.finish()))
}

fn write_response(ms: &mut MultistatusBuilder, info: &ResourceInfo) {
  let mut props = vec![
    Property::DisplayName(info.name.clone()),
    Property::ResourceType { collection: info.is_directory },
    Property::GetLastModified(http_date(&info.last_write_time)),
  ];
  if !info.is_directory {
    props.push(Property::GetContentLength(info.length));
  }
  ms.response(&href_for(&info.path, info.is_directory))
    .propstat_ok(&props);
}
