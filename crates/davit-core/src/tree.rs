//! Generic resource-tree algorithms over any [`ResourceStore`].
//!
//! Deep copy and subtree enumeration are written once against the trait so
//! every backend (filesystem, indexed, or anything future) shares the same
//! semantics. Backends delegate their `copy_resource` here; the HTTP layer
//! uses [`walk`] for `Depth: infinity` traversals.

use tokio_util::sync::CancellationToken;

use crate::{
  Error, Result,
  resource::ResourceInfo,
  store::ResourceStore,
};

/// Enumerate all descendants of the collection at `root`.
///
/// Collections appear before their own contents; the root itself is not
/// included. Fails with `NotFound` if `root` is not an existing collection.
pub async fn walk<S>(
  store: &S,
  root: &str,
  cancel: &CancellationToken,
) -> Result<Vec<ResourceInfo>>
where
  S: ResourceStore + ?Sized,
{
  let mut result = Vec::new();
  let mut queue = vec![root.to_owned()];

  while let Some(dir) = queue.pop() {
    if cancel.is_cancelled() {
      return Err(Error::Cancelled(root.to_owned()));
    }
    let children = store.get_children(&dir, cancel).await?;
    for child in children {
      if child.is_directory {
        queue.push(child.path.clone());
      }
      result.push(child);
    }
  }

  Ok(result)
}

/// Deep-copy the resource at `src` to `dst`.
///
/// Files are streamed through the store's own reader/writer pair; a
/// collection copy recreates the subtree one resource at a time, so index
/// consistency on the indexed backend follows from `save_resource` and
/// `create_collection` doing their own bookkeeping. A single fault aborts
/// the whole copy.
pub async fn copy_tree<S>(
  store: &S,
  src: &str,
  dst: &str,
  cancel: &CancellationToken,
) -> Result<()>
where
  S: ResourceStore + ?Sized,
{
  let source = store
    .get_resource(src, cancel)
    .await?
    .ok_or_else(|| Error::NotFound(src.to_owned()))?;

  if !source.is_directory {
    let reader = store.open_resource(src, cancel).await?;
    return store.save_resource(dst, reader, cancel).await;
  }

  ensure_collection(store, dst, cancel).await?;

  for entry in walk(store, src, cancel).await? {
    if cancel.is_cancelled() {
      return Err(Error::Cancelled(src.to_owned()));
    }
    let relative = &entry.path[src.len() + 1..];
    let target = format!("{dst}/{relative}");
    if entry.is_directory {
      ensure_collection(store, &target, cancel).await?;
    } else {
      let reader = store.open_resource(&entry.path, cancel).await?;
      store.save_resource(&target, reader, cancel).await?;
    }
  }

  Ok(())
}

/// Create the collection at `path` unless it already exists as one.
async fn ensure_collection<S>(
  store: &S,
  path: &str,
  cancel: &CancellationToken,
) -> Result<()>
where
  S: ResourceStore + ?Sized,
{
  match store.get_resource(path, cancel).await? {
    Some(info) if info.is_directory => Ok(()),
    Some(_) => {
      // A file is in the way; deep copy overwrites it.
      store.delete_resource(path, cancel).await?;
      store.create_collection(path, cancel).await.map(|_| ())
    }
    None => store.create_collection(path, cancel).await.map(|_| ()),
  }
}
