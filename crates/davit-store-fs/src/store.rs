//! [`FsStore`] — the filesystem implementation of [`ResourceStore`].

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use sha2::{Digest as _, Sha256};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use davit_core::{
  Error, Result,
  copy::{COPY_BUF_LEN, copy_cancellable},
  error::classify_io,
  path,
  resource::ResourceInfo,
  store::{ResourceReader, ResourceStore},
  tree,
};

/// Suffix for in-progress write targets; hidden from child listings.
const TMP_SUFFIX: &str = ".davit-tmp";

/// A resource store mapping the namespace directly onto a directory tree.
///
/// Cloning is cheap — the root is reference-counted. Metadata is derived
/// from the filesystem on every read; the ETag is a deterministic hash of
/// the modification time.
#[derive(Clone)]
pub struct FsStore {
  root: Arc<PathBuf>,
}

impl FsStore {
  /// Create a store rooted at `root`. The directory itself is created
  /// lazily on the first write.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: Arc::new(root.into()) }
  }

  /// Normalize a raw client path and resolve it against the storage root.
  fn resolve(&self, raw: &str) -> Result<(String, PathBuf)> {
    let rel = path::normalize(raw)?;
    let physical = self.root.join(&rel);
    Ok((rel, physical))
  }

  fn info_for(rel: &str, meta: &std::fs::Metadata) -> Result<ResourceInfo> {
    let mtime: DateTime<Utc> = meta
      .modified()
      .map_err(|e| classify_io(rel, e))?
      .into();
    let etag = etag_for(mtime);
    if meta.is_dir() {
      Ok(ResourceInfo::collection(rel, mtime, etag))
    } else {
      Ok(ResourceInfo::file(rel, meta.len(), mtime, etag))
    }
  }
}

/// Deterministic ETag for the filesystem backend: a hash of the
/// modification time, so it changes exactly when the content does.
fn etag_for(mtime: DateTime<Utc>) -> String {
  let mut hasher = Sha256::new();
  hasher.update(mtime.timestamp_micros().to_le_bytes());
  hex::encode(hasher.finalize())
}

fn check_cancel(cancel: &CancellationToken, rel: &str) -> Result<()> {
  if cancel.is_cancelled() {
    Err(Error::Cancelled(rel.to_owned()))
  } else {
    Ok(())
  }
}

impl ResourceStore for FsStore {
  async fn resource_exists(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<bool> {
    Ok(self.get_resource(raw, cancel).await?.is_some())
  }

  async fn get_resource(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<Option<ResourceInfo>> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    match fs::metadata(&physical).await {
      Ok(meta) => Ok(Some(Self::info_for(&rel, &meta)?)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(classify_io(&rel, e)),
    }
  }

  async fn open_resource(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<ResourceReader> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    let meta = fs::metadata(&physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    if meta.is_dir() {
      // Collections have no byte stream.
      return Err(Error::NotFound(rel));
    }

    let file = fs::File::open(&physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    Ok(Box::pin(file) as ResourceReader)
  }

  async fn get_children(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<Vec<ResourceInfo>> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    let meta = fs::metadata(&physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    if !meta.is_dir() {
      return Err(Error::NotFound(rel));
    }

    let mut children = Vec::new();
    let mut entries = fs::read_dir(&physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    while let Some(entry) =
      entries.next_entry().await.map_err(|e| classify_io(&rel, e))?
    {
      check_cancel(cancel, &rel)?;
      let name = entry.file_name().to_string_lossy().into_owned();
      if name.ends_with(TMP_SUFFIX) {
        continue;
      }
      let child_rel = format!("{rel}/{name}");
      let child_meta = entry
        .metadata()
        .await
        .map_err(|e| classify_io(&child_rel, e))?;
      children.push(Self::info_for(&child_rel, &child_meta)?);
    }

    Ok(children)
  }

  async fn save_resource(
    &self,
    raw: &str,
    mut content: ResourceReader,
    cancel: &CancellationToken,
  ) -> Result<()> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    match fs::metadata(&physical).await {
      Ok(meta) if meta.is_dir() => {
        return Err(Error::Conflict(format!("{rel}: is a collection")));
      }
      _ => {}
    }

    let parent = physical
      .parent()
      .ok_or_else(|| Error::InvalidPath(rel.clone()))?;
    fs::create_dir_all(parent)
      .await
      .map_err(|e| classify_io(&rel, e))?;

    // Write to a unique neighbor, then rename into place, so a concurrent
    // reader always sees either the old file or the new one in full.
    let tmp = parent.join(format!(
      ".{}.{}{TMP_SUFFIX}",
      path::name(&rel),
      Uuid::new_v4().simple()
    ));

    let mut file = fs::File::create(&tmp)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    if let Err(e) =
      copy_cancellable(&mut content, &mut file, COPY_BUF_LEN, cancel).await
    {
      drop(file);
      let _ = fs::remove_file(&tmp).await;
      return Err(e);
    }
    drop(file);

    fs::rename(&tmp, &physical)
      .await
      .map_err(|e| classify_io(&rel, e))
  }

  async fn create_collection(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<ResourceInfo> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    if fs::metadata(&physical).await.is_ok() {
      return Err(Error::AlreadyExists(rel));
    }

    // The storage root is created lazily; intermediate collections are not.
    fs::create_dir_all(&*self.root)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    fs::create_dir(&physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    let meta = fs::metadata(&physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    Self::info_for(&rel, &meta)
  }

  async fn delete_resource(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<()> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    let meta = fs::metadata(&physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    if meta.is_dir() {
      fs::remove_dir_all(&physical)
        .await
        .map_err(|e| classify_io(&rel, e))
    } else {
      fs::remove_file(&physical)
        .await
        .map_err(|e| classify_io(&rel, e))
    }
  }

  async fn move_resource(
    &self,
    src: &str,
    dst: &str,
    cancel: &CancellationToken,
  ) -> Result<()> {
    let (src_rel, src_physical) = self.resolve(src)?;
    let (dst_rel, dst_physical) = self.resolve(dst)?;
    check_cancel(cancel, &src_rel)?;

    fs::metadata(&src_physical)
      .await
      .map_err(|e| classify_io(&src_rel, e))?;

    let parent = dst_physical
      .parent()
      .ok_or_else(|| Error::InvalidPath(dst_rel.clone()))?;
    fs::create_dir_all(parent)
      .await
      .map_err(|e| classify_io(&dst_rel, e))?;

    // One rename carries the whole subtree.
    fs::rename(&src_physical, &dst_physical)
      .await
      .map_err(|e| classify_io(&src_rel, e))
  }

  async fn copy_resource(
    &self,
    src: &str,
    dst: &str,
    cancel: &CancellationToken,
  ) -> Result<()> {
    let src_rel = path::normalize(src)?;
    let dst_rel = path::normalize(dst)?;
    tree::copy_tree(self, &src_rel, &dst_rel, cancel).await
  }
}
