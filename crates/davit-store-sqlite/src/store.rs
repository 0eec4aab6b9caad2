//! [`SqliteStore`] — filesystem bytes plus a SQLite metadata index.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use davit_core::{
  Error, Result,
  copy::{COPY_BUF_LEN, copy_cancellable},
  error::classify_io,
  path,
  resource::{ResourceInfo, content_type_for},
  store::{ResourceReader, ResourceStore},
  tree,
};

use crate::{
  encode::{RawResourceRow, encode_dt, fresh_etag},
  schema::SCHEMA,
};

/// Suffix for in-progress write targets; never indexed.
const TMP_SUFFIX: &str = ".davit-tmp";

const SELECT_COLS: &str =
  "SELECT path, is_directory, length, last_write_time, etag FROM resources";

/// A resource store whose metadata lives in a `resources` table while the
/// bytes stay on disk under the configured root.
///
/// Every mutating operation updates the physical tree first, then commits
/// the affected index rows in one transaction; a whole-subtree move is a
/// single SQL transaction. Cloning is cheap — the connection is
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  root: Arc<PathBuf>,
  conn: tokio_rusqlite::Connection,
}

fn index_err(e: tokio_rusqlite::Error) -> Error {
  Error::Index(e.to_string())
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawResourceRow> {
  Ok(RawResourceRow {
    path:            row.get(0)?,
    is_directory:    row.get(1)?,
    length:          row.get(2)?,
    last_write_time: row.get(3)?,
    etag:            row.get(4)?,
  })
}

/// Insert collection rows for every missing ancestor of `path`.
fn ensure_ancestor_rows(
  tx: &rusqlite::Transaction<'_>,
  path: &str,
  now: &str,
) -> rusqlite::Result<()> {
  let mut ancestors: Vec<&str> = Vec::new();
  let mut cur = path;
  while let Some(p) = path::parent(cur) {
    ancestors.push(p);
    cur = p;
  }
  for p in ancestors.into_iter().rev() {
    tx.execute(
      "INSERT INTO resources
         (path, is_directory, length, last_write_time, etag, content_type,
          name, extension)
       VALUES (?1, 1, 0, ?2, ?3, NULL, ?4, '')
       ON CONFLICT(path) DO NOTHING",
      rusqlite::params![p, now, fresh_etag(), path::name(p)],
    )?;
  }
  Ok(())
}

fn check_cancel(cancel: &CancellationToken, rel: &str) -> Result<()> {
  if cancel.is_cancelled() {
    Err(Error::Cancelled(rel.to_owned()))
  } else {
    Ok(())
  }
}

impl SqliteStore {
  /// Open a store over `root` with the metadata index at `index_path`,
  /// creating and stamping the schema if needed.
  pub async fn open(
    root: impl Into<PathBuf>,
    index_path: impl AsRef<Path>,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(index_path)
      .await
      .map_err(index_err)?;
    let store = Self { root: Arc::new(root.into()), conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a store whose index lives in memory — useful for testing.
  pub async fn open_in_memory(root: impl Into<PathBuf>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(index_err)?;
    let store = Self { root: Arc::new(root.into()), conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(index_err)
  }

  fn resolve(&self, raw: &str) -> Result<(String, PathBuf)> {
    let rel = path::normalize(raw)?;
    let physical = self.root.join(&rel);
    Ok((rel, physical))
  }

  async fn get_row(&self, rel: &str) -> Result<Option<RawResourceRow>> {
    let rel = rel.to_owned();
    self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{SELECT_COLS} WHERE path = ?1"),
              rusqlite::params![rel],
              map_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(index_err)
  }

  /// Rebuild the whole index from a physical tree scan.
  ///
  /// Resolves drift after out-of-band filesystem changes: every row is
  /// dropped and re-created (with fresh ETags) inside one transaction.
  /// Returns the number of indexed resources.
  pub async fn rebuild_index(&self) -> Result<usize> {
    // path, is_directory, length, mtime
    let mut scanned: Vec<(String, bool, i64, String)> = Vec::new();
    let mut stack: Vec<(PathBuf, String)> = vec![((*self.root).clone(), String::new())];

    while let Some((dir, rel)) = stack.pop() {
      let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && rel.is_empty() => {
          break; // root not created yet; index stays empty
        }
        Err(e) => return Err(classify_io(&rel, e)),
      };
      while let Some(entry) =
        entries.next_entry().await.map_err(|e| classify_io(&rel, e))?
      {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(TMP_SUFFIX) {
          continue;
        }
        let child_rel = if rel.is_empty() {
          name
        } else {
          format!("{rel}/{name}")
        };
        let meta = entry
          .metadata()
          .await
          .map_err(|e| classify_io(&child_rel, e))?;
        let mtime =
          encode_dt(meta.modified().map_err(|e| classify_io(&child_rel, e))?.into());
        if meta.is_dir() {
          stack.push((entry.path(), child_rel.clone()));
          scanned.push((child_rel, true, 0, mtime));
        } else {
          scanned.push((child_rel, false, meta.len() as i64, mtime));
        }
      }
    }

    let count = scanned.len();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM resources", [])?;
        for (p, is_dir, length, mtime) in &scanned {
          let content_type =
            if *is_dir { None } else { content_type_for(path::name(p)) };
          tx.execute(
            "INSERT INTO resources
               (path, is_directory, length, last_write_time, etag,
                content_type, name, extension)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
              p,
              is_dir,
              length,
              mtime,
              fresh_etag(),
              content_type,
              path::name(p),
              path::extension(p),
            ],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(index_err)?;

    Ok(count)
  }
}

impl ResourceStore for SqliteStore {
  async fn resource_exists(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<bool> {
    let (rel, _) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;
    Ok(self.get_row(&rel).await?.is_some())
  }

  async fn get_resource(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<Option<ResourceInfo>> {
    let (rel, _) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;
    self
      .get_row(&rel)
      .await?
      .map(RawResourceRow::into_resource_info)
      .transpose()
  }

  async fn open_resource(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<ResourceReader> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    match self.get_row(&rel).await? {
      Some(row) if !row.is_directory => {}
      _ => return Err(Error::NotFound(rel)),
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
    let (rel, _) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    match self.get_row(&rel).await? {
      Some(row) if row.is_directory => {}
      _ => return Err(Error::NotFound(rel)),
    }

    let prefix = format!("{rel}/");
    let raws: Vec<RawResourceRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SELECT_COLS} WHERE substr(path, 1, length(?1)) = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![prefix], map_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        // Immediate children only: no further slash past the prefix.
        Ok(
          rows
            .into_iter()
            .filter(|r| !r.path[prefix.len()..].contains('/'))
            .collect(),
        )
      })
      .await
      .map_err(index_err)?;

    raws
      .into_iter()
      .map(RawResourceRow::into_resource_info)
      .collect()
  }

  async fn save_resource(
    &self,
    raw: &str,
    mut content: ResourceReader,
    cancel: &CancellationToken,
  ) -> Result<()> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    if let Some(row) = self.get_row(&rel).await?
      && row.is_directory
    {
      return Err(Error::Conflict(format!("{rel}: is a collection")));
    }

    let parent = physical
      .parent()
      .ok_or_else(|| Error::InvalidPath(rel.clone()))?;
    fs::create_dir_all(parent)
      .await
      .map_err(|e| classify_io(&rel, e))?;

    // Temp neighbor plus rename: readers see old bytes or new bytes, never
    // a partial file; the index row commits only after the rename.
    let tmp = parent.join(format!(
      ".{}.{}{TMP_SUFFIX}",
      path::name(&rel),
      Uuid::new_v4().simple()
    ));
    let mut file = fs::File::create(&tmp)
      .await
      .map_err(|e| classify_io(&rel, e))?;
    let length =
      match copy_cancellable(&mut content, &mut file, COPY_BUF_LEN, cancel)
        .await
      {
        Ok(n) => n,
        Err(e) => {
          drop(file);
          let _ = fs::remove_file(&tmp).await;
          return Err(e);
        }
      };
    drop(file);
    fs::rename(&tmp, &physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;

    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_ancestor_rows(&tx, &rel, &now)?;
        tx.execute(
          "INSERT INTO resources
             (path, is_directory, length, last_write_time, etag,
              content_type, name, extension)
           VALUES (?1, 0, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(path) DO UPDATE SET
             length = ?2, last_write_time = ?3, etag = ?4",
          rusqlite::params![
            rel,
            length as i64,
            now,
            fresh_etag(),
            content_type_for(path::name(&rel)),
            path::name(&rel),
            path::extension(&rel),
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(index_err)
  }

  async fn create_collection(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<ResourceInfo> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    if self.get_row(&rel).await?.is_some() {
      return Err(Error::AlreadyExists(rel));
    }
    // Intermediate collections must already exist.
    if let Some(parent_rel) = path::parent(&rel)
      && self.get_row(parent_rel).await?.is_none()
    {
      return Err(Error::NotFound(parent_rel.to_owned()));
    }

    fs::create_dir_all(&physical)
      .await
      .map_err(|e| classify_io(&rel, e))?;

    let now = Utc::now();
    let now_str = encode_dt(now);
    let etag = fresh_etag();
    {
      let rel = rel.clone();
      let now_str = now_str.clone();
      let etag = etag.clone();
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          ensure_ancestor_rows(&tx, &rel, &now_str)?;
          tx.execute(
            "INSERT INTO resources
               (path, is_directory, length, last_write_time, etag,
                content_type, name, extension)
             VALUES (?1, 1, 0, ?2, ?3, NULL, ?4, '')",
            rusqlite::params![rel, now_str, etag, path::name(&rel)],
          )?;
          tx.commit()?;
          Ok(())
        })
        .await
        .map_err(index_err)?;
    }

    Ok(ResourceInfo::collection(rel, now, etag))
  }

  async fn delete_resource(
    &self,
    raw: &str,
    cancel: &CancellationToken,
  ) -> Result<()> {
    let (rel, physical) = self.resolve(raw)?;
    check_cancel(cancel, &rel)?;

    let row = self
      .get_row(&rel)
      .await?
      .ok_or_else(|| Error::NotFound(rel.clone()))?;

    let removal = if row.is_directory {
      fs::remove_dir_all(&physical).await
    } else {
      fs::remove_file(&physical).await
    };
    match removal {
      Ok(()) => {}
      // Index drift: the row existed but the file is already gone. Purge
      // the rows anyway.
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => return Err(classify_io(&rel, e)),
    }

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM resources
           WHERE path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/'",
          rusqlite::params![rel],
        )?;
        Ok(())
      })
      .await
      .map_err(index_err)
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

    self
      .get_row(&src_rel)
      .await?
      .ok_or_else(|| Error::NotFound(src_rel.clone()))?;

    let parent = dst_physical
      .parent()
      .ok_or_else(|| Error::InvalidPath(dst_rel.clone()))?;
    fs::create_dir_all(parent)
      .await
      .map_err(|e| classify_io(&dst_rel, e))?;
    fs::rename(&src_physical, &dst_physical)
      .await
      .map_err(|e| classify_io(&src_rel, e))?;

    // The parent row and every descendant row rewrite in one transaction:
    // a fault rolls all of them back together.
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        ensure_ancestor_rows(&tx, &dst_rel, &now)?;
        tx.execute(
          "DELETE FROM resources
           WHERE path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/'",
          rusqlite::params![dst_rel],
        )?;
        tx.execute(
          "UPDATE resources
           SET path = ?2 || substr(path, length(?1) + 1)
           WHERE path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/'",
          rusqlite::params![src_rel, dst_rel],
        )?;
        tx.execute(
          "UPDATE resources
           SET name = ?2,
               extension = CASE WHEN is_directory THEN '' ELSE ?3 END,
               content_type = CASE WHEN is_directory THEN NULL ELSE ?4 END,
               last_write_time = ?5, etag = ?6
           WHERE path = ?1",
          rusqlite::params![
            dst_rel,
            path::name(&dst_rel),
            path::extension(&dst_rel),
            content_type_for(path::name(&dst_rel)),
            now,
            fresh_etag(),
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(index_err)
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
