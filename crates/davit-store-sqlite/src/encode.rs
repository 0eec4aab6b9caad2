//! Encoding and decoding helpers between [`ResourceInfo`] and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; ETags are opaque UUID tokens
//! minted fresh on every write.

use chrono::{DateTime, Utc};
use davit_core::{Error, Result, resource::ResourceInfo};
use uuid::Uuid;

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Index(format!("bad timestamp {s:?}: {e}")))
}

// ─── ETag ────────────────────────────────────────────────────────────────────

/// Mint a fresh opaque validator. Unlike the filesystem backend's
/// mtime-derived ETag, the index stores one new token per write.
pub fn fresh_etag() -> String {
  Uuid::new_v4().simple().to_string()
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `resources` row.
pub struct RawResourceRow {
  pub path:            String,
  pub is_directory:    bool,
  pub length:          i64,
  pub last_write_time: String,
  pub etag:            String,
}

impl RawResourceRow {
  pub fn into_resource_info(self) -> Result<ResourceInfo> {
    let mtime = decode_dt(&self.last_write_time)?;
    if self.is_directory {
      Ok(ResourceInfo::collection(self.path, mtime, self.etag))
    } else {
      Ok(ResourceInfo::file(
        self.path,
        self.length.max(0) as u64,
        mtime,
        self.etag,
      ))
    }
  }
}
