//! ResourceInfo — the immutable read model describing one resource.
//!
//! Instances are produced per-request by a store query and never cached or
//! mutated. A missing resource is represented by the absence of a value
//! (`Option<ResourceInfo>` at the store boundary), not by a sentinel flag.

use chrono::{DateTime, Utc};

use crate::path;

/// Metadata snapshot for one file or collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
  /// Normalized, slash-separated path relative to the namespace root.
  /// Unique key within a store.
  pub path:            String,
  /// Last path segment.
  pub name:            String,
  /// File extension without the dot; empty for collections.
  pub extension:       String,
  pub is_directory:    bool,
  /// Byte size; always 0 for collections.
  pub length:          u64,
  /// Source of `Last-Modified` and, for the filesystem backend, the ETag.
  pub last_write_time: DateTime<Utc>,
  /// Opaque strong validator, stored unquoted. Quoting happens at the HTTP
  /// header boundary.
  pub etag:            String,
  /// MIME type derived from the extension; `None` for collections.
  pub content_type:    Option<String>,
}

impl ResourceInfo {
  /// Build the snapshot for a regular file.
  pub fn file(
    path: impl Into<String>,
    length: u64,
    last_write_time: DateTime<Utc>,
    etag: impl Into<String>,
  ) -> Self {
    let path = path.into();
    let name = path::name(&path).to_owned();
    let extension = path::extension(&path).to_owned();
    let content_type = content_type_for(&name);
    Self {
      path,
      name,
      extension,
      is_directory: false,
      length,
      last_write_time,
      etag: etag.into(),
      content_type,
    }
  }

  /// Build the snapshot for a collection.
  pub fn collection(
    path: impl Into<String>,
    last_write_time: DateTime<Utc>,
    etag: impl Into<String>,
  ) -> Self {
    let path = path.into();
    let name = path::name(&path).to_owned();
    Self {
      path,
      name,
      extension: String::new(),
      is_directory: true,
      length: 0,
      last_write_time,
      etag: etag.into(),
      content_type: None,
    }
  }
}

/// MIME type for a file name, by extension. `None` when the extension is
/// unknown; callers needing a wire value fall back to
/// `application/octet-stream`.
pub fn content_type_for(name: &str) -> Option<String> {
  mime_guess::from_path(name)
    .first()
    .map(|m| m.essence_str().to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_derives_name_extension_and_mime() {
    let info =
      ResourceInfo::file("docs/readme.txt", 12, Utc::now(), "etag-1");
    assert_eq!(info.name, "readme.txt");
    assert_eq!(info.extension, "txt");
    assert_eq!(info.content_type.as_deref(), Some("text/plain"));
    assert!(!info.is_directory);
  }

  #[test]
  fn collection_has_no_extension_or_mime() {
    let info = ResourceInfo::collection("docs/sub", Utc::now(), "etag-2");
    assert_eq!(info.name, "sub");
    assert_eq!(info.extension, "");
    assert_eq!(info.length, 0);
    assert!(info.content_type.is_none());
    assert!(info.is_directory);
  }

  #[test]
  fn unknown_extension_has_no_mime() {
    assert!(content_type_for("data.zzqq").is_none());
  }
}
