//! Namespace path normalization and segment helpers.
//!
//! Every path entering a store is raw client input. Normalization is the
//! store's job, never the HTTP layer's: strip leading slashes, collapse
//! empty segments, and reject anything that could escape the configured
//! storage root.

use crate::{Error, Result};

/// Normalize a raw client path into the canonical slash-separated form used
/// as a resource key.
///
/// Rejects empty/whitespace paths, backslashes, NUL bytes, and `.`/`..`
/// segments. The result never starts or ends with `/`.
pub fn normalize(raw: &str) -> Result<String> {
  if raw.trim().is_empty() {
    return Err(Error::InvalidPath("path is empty".into()));
  }
  if raw.contains('\\') {
    return Err(Error::InvalidPath(format!(
      "path contains a backslash: {raw:?}"
    )));
  }
  if raw.contains('\0') {
    return Err(Error::InvalidPath("path contains a NUL byte".into()));
  }

  let mut segments = Vec::new();
  for segment in raw.split('/') {
    match segment {
      "" => continue,
      "." | ".." => {
        return Err(Error::InvalidPath(format!(
          "path contains a dot segment: {raw:?}"
        )));
      }
      s => segments.push(s),
    }
  }

  if segments.is_empty() {
    return Err(Error::InvalidPath(format!("path has no segments: {raw:?}")));
  }

  Ok(segments.join("/"))
}

/// Last segment of a normalized path.
pub fn name(path: &str) -> &str {
  path.rsplit('/').next().unwrap_or(path)
}

/// File extension of the last segment, without the dot. Empty when the name
/// has no dot (or only a leading one).
pub fn extension(path: &str) -> &str {
  let n = name(path);
  match n.rfind('.') {
    Some(0) | None => "",
    Some(pos) => &n[pos + 1..],
  }
}

/// Parent path of a normalized path, `None` for top-level entries.
pub fn parent(path: &str) -> Option<&str> {
  path.rfind('/').map(|pos| &path[..pos])
}

/// Whether `child` sits anywhere below `parent` (proper descendant).
pub fn is_descendant(child: &str, parent: &str) -> bool {
  child.len() > parent.len() + 1
    && child.starts_with(parent)
    && child.as_bytes()[parent.len()] == b'/'
}
