//! Parsers for the WebDAV request headers: `Depth`, `Destination`,
//! `Overwrite`, and lock-token extraction from `Lock-Token` / `If`.

use axum::http::HeaderMap;
use percent_encoding::percent_decode_str;

use crate::error::Error;

/// How many tree levels a PROPFIND traverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
  Zero,
  One,
  Infinity,
}

/// Parse the `Depth` header; missing defaults to `1`, anything but
/// `0`/`1`/`infinity` is a 400.
pub fn depth(headers: &HeaderMap) -> Result<Depth, Error> {
  let raw = match headers.get("depth") {
    None => return Ok(Depth::One),
    Some(v) => v
      .to_str()
      .map_err(|_| Error::BadRequest("unreadable Depth header".into()))?,
  };
  match raw.trim() {
    "" | "1" => Ok(Depth::One),
    "0" => Ok(Depth::Zero),
    s if s.eq_ignore_ascii_case("infinity") => Ok(Depth::Infinity),
    other => Err(Error::BadRequest(format!("invalid Depth: {other:?}"))),
  }
}

/// Resolve the `Destination` header to a path inside the served namespace.
///
/// Accepts an absolute URI or an absolute path; either way the decoded path
/// must start with `prefix` (e.g. `/webdav/`). Returns the raw in-namespace
/// remainder, still subject to store-side normalization.
pub fn destination(headers: &HeaderMap, prefix: &str) -> Result<String, Error> {
  let raw = headers
    .get("destination")
    .ok_or_else(|| Error::BadRequest("missing Destination header".into()))?
    .to_str()
    .map_err(|_| Error::BadRequest("unreadable Destination header".into()))?
    .trim();

  // Strip scheme and authority from an absolute URI.
  let path = match raw.find("://") {
    Some(pos) => {
      let after_authority = &raw[pos + 3..];
      match after_authority.find('/') {
        Some(slash) => &after_authority[slash..],
        None => "/",
      }
    }
    None => raw,
  };

  let decoded = percent_decode_str(path)
    .decode_utf8()
    .map_err(|_| Error::BadRequest("Destination is not valid UTF-8".into()))?;

  let inside = decoded.strip_prefix(prefix).ok_or_else(|| {
    Error::BadRequest(format!("Destination must be under {prefix}"))
  })?;
  if inside.trim().is_empty() {
    return Err(Error::BadRequest("Destination has no path".into()));
  }

  Ok(inside.to_owned())
}

/// Parse the `Overwrite` header; default `T` (overwrite allowed).
pub fn overwrite(headers: &HeaderMap) -> Result<bool, Error> {
  match headers.get("overwrite") {
    None => Ok(true),
    Some(v) => match v.to_str().map(str::trim) {
      Ok("T") | Ok("t") => Ok(true),
      Ok("F") | Ok("f") => Ok(false),
      _ => Err(Error::BadRequest("invalid Overwrite header".into())),
    },
  }
}

/// Extract an `opaquelocktoken:` token presented in either the `Lock-Token`
/// header or an `If` header, regardless of `<...>` / `(...)` wrapping.
pub fn lock_token(headers: &HeaderMap) -> Option<String> {
  for name in ["lock-token", "if"] {
    if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok())
      && let Some(token) = extract_token(value)
    {
      return Some(token);
    }
  }
  None
}

fn extract_token(value: &str) -> Option<String> {
  const SCHEME: &str = "opaquelocktoken:";
  let start = value.find(SCHEME)? + SCHEME.len();
  let rest = &value[start..];
  let end = rest
    .find(|c: char| c == '>' || c == ')' || c.is_whitespace())
    .unwrap_or(rest.len());
  let token = &rest[..end];
  (!token.is_empty()).then(|| token.to_owned())
}
