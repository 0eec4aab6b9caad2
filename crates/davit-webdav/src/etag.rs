//! ETag quoting and `If-Match` evaluation.
//!
//! Stores keep ETags unquoted; the surrounding `"` required by RFC 7232 is
//! added exactly once, here, at the header boundary.

/// Quote an opaque validator for the `ETag` header.
pub fn quote(etag: &str) -> String {
  format!("\"{etag}\"")
}

/// Strip surrounding double-quotes from an ETag value.
///
/// `If-Match` headers may carry ETags with or without the surrounding `"`.
/// Normalise before comparing so both forms are accepted.
pub fn strip_quotes(s: &str) -> &str {
  s.trim_matches('"')
}

/// Evaluate an `If-Match` header against the current validator.
/// `*` matches any existing resource.
pub fn if_match_matches(header: &str, current: &str) -> bool {
  let header = header.trim();
  header == "*"
    || header
      .split(',')
      .any(|candidate| strip_quotes(candidate.trim()) == current)
}
