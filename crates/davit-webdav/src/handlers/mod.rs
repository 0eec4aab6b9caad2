pub mod copymove;
pub mod delete;
pub mod get;
pub mod lock;
pub mod mkcol;
pub mod options;
pub mod propfind;
pub mod proppatch;
pub mod put;

use axum::{
  body::Body,
  http::{HeaderMap, StatusCode, header},
  response::Response,
};
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::error::Error;

/// URL prefix under which the resource namespace is served.
pub const DAV_PREFIX: &str = "/webdav/";

pub(super) const CONTENT_TYPE_MULTISTATUS: &str =
  "application/xml; charset=utf-8";

pub(super) fn multistatus_response(body: Vec<u8>) -> Response {
  Response::builder()
    .status(StatusCode::MULTI_STATUS)
    .header(header::CONTENT_TYPE, CONTENT_TYPE_MULTISTATUS)
    .body(Body::from(body))
    .unwrap()
}

// Characters escaped in href path segments. '/' stays literal.
const HREF_ESCAPE: &AsciiSet = &CONTROLS
  .add(b' ')
  .add(b'"')
  .add(b'<')
  .add(b'>')
  .add(b'`')
  .add(b'#')
  .add(b'?')
  .add(b'{')
  .add(b'}')
  .add(b'%');

/// Build the `<href>` for a normalized store path. Collections carry a
/// trailing slash.
pub(super) fn href_for(path: &str, is_directory: bool) -> String {
  let encoded = utf8_percent_encode(path, HREF_ESCAPE);
  if is_directory {
    format!("{DAV_PREFIX}{encoded}/")
  } else {
    format!("{DAV_PREFIX}{encoded}")
  }
}

/// RFC 1123 date for `Last-Modified` / `getlastmodified`.
pub(super) fn http_date(dt: &DateTime<Utc>) -> String {
  dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Reject a request that does not declare an XML `Content-Type`. A missing
/// header counts as non-XML.
pub(super) fn require_xml_content_type(headers: &HeaderMap) -> Result<(), Error> {
  let Some(v) = headers.get(header::CONTENT_TYPE) else {
    return Err(Error::UnsupportedMediaType(
      "an XML Content-Type is required".into(),
    ));
  };
  let ct = v
    .to_str()
    .map_err(|_| Error::BadRequest("unreadable Content-Type".into()))?;
  if ct.contains("xml") {
    Ok(())
  } else {
    Err(Error::UnsupportedMediaType(format!(
      "expected an XML body, got {ct}"
    )))
  }
}
