//! OPTIONS handler — advertises the supported method set and DAV classes.

use axum::{
  http::{HeaderName, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};

pub fn handler() -> Response {
  (
    StatusCode::OK,
    [
      (
        header::ALLOW,
        HeaderValue::from_static(
          "OPTIONS, GET, HEAD, PUT, DELETE, MKCOL, COPY, MOVE, PROPFIND, \
           PROPPATCH, LOCK, UNLOCK",
        ),
      ),
      (
        HeaderName::from_static("dav"),
        HeaderValue::from_static("1,2"),
      ),
      (
        HeaderName::from_static("ms-author-via"),
        HeaderValue::from_static("DAV"),
      ),
    ],
  )
    .into_response()
}
