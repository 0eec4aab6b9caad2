//! WebDAV protocol layer for Davit.
//!
//! Exposes an axum [`Router`] implementing the RFC 4918 method set
//! (class 1 and class 2) over any [`ResourceStore`] backend.

pub mod error;
pub mod etag;
pub mod handlers;
pub mod headers;
pub mod lock;
pub mod xml;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  body::Body,
  extract::{Request, State},
  http::Method,
  response::{IntoResponse, Response},
  routing::any,
};
use bytes::Bytes;
use davit_core::store::{ResourceReader, ResourceStore};
use futures_util::TryStreamExt as _;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tokio_util::{io::StreamReader, sync::CancellationToken};
use tower_http::trace::TraceLayer;

use handlers::{
  DAV_PREFIX, copymove, delete, get, mkcol, options, propfind, proppatch, put,
};
use lock::LockManager;

/// Cap on XML request bodies (PROPFIND, PROPPATCH, LOCK, MKCOL). PUT
/// content streams and is not subject to it.
const MAX_XML_BODY: usize = 1024 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Which storage backend serves the namespace.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  Fs,
  Sqlite,
}

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:         String,
  pub port:         u16,
  /// Directory holding the served files.
  pub storage_root: PathBuf,
  pub backend:      Backend,
  /// Location of the SQLite metadata index (`backend = "sqlite"` only).
  pub index_path:   Option<PathBuf>,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub locks:  LockManager,
  pub config: Arc<ServerConfig>,
}

// Arc fields clone regardless of `S: Clone`.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      locks:  self.locks.clone(),
      config: Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] serving the WebDAV namespace under `/webdav/`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ResourceStore + 'static,
{
  Router::new()
    .route("/",                any(root_handler))
    .route("/webdav",          any(dav_handler::<S>))
    .route("/webdav/",         any(dav_handler::<S>))
    .route("/webdav/{*path}",  any(dav_handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Capability discovery probes often hit the server root before the DAV
/// prefix; everything else there is a 404.
async fn root_handler(req: Request<Body>) -> Response {
  if req.method() == Method::OPTIONS {
    options::handler()
  } else {
    Error::NotFound.into_response()
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

async fn collect_body(req: Request<Body>) -> Result<Bytes, Error> {
  axum::body::to_bytes(req.into_body(), MAX_XML_BODY)
    .await
    .map_err(|_| Error::PayloadTooLarge)
}

/// DELETE, COPY, and MOVE take no body; a non-empty one is rejected.
async fn reject_body(req: Request<Body>) -> Result<(), Error> {
  let body = collect_body(req).await?;
  if body.is_empty() {
    Ok(())
  } else {
    Err(Error::UnsupportedMediaType("request takes no body".into()))
  }
}

/// Decode the in-namespace remainder of the request path.
fn decode_path(uri: &axum::http::Uri) -> Result<String, Error> {
  let raw = uri.path();
  let inside = raw
    .strip_prefix(DAV_PREFIX)
    .or_else(|| raw.strip_prefix("/webdav").map(|_| ""))
    .unwrap_or(raw);
  let decoded = percent_decode_str(inside)
    .decode_utf8()
    .map_err(|_| Error::BadRequest("request path is not valid UTF-8".into()))?;
  Ok(decoded.trim_matches('/').to_owned())
}

async fn dav_handler<S>(
  State(state): State<AppState<S>>,
  req: Request<Body>,
) -> Response
where
  S: ResourceStore + 'static,
{
  dispatch(state, req).await.unwrap_or_else(|e| e.into_response())
}

async fn dispatch<S>(
  state: AppState<S>,
  req: Request<Body>,
) -> Result<Response, Error>
where
  S: ResourceStore + 'static,
{
  let method = req.method().clone();
  if method == Method::OPTIONS {
    return Ok(options::handler());
  }

  let path = decode_path(req.uri())?;
  if path.is_empty() {
    return Err(Error::BadRequest("request path is empty".into()));
  }
  let req_headers = req.headers().clone();

  // Dropped when the client goes away, aborting in-flight store work.
  let cancel = CancellationToken::new();
  let _abort_on_drop = cancel.clone().drop_guard();

  match method.as_str() {
    "GET" | "HEAD" => {
      get::handler(&state, &method, &path, &cancel).await
    }
    "PUT" => {
      let stream = req
        .into_body()
        .into_data_stream()
        .map_err(std::io::Error::other);
      let reader: ResourceReader = Box::pin(StreamReader::new(stream));
      put::handler(&state, &req_headers, &path, reader, &cancel).await
    }
    "DELETE" => {
      reject_body(req).await?;
      delete::handler(&state, &req_headers, &path, &cancel).await
    }
    "MKCOL" => {
      let body = collect_body(req).await?;
      mkcol::handler(&state, &req_headers, &path, &body, &cancel).await
    }
    "PROPFIND" => {
      let depth = headers::depth(&req_headers)?;
      let body = collect_body(req).await?;
      propfind::handler(&state, &path, depth, &body, &cancel).await
    }
    "PROPPATCH" => {
      let body = collect_body(req).await?;
      proppatch::handler(&state, &req_headers, &path, &body, &cancel).await
    }
    "LOCK" => {
      let body = collect_body(req).await?;
      handlers::lock::lock(&state, &req_headers, &path, &body, &cancel).await
    }
    "UNLOCK" => handlers::lock::unlock(&state, &req_headers, &path).await,
    "COPY" => {
      reject_body(req).await?;
      copymove::handler(
        &state, copymove::Mode::Copy, &req_headers, &path, &cancel,
      )
      .await
    }
    "MOVE" => {
      reject_body(req).await?;
      copymove::handler(
        &state, copymove::Mode::Move, &req_headers, &path, &cancel,
      )
      .await
    }
    _ => Err(Error::MethodNotAllowed),
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::http::{Request, StatusCode, header};
  use davit_store_fs::FsStore;
  use tempfile::TempDir;
  use tower::ServiceExt as _;

  use super::*;

  fn make_state() -> (AppState<FsStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let state = AppState {
      store:  Arc::new(FsStore::new(dir.path())),
      locks:  LockManager::new(),
      config: Arc::new(ServerConfig {
        host:         "127.0.0.1".to_string(),
        port:         8080,
        storage_root: dir.path().to_path_buf(),
        backend:      Backend::Fs,
        index_path:   None,
      }),
    };
    (state, dir)
  }

  async fn oneshot_raw(
    state:   AppState<FsStore>,
    method:  &str,
    uri:     &str,
    headers: Vec<(&'static str, &str)>,
    body:    &[u8],
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::from(body.to_vec())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  // ── OPTIONS ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn options_advertises_dav_class_2() {
    let (state, _dir) = make_state();
    let resp = oneshot_raw(state, "OPTIONS", "/webdav/", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("dav").unwrap(), "1,2");
    assert_eq!(resp.headers().get("ms-author-via").unwrap(), "DAV");
    let allow = resp.headers().get(header::ALLOW).unwrap().to_str().unwrap();
    for method in ["PROPFIND", "LOCK", "MOVE", "MKCOL"] {
      assert!(allow.contains(method), "Allow: {allow}");
    }
  }

  #[tokio::test]
  async fn options_at_server_root_advertises_capabilities() {
    let (state, _dir) = make_state();
    let resp = oneshot_raw(state, "OPTIONS", "/", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("dav").unwrap(), "1,2");
  }

  // ── PUT / GET round-trip ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn put_creates_and_get_returns_content() {
    let (state, _dir) = make_state();

    let put = oneshot_raw(
      state.clone(),
      "PUT",
      "/webdav/notes.txt",
      vec![],
      b"hello dav",
    )
    .await;
    assert_eq!(put.status(), StatusCode::CREATED);
    let etag = put.headers().get(header::ETAG).unwrap().to_str().unwrap();
    assert!(etag.starts_with('"') && etag.ends_with('"'), "ETag: {etag}");

    let get =
      oneshot_raw(state, "GET", "/webdav/notes.txt", vec![], b"").await;
    assert_eq!(get.status(), StatusCode::OK);
    assert!(get.headers().contains_key(header::LAST_MODIFIED));
    assert_eq!(body_string(get).await, "hello dav");
  }

  #[tokio::test]
  async fn put_to_existing_overwrites_with_201() {
    let (state, _dir) = make_state();
    let first =
      oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"one").await;
    let first_etag =
      first.headers().get(header::ETAG).unwrap().to_str().unwrap().to_owned();

    // Coarse mtime granularity would otherwise reuse the validator.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let resp =
      oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"two").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let second_etag =
      resp.headers().get(header::ETAG).unwrap().to_str().unwrap().to_owned();
    assert_ne!(first_etag, second_etag);

    let get = oneshot_raw(state, "GET", "/webdav/a.txt", vec![], b"").await;
    assert_eq!(body_string(get).await, "two");
  }

  #[tokio::test]
  async fn put_with_stale_if_match_returns_412() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"one").await;
    let resp = oneshot_raw(
      state,
      "PUT",
      "/webdav/a.txt",
      vec![("if-match", "\"stale\"")],
      b"two",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
  }

  #[tokio::test]
  async fn get_nonexistent_returns_404() {
    let (state, _dir) = make_state();
    let resp = oneshot_raw(state, "GET", "/webdav/none.txt", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn get_collection_returns_404() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs", vec![], b"").await;
    let resp = oneshot_raw(state, "GET", "/webdav/docs", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── DELETE ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn delete_then_get_returns_404() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;

    let del =
      oneshot_raw(state.clone(), "DELETE", "/webdav/a.txt", vec![], b"").await;
    assert_eq!(del.status(), StatusCode::NO_CONTENT);

    let get = oneshot_raw(state, "GET", "/webdav/a.txt", vec![], b"").await;
    assert_eq!(get.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn delete_nonexistent_returns_404() {
    let (state, _dir) = make_state();
    let resp =
      oneshot_raw(state, "DELETE", "/webdav/none.txt", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn delete_with_body_returns_415() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let resp =
      oneshot_raw(state, "DELETE", "/webdav/a.txt", vec![], b"<junk/>").await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  }

  // ── MKCOL ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn mkcol_missing_parent_returns_409() {
    let (state, _dir) = make_state();
    let resp =
      oneshot_raw(state, "MKCOL", "/webdav/a/b/c", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn mkcol_on_existing_returns_409() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs", vec![], b"").await;
    let resp =
      oneshot_raw(state, "MKCOL", "/webdav/docs", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn mkcol_with_body_returns_415() {
    let (state, _dir) = make_state();
    let resp =
      oneshot_raw(state, "MKCOL", "/webdav/docs", vec![], b"<x/>").await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  }

  // ── PROPFIND ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn propfind_depth_zero_lists_only_self() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs", vec![], b"").await;
    oneshot_raw(state.clone(), "PUT", "/webdav/docs/a.txt", vec![], b"abcde")
      .await;

    let resp = oneshot_raw(
      state,
      "PROPFIND",
      "/webdav/docs",
      vec![("depth", "0")],
      b"",
    )
    .await;
    assert_eq!(resp.status().as_u16(), 207);
    let xml = body_string(resp).await;
    assert!(xml.contains("/webdav/docs/"), "{xml}");
    assert!(!xml.contains("a.txt"), "{xml}");
  }

  #[tokio::test]
  async fn propfind_depth_one_lists_children() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs", vec![], b"").await;
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs/sub", vec![], b"").await;
    oneshot_raw(state.clone(), "PUT", "/webdav/docs/a.txt", vec![], b"abcde")
      .await;
    oneshot_raw(
      state.clone(),
      "PUT",
      "/webdav/docs/sub/deep.txt",
      vec![],
      b"x",
    )
    .await;

    let resp =
      oneshot_raw(state, "PROPFIND", "/webdav/docs", vec![], b"").await;
    assert_eq!(resp.status().as_u16(), 207);
    let xml = body_string(resp).await;
    assert!(xml.contains("a.txt"), "{xml}");
    assert!(xml.contains("/webdav/docs/sub/"), "{xml}");
    assert!(!xml.contains("deep.txt"), "depth 1 must not recurse: {xml}");
    assert!(
      xml.contains("<D:getcontentlength>5</D:getcontentlength>"),
      "{xml}"
    );
  }

  #[tokio::test]
  async fn propfind_depth_infinity_recurses() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs", vec![], b"").await;
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs/sub", vec![], b"").await;
    oneshot_raw(
      state.clone(),
      "PUT",
      "/webdav/docs/sub/deep.txt",
      vec![],
      b"x",
    )
    .await;

    let resp = oneshot_raw(
      state,
      "PROPFIND",
      "/webdav/docs",
      vec![("depth", "infinity")],
      b"",
    )
    .await;
    assert_eq!(resp.status().as_u16(), 207);
    let xml = body_string(resp).await;
    assert!(xml.contains("deep.txt"), "{xml}");
  }

  #[tokio::test]
  async fn propfind_invalid_depth_returns_400() {
    let (state, _dir) = make_state();
    let resp = oneshot_raw(
      state,
      "PROPFIND",
      "/webdav/docs",
      vec![("depth", "2")],
      b"",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn propfind_nonexistent_returns_404() {
    let (state, _dir) = make_state();
    let resp =
      oneshot_raw(state, "PROPFIND", "/webdav/none", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── PROPPATCH ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn proppatch_acknowledges_each_property() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;

    let body = br#"<?xml version="1.0"?>
    <D:propertyupdate xmlns:D="DAV:" xmlns:Z="urn:example">
      <D:set><D:prop><Z:color>blue</Z:color></D:prop></D:set>
      <D:remove><D:prop><Z:flavor/></D:prop></D:remove>
    </D:propertyupdate>"#;
    let resp = oneshot_raw(
      state,
      "PROPPATCH",
      "/webdav/a.txt",
      vec![("content-type", "application/xml")],
      body,
    )
    .await;
    assert_eq!(resp.status().as_u16(), 207);
    let xml = body_string(resp).await;
    assert!(xml.contains("<color/>"), "{xml}");
    assert!(xml.contains("<flavor/>"), "{xml}");
    assert!(xml.contains("HTTP/1.1 200 OK"), "{xml}");
  }

  #[tokio::test]
  async fn proppatch_non_xml_content_type_returns_415() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let resp = oneshot_raw(
      state,
      "PROPPATCH",
      "/webdav/a.txt",
      vec![("content-type", "text/plain")],
      b"whatever",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  }

  // ── COPY / MOVE ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn copy_duplicates_and_leaves_source() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"payload")
      .await;

    let copy = oneshot_raw(
      state.clone(),
      "COPY",
      "/webdav/a.txt",
      vec![("destination", "/webdav/b.txt")],
      b"",
    )
    .await;
    assert_eq!(copy.status(), StatusCode::CREATED);

    let src = oneshot_raw(state.clone(), "GET", "/webdav/a.txt", vec![], b"")
      .await;
    assert_eq!(src.status(), StatusCode::OK);
    let dst = oneshot_raw(state, "GET", "/webdav/b.txt", vec![], b"").await;
    assert_eq!(body_string(dst).await, "payload");
  }

  #[tokio::test]
  async fn move_relocates_and_removes_source() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"payload")
      .await;

    let mv = oneshot_raw(
      state.clone(),
      "MOVE",
      "/webdav/a.txt",
      vec![("destination", "http://host/webdav/moved.txt")],
      b"",
    )
    .await;
    assert_eq!(mv.status(), StatusCode::CREATED);

    let src = oneshot_raw(state.clone(), "GET", "/webdav/a.txt", vec![], b"")
      .await;
    assert_eq!(src.status(), StatusCode::NOT_FOUND);
    let dst =
      oneshot_raw(state, "GET", "/webdav/moved.txt", vec![], b"").await;
    assert_eq!(body_string(dst).await, "payload");
  }

  #[tokio::test]
  async fn move_collection_carries_descendants() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs", vec![], b"").await;
    oneshot_raw(state.clone(), "PUT", "/webdav/docs/a.txt", vec![], b"x")
      .await;

    let mv = oneshot_raw(
      state.clone(),
      "MOVE",
      "/webdav/docs",
      vec![("destination", "/webdav/archive")],
      b"",
    )
    .await;
    assert_eq!(mv.status(), StatusCode::CREATED);

    let dst =
      oneshot_raw(state, "GET", "/webdav/archive/a.txt", vec![], b"").await;
    assert_eq!(dst.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn move_overwrite_false_onto_existing_returns_412() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"one").await;
    oneshot_raw(state.clone(), "PUT", "/webdav/b.txt", vec![], b"two").await;

    let resp = oneshot_raw(
      state,
      "MOVE",
      "/webdav/a.txt",
      vec![("destination", "/webdav/b.txt"), ("overwrite", "F")],
      b"",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
  }

  #[tokio::test]
  async fn copy_overwrite_true_replaces_destination() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"one").await;
    oneshot_raw(state.clone(), "PUT", "/webdav/b.txt", vec![], b"two").await;

    let resp = oneshot_raw(
      state.clone(),
      "COPY",
      "/webdav/a.txt",
      vec![("destination", "/webdav/b.txt")],
      b"",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let dst = oneshot_raw(state, "GET", "/webdav/b.txt", vec![], b"").await;
    assert_eq!(body_string(dst).await, "one");
  }

  #[tokio::test]
  async fn move_onto_itself_returns_403() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let resp = oneshot_raw(
      state,
      "MOVE",
      "/webdav/a.txt",
      vec![("destination", "/webdav/a.txt")],
      b"",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn move_to_missing_destination_ancestor_returns_409() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let resp = oneshot_raw(
      state,
      "MOVE",
      "/webdav/a.txt",
      vec![("destination", "/webdav/no/such/dir/a.txt")],
      b"",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn copy_to_missing_destination_ancestor_returns_409() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let resp = oneshot_raw(
      state,
      "COPY",
      "/webdav/a.txt",
      vec![("destination", "/webdav/ghost/a.txt")],
      b"",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn copy_missing_destination_header_returns_400() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let resp =
      oneshot_raw(state, "COPY", "/webdav/a.txt", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── LOCK / UNLOCK ────────────────────────────────────────────────────────────

  const LOCK_BODY: &[u8] = br#"<?xml version="1.0"?>
  <D:lockinfo xmlns:D="DAV:">
    <D:lockscope><D:exclusive/></D:lockscope>
    <D:locktype><D:write/></D:locktype>
    <D:owner>alice</D:owner>
  </D:lockinfo>"#;

  const XML_CT: (&str, &str) = ("content-type", "application/xml");

  async fn acquire_lock(state: &AppState<FsStore>, uri: &str) -> String {
    let resp =
      oneshot_raw(state.clone(), "LOCK", uri, vec![XML_CT], LOCK_BODY).await;
    assert_eq!(resp.status(), StatusCode::OK);
    resp
      .headers()
      .get("lock-token")
      .unwrap()
      .to_str()
      .unwrap()
      .to_string()
  }

  #[tokio::test]
  async fn lock_returns_token_and_discovery_body() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;

    let resp =
      oneshot_raw(state, "LOCK", "/webdav/a.txt", vec![XML_CT], LOCK_BODY)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token = resp
      .headers()
      .get("lock-token")
      .unwrap()
      .to_str()
      .unwrap()
      .to_string();
    assert!(token.starts_with("<opaquelocktoken:"), "token: {token}");
    let xml = body_string(resp).await;
    assert!(xml.contains("<D:exclusive/>"), "{xml}");
    assert!(xml.contains("Second-3600"), "{xml}");
  }

  #[tokio::test]
  async fn locked_resource_rejects_writes_without_token() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let token = acquire_lock(&state, "/webdav/a.txt").await;

    let put =
      oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"y").await;
    assert_eq!(put.status(), StatusCode::LOCKED);
    let del = oneshot_raw(state.clone(), "DELETE", "/webdav/a.txt", vec![], b"")
      .await;
    assert_eq!(del.status(), StatusCode::LOCKED);

    // The token holder writes through.
    let put = oneshot_raw(
      state,
      "PUT",
      "/webdav/a.txt",
      vec![("lock-token", token.as_str())],
      b"y",
    )
    .await;
    assert_eq!(put.status(), StatusCode::CREATED);
  }

  #[tokio::test]
  async fn collection_lock_covers_descendants() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "MKCOL", "/webdav/docs", vec![], b"").await;
    acquire_lock(&state, "/webdav/docs").await;

    let put = oneshot_raw(state, "PUT", "/webdav/docs/a.txt", vec![], b"x")
      .await;
    assert_eq!(put.status(), StatusCode::LOCKED);
  }

  #[tokio::test]
  async fn unlock_releases_the_lock() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let token = acquire_lock(&state, "/webdav/a.txt").await;

    let unlock = oneshot_raw(
      state.clone(),
      "UNLOCK",
      "/webdav/a.txt",
      vec![("lock-token", token.as_str())],
      b"",
    )
    .await;
    assert_eq!(unlock.status(), StatusCode::NO_CONTENT);

    let put =
      oneshot_raw(state, "PUT", "/webdav/a.txt", vec![], b"y").await;
    assert_eq!(put.status(), StatusCode::CREATED);
  }

  #[tokio::test]
  async fn unlock_without_token_returns_400() {
    let (state, _dir) = make_state();
    let resp =
      oneshot_raw(state, "UNLOCK", "/webdav/a.txt", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unlock_with_unknown_token_returns_409() {
    let (state, _dir) = make_state();
    let resp = oneshot_raw(
      state,
      "UNLOCK",
      "/webdav/a.txt",
      vec![("lock-token", "<opaquelocktoken:bogus>")],
      b"",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn second_exclusive_lock_returns_423() {
    let (state, _dir) = make_state();
    acquire_lock(&state, "/webdav/a.txt").await;
    let resp =
      oneshot_raw(state, "LOCK", "/webdav/a.txt", vec![XML_CT], LOCK_BODY)
        .await;
    assert_eq!(resp.status(), StatusCode::LOCKED);
  }

  #[tokio::test]
  async fn lock_without_owner_returns_400() {
    let (state, _dir) = make_state();
    let body = br#"<?xml version="1.0"?>
    <D:lockinfo xmlns:D="DAV:">
      <D:lockscope><D:exclusive/></D:lockscope>
      <D:locktype><D:write/></D:locktype>
    </D:lockinfo>"#;
    let resp =
      oneshot_raw(state, "LOCK", "/webdav/a.txt", vec![XML_CT], body).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn lock_without_content_type_returns_415() {
    let (state, _dir) = make_state();
    let resp =
      oneshot_raw(state, "LOCK", "/webdav/a.txt", vec![], LOCK_BODY).await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  }

  #[tokio::test]
  async fn proppatch_without_content_type_returns_415() {
    let (state, _dir) = make_state();
    oneshot_raw(state.clone(), "PUT", "/webdav/a.txt", vec![], b"x").await;
    let resp = oneshot_raw(
      state,
      "PROPPATCH",
      "/webdav/a.txt",
      vec![],
      b"<D:propertyupdate xmlns:D=\"DAV:\"/>",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  }

  // ── Dispatch edges ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unknown_method_returns_405() {
    let (state, _dir) = make_state();
    let resp =
      oneshot_raw(state, "PATCH", "/webdav/a.txt", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
  }

  #[tokio::test]
  async fn empty_path_returns_400_for_non_options() {
    let (state, _dir) = make_state();
    let resp = oneshot_raw(state, "GET", "/webdav/", vec![], b"").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn dot_segments_are_rejected() {
    let (state, _dir) = make_state();
    let resp =
      oneshot_raw(state, "GET", "/webdav/../etc/passwd", vec![], b"").await;
    // Rejected either by the router or by path normalization.
    assert!(
      resp.status() == StatusCode::BAD_REQUEST
        || resp.status() == StatusCode::NOT_FOUND,
      "status: {}",
      resp.status()
    );
  }

  #[tokio::test]
  async fn percent_encoded_names_round_trip() {
    let (state, _dir) = make_state();
    let put = oneshot_raw(
      state.clone(),
      "PUT",
      "/webdav/my%20file.txt",
      vec![],
      b"spaced",
    )
    .await;
    assert_eq!(put.status(), StatusCode::CREATED);

    let get =
      oneshot_raw(state, "GET", "/webdav/my%20file.txt", vec![], b"").await;
    assert_eq!(get.status(), StatusCode::OK);
    assert_eq!(body_string(get).await, "spaced");
  }
}
