//! The `ResourceStore` trait — the storage repository contract.
//!
//! The trait is implemented by storage backends (`davit-store-fs`,
//! `davit-store-sqlite`). The HTTP layer depends on this abstraction, not on
//! any concrete backend. Path normalization is the implementation's
//! responsibility: every method accepts the raw client path and rejects
//! invalid ones with [`Error::InvalidPath`](crate::Error::InvalidPath).

use std::{future::Future, pin::Pin};

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::{Result, resource::ResourceInfo};

/// A readable byte stream for one resource's content.
pub type ResourceReader = Pin<Box<dyn AsyncRead + Send>>;

/// Abstraction over a hierarchical resource namespace.
///
/// Every operation takes a [`CancellationToken`] tied to the client
/// connection and must honor it at least at I/O boundaries; a cancelled
/// operation returns [`Error::Cancelled`](crate::Error::Cancelled).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ResourceStore: Send + Sync {
  /// Whether a resource (file or collection) exists at `path`.
  /// `Ok(false)` for a missing path, never an error.
  fn resource_exists<'a>(
    &'a self,
    path: &'a str,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  /// Metadata snapshot for the resource at `path`. `Ok(None)` when absent,
  /// never an error.
  fn get_resource<'a>(
    &'a self,
    path: &'a str,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<Option<ResourceInfo>>> + Send + 'a;

  /// Open the content of the file at `path` for reading. Fails with
  /// `NotFound` when the path is absent or names a collection.
  fn open_resource<'a>(
    &'a self,
    path: &'a str,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<ResourceReader>> + Send + 'a;

  /// Immediate children of the collection at `path`. Fails with `NotFound`
  /// when the collection is absent.
  fn get_children<'a>(
    &'a self,
    path: &'a str,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<Vec<ResourceInfo>>> + Send + 'a;

  /// Stream `content` into the file at `path`, creating parent collections
  /// as needed and overwriting any existing file. Readers never observe a
  /// truncated file: implementations write to a temporary neighbor and
  /// atomically rename into place. The content is the same boxed reader
  /// shape [`open_resource`](Self::open_resource) produces, so a copy can
  /// feed one store method into another.
  fn save_resource<'a>(
    &'a self,
    path: &'a str,
    content: ResourceReader,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Create a collection at `path`. Fails with `AlreadyExists` when the
  /// path is already taken by a file or collection.
  fn create_collection<'a>(
    &'a self,
    path: &'a str,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<ResourceInfo>> + Send + 'a;

  /// Delete the resource at `path`; recursive for collections. Fails with
  /// `NotFound` when absent.
  fn delete_resource<'a>(
    &'a self,
    path: &'a str,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Rename `src` to `dst`. A collection moves together with all of its
  /// descendants; the indexed backend commits all affected index rows in
  /// one transaction.
  fn move_resource<'a>(
    &'a self,
    src: &'a str,
    dst: &'a str,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Deep-copy `src` to `dst`; recursive for collections, overwriting
  /// destination files.
  fn copy_resource<'a>(
    &'a self,
    src: &'a str,
    dst: &'a str,
    cancel: &'a CancellationToken,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}
