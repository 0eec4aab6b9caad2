//! SQLite-indexed backend for the Davit resource store.
//!
//! Bytes live on the filesystem, which remains the source of truth;
//! metadata (ETags, sizes, timestamps) lives in a `resources` table kept in
//! sync on every mutating operation. Wraps [`tokio_rusqlite`] so all
//! database access runs off the async runtime's worker threads.

mod encode;
mod schema;
mod store;

pub use store::SqliteStore;
