//! Plain filesystem backend for the Davit resource store.
//!
//! Paths map directly onto a configured storage root; metadata (ETag,
//! content type) is derived on read, nothing is persisted besides the files
//! themselves.

mod store;

pub use store::FsStore;
