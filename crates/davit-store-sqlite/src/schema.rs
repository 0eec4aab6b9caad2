//! SQL schema for the resource metadata index.
//!
//! Executed once at connection startup. `PRAGMA user_version` stamps the
//! schema so future migrations can gate on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- A shadow of the physical tree: one row per file or collection.
-- The filesystem owns the bytes; this table is a metadata cache and must
-- be kept in sync by every mutating store operation.
CREATE TABLE IF NOT EXISTS resources (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    path            TEXT NOT NULL UNIQUE,
    is_directory    INTEGER NOT NULL,
    length          INTEGER NOT NULL DEFAULT 0,
    last_write_time TEXT NOT NULL,     -- RFC 3339 UTC
    etag            TEXT NOT NULL,     -- fresh opaque token per write
    content_type    TEXT,              -- NULL for collections
    name            TEXT NOT NULL,
    extension       TEXT NOT NULL DEFAULT ''
);

PRAGMA user_version = 1;
";
