//! SQLite-specific helpers.

mod path;

pub(crate) use path::{is_memory_dsn, prepare_sqlite_path};
