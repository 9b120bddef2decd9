//! Offline menu cache: SQLite store and the local menu source on top of it.

pub mod local_source;
pub mod sqlite_store;

pub use local_source::LocalMenuSource;
pub use sqlite_store::SqliteMenuStore;
