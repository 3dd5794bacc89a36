//! SQLite-backed repository implementations.

pub mod document;
pub mod exec;
pub mod pool;
pub mod turn;

pub use document::SqliteDocumentStore;
pub use exec::SqliteSqlExecutor;
pub use pool::DatabasePool;
pub use turn::SqliteTurnRepository;
