//! SQLite persistence for process-wide sync metadata.

mod model;
mod repository;

pub use model::SyncMetaDB;
pub use repository::SyncMetaRepository;
