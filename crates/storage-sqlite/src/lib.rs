//! SQLite storage implementation for the mealtrack local store.
//!
//! Implements the core repository traits over Diesel with an r2d2 read pool
//! and a single-writer actor for mutations.

pub mod db;
pub mod errors;
pub mod meals;
pub mod schema;
pub mod sync_meta;

pub use db::{create_pool, get_connection, init, run_migrations, spawn_writer, WriteHandle};
pub use meals::MealRepository;
pub use sync_meta::SyncMetaRepository;
