//! Core domain crate for the mealtrack offline-first meal log.
//!
//! Holds the domain models, the repository/service contracts, and the sync
//! subsystem (reconciliation engine, scheduler, retention policy). Storage
//! and HTTP concerns live in sibling crates behind the traits defined here.

pub mod errors;
pub mod meals;
pub mod sync;

pub use errors::{Error, Result};
