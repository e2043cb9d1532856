//! HTTP sync client for the mealtrack backend.
//!
//! The wire contract itself lives in `mealtrack-core`; this crate owns the
//! HTTP plumbing: request construction, auth headers, error-body parsing,
//! and retry classification.

mod client;
mod error;
mod transport;

pub use client::MealSyncClient;
pub use error::{ApiRetryClass, Result, SyncApiError};
pub use transport::HttpSyncTransport;
