// Postgres storage layer with sqlx
//
// This crate provides database implementations for the core store traits:
// - RelationshipStore / PreferenceStore / DisplayNameStore / NotificationStore
//   are all implemented by Database
//
// Integration against a live database is exercised by the application's
// migration environment, not by unit tests here.

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
mod store_impls;

pub use config::DatabaseConfig;
pub use error::{Result, StorageError};
pub use models::*;
pub use repositories::Database;
