/*!
 * SQLite persistence for translation rows.
 *
 * This module provides the durable `LocalizedRecordStore`:
 * - `connection`: connection handling and blocking-task helpers
 * - `schema`: table definitions and schema versioning
 * - `repository`: the `SqliteStore` implementation
 */

pub mod connection;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::SqliteStore;
