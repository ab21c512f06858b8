//! Local storage: connection lifecycle and repositories.

pub mod connection;
pub mod equipment;
pub mod user;

pub use connection::{SCHEMA_VERSION, Storage, TableCounts, sqlite_url};
pub use equipment::EquipmentStore;
pub use user::CredentialStore;
