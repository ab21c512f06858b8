//! SeaORM entity definitions for the local database.

pub mod prelude;

pub mod equipment;
pub mod users;
