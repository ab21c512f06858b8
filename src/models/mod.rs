//! Data models for users and equipment records.

pub mod equipment;
pub mod user;

pub use equipment::{CellValue, Equipment, EquipmentField, parse_count, parse_decimal};
pub use user::{LoginRequest, NewUser, SignUp};
