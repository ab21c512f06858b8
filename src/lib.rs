pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod export;
pub mod form;
pub mod models;

pub use error::{AppError, ErrorKind, Result};
