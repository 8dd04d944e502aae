pub mod db;
mod files;
mod links;
pub mod models;
mod tables;

pub use db::{Database, DatabaseError};
pub use links::ConsumeOutcome;
pub use tables::*;
