//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - Create DTOs for inserts
//! - Response shapes where the row itself is not safe or useful to expose

pub mod code;
pub mod code_usage;
pub mod device;
pub mod device_history;
pub mod operator;
pub mod operator_session;
pub mod plan;
pub mod user;
