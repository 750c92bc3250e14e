//! Well-known operator role name constants.
//!
//! These must match the CHECK constraint in `0003_create_operator_tables.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CODES_SELLER: &str = "codes_seller";
