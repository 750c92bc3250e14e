//! Pure domain layer for the PrimeX provisioning backend.
//!
//! No database or HTTP dependencies live here; everything in this crate can
//! be used from the repository layer, the API, and any future CLI tooling.

pub mod accounts;
pub mod codes;
pub mod devices;
pub mod entitlements;
pub mod error;
pub mod hashing;
pub mod roles;
pub mod tokens;
pub mod types;
