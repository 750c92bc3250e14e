//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-statement state machines
//! (redemption, device activation) run their steps inside a single
//! transaction and live in their own modules.

pub mod code_repo;
pub mod code_usage_repo;
pub mod device_repo;
pub mod entitlement_repo;
pub mod operator_repo;
pub mod operator_session_repo;
pub mod plan_repo;
pub mod redemption_repo;
pub mod user_repo;

pub use code_repo::CodeRepo;
pub use code_usage_repo::CodeUsageRepo;
pub use device_repo::{ActivationError, DeviceRepo};
pub use entitlement_repo::EntitlementRepo;
pub use operator_repo::OperatorRepo;
pub use operator_session_repo::OperatorSessionRepo;
pub use plan_repo::PlanRepo;
pub use redemption_repo::{RedemptionError, RedemptionRepo};
pub use user_repo::UserRepo;
