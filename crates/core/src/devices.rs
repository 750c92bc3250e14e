//! Device activation domain types.
//!
//! A device pairing is a state machine: `pending` on registration, `active`
//! after an operator binds it to a plan, `expired` when the subscription
//! window lapses (discovered lazily on the next status poll), and
//! `deactivated` after explicit operator revocation. `deactivated` is
//! terminal.

use serde::{Deserialize, Serialize};

/// History log action names for `device_activation_history` rows.
pub mod actions {
    pub const REGISTERED: &str = "registered";
    pub const ACTIVATED: &str = "activated";
    pub const DEACTIVATED: &str = "deactivated";
}

/// Lifecycle states of a device activation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Registered, waiting for an operator to bind a plan.
    Pending,
    /// Bound to a plan with a future `expires_at`.
    Active,
    /// The subscription window lapsed. Eligible for re-activation (renewal).
    Expired,
    /// Revoked by an operator. Terminal.
    Deactivated,
}

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::Pending => "pending",
            DeviceStatus::Active => "active",
            DeviceStatus::Expired => "expired",
            DeviceStatus::Deactivated => "deactivated",
        }
    }

    /// Whether a transition from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: DeviceStatus) -> bool {
        use DeviceStatus::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Pending, Deactivated)
                | (Active, Expired)
                | (Active, Deactivated)
                | (Expired, Active)
                | (Expired, Deactivated)
        )
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeviceStatus::Pending),
            "active" => Ok(DeviceStatus::Active),
            "expired" => Ok(DeviceStatus::Expired),
            "deactivated" => Ok(DeviceStatus::Deactivated),
            other => Err(format!("unknown device status: {other}")),
        }
    }
}

impl TryFrom<String> for DeviceStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_strings() {
        for status in [
            DeviceStatus::Pending,
            DeviceStatus::Active,
            DeviceStatus::Expired,
            DeviceStatus::Deactivated,
        ] {
            assert_eq!(status.as_str().parse::<DeviceStatus>().unwrap(), status);
        }
    }

    #[test]
    fn deactivated_is_terminal() {
        for next in [
            DeviceStatus::Pending,
            DeviceStatus::Active,
            DeviceStatus::Expired,
            DeviceStatus::Deactivated,
        ] {
            assert!(!DeviceStatus::Deactivated.can_transition_to(next));
        }
    }

    #[test]
    fn expired_devices_can_be_renewed() {
        assert!(DeviceStatus::Expired.can_transition_to(DeviceStatus::Active));
    }

    #[test]
    fn pending_never_expires() {
        // A pending device has no expires_at; only active records lapse.
        assert!(!DeviceStatus::Pending.can_transition_to(DeviceStatus::Expired));
    }
}
