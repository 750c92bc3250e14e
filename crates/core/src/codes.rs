//! Redemption code domain types.
//!
//! The code lifecycle is a closed state machine; every status change in the
//! repository layer goes through [`CodeStatus::can_transition_to`] so the
//! forward-only rule is enforced in exactly one place.

use serde::{Deserialize, Serialize};

/// Lifecycle states of a redemption code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeStatus {
    /// Redeemable (subject to expiry and use-count checks).
    Active,
    /// Every allowed use has been consumed. Terminal.
    Used,
    /// The `expires_at` deadline passed before the code was exhausted. Terminal.
    Expired,
    /// Pulled from circulation by an operator. Can be re-enabled.
    Disabled,
}

impl CodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CodeStatus::Active => "active",
            CodeStatus::Used => "used",
            CodeStatus::Expired => "expired",
            CodeStatus::Disabled => "disabled",
        }
    }

    /// Whether a transition from `self` to `next` is allowed.
    ///
    /// `used` and `expired` are terminal: once a code is spent or lapsed it
    /// never becomes redeemable again. `disabled` is an operator hold and
    /// may be lifted.
    pub fn can_transition_to(self, next: CodeStatus) -> bool {
        use CodeStatus::*;
        matches!(
            (self, next),
            (Active, Used) | (Active, Expired) | (Active, Disabled) | (Disabled, Active)
        )
    }
}

impl std::fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CodeStatus::Active),
            "used" => Ok(CodeStatus::Used),
            "expired" => Ok(CodeStatus::Expired),
            "disabled" => Ok(CodeStatus::Disabled),
            other => Err(format!("unknown code status: {other}")),
        }
    }
}

impl TryFrom<String> for CodeStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
