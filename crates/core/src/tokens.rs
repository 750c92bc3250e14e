//! Generation of redemption codes, device keys, and disposable credentials.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the API/repository layer and any future worker or CLI tooling. Nothing
//! here touches the store; uniqueness is enforced at insert time by the
//! callers.

use rand::Rng;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Alphabet for redemption codes. Excludes `0`, `1`, `I`, and `O`, which are
/// easy to misread when a subscriber types a code off a printed card.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of random characters in a redemption code (before dashes).
pub const CODE_LENGTH: usize = 16;

/// Characters per dash-separated code group.
const CODE_GROUP_SIZE: usize = 4;

/// Device keys are 8-digit numbers, easy to read off a TV screen.
const DEVICE_KEY_MIN: u32 = 10_000_000;
const DEVICE_KEY_MAX: u32 = 99_999_999;

/// Length of the random suffix in a generated username.
const USERNAME_SUFFIX_LENGTH: usize = 10;

/// Length of a generated account password.
pub const PASSWORD_LENGTH: usize = 12;

// ---------------------------------------------------------------------------
// Redemption codes
// ---------------------------------------------------------------------------

/// Generate a redemption code in `XXXX-XXXX-XXXX-XXXX` format.
///
/// The raw value is 16 characters drawn from [`CODE_ALPHABET`] (32 symbols),
/// giving 80 bits of entropy per code.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    let raw: Vec<u8> = (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())])
        .collect();

    raw.chunks(CODE_GROUP_SIZE)
        .map(|group| std::str::from_utf8(group).expect("alphabet is ASCII"))
        .collect::<Vec<_>>()
        .join("-")
}

// ---------------------------------------------------------------------------
// Device keys
// ---------------------------------------------------------------------------

/// Generate an 8-digit numeric device key.
///
/// Collisions are possible in this space; the repository layer retries on
/// unique-constraint violation.
pub fn generate_device_key() -> String {
    rand::rng()
        .random_range(DEVICE_KEY_MIN..=DEVICE_KEY_MAX)
        .to_string()
}

// ---------------------------------------------------------------------------
// Disposable credentials
// ---------------------------------------------------------------------------

/// Username/password pair for a freshly provisioned account.
///
/// The password is returned to the subscriber exactly once; only its Argon2
/// hash is persisted.
#[derive(Debug, Clone)]
pub struct GeneratedCredentials {
    pub username: String,
    pub password: String,
}

/// Generate credentials for a code-redemption account (`user_` prefix).
pub fn generate_credentials() -> GeneratedCredentials {
    GeneratedCredentials {
        username: format!("user_{}", random_lowercase(USERNAME_SUFFIX_LENGTH)),
        password: generate_password(),
    }
}

/// Generate credentials for a device-activation account.
///
/// The username embeds the device key so support staff can match an account
/// to the physical device without a join.
pub fn credentials_for_device(device_key: &str) -> GeneratedCredentials {
    GeneratedCredentials {
        username: format!("device_{}", device_key.to_lowercase()),
        password: generate_password(),
    }
}

/// Generate a random 12-character alphanumeric password.
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

fn random_lowercase(len: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Redemption codes --------------------------------------------------

    #[test]
    fn code_has_dash_separated_groups() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH + 3, "16 chars plus 3 dashes");
        assert_eq!(code.split('-').count(), 4);
        assert!(code.split('-').all(|g| g.len() == CODE_GROUP_SIZE));
    }

    #[test]
    fn code_uses_unambiguous_alphabet() {
        let code = generate_code();
        for c in code.chars().filter(|c| *c != '-') {
            assert!(
                CODE_ALPHABET.contains(&(c as u8)),
                "unexpected character {c} in code"
            );
        }
    }

    #[test]
    fn codes_are_unique_in_practice() {
        let a = generate_code();
        let b = generate_code();
        assert_ne!(a, b);
    }

    // -- Device keys -------------------------------------------------------

    #[test]
    fn device_key_is_eight_digits() {
        let key = generate_device_key();
        assert_eq!(key.len(), 8);
        assert!(key.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(key.as_bytes()[0], b'0', "key must not have a leading zero");
    }

    // -- Credentials -------------------------------------------------------

    #[test]
    fn generated_username_has_user_prefix() {
        let creds = generate_credentials();
        assert!(creds.username.starts_with("user_"));
        assert_eq!(creds.username.len(), 5 + USERNAME_SUFFIX_LENGTH);
        assert!(creds
            .username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn device_username_embeds_key() {
        let creds = credentials_for_device("12345678");
        assert_eq!(creds.username, "device_12345678");
    }

    #[test]
    fn password_is_alphanumeric_with_expected_length() {
        let password = generate_password();
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn passwords_differ_between_calls() {
        assert_ne!(generate_password(), generate_password());
    }
}
