// Kiosk PIN check
//
// The kiosk unlocks with a single fixed 4-digit PIN. The configured PIN is
// kept only as an HMAC tag under a per-process random key, and attempts are
// compared with `verify_slice`, which runs in constant time.

use crate::errors::AuthError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{instrument, warn};

type HmacSha256 = Hmac<Sha256>;

pub const PIN_LENGTH: usize = 4;

/// Whether `pin` has the right shape to be submitted
pub fn is_valid_pin_length(pin: &str) -> bool {
    pin.chars().count() == PIN_LENGTH
}

fn is_well_formed(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Verifies PIN entries against the configured kiosk PIN
pub struct PinAuthenticator {
    key: [u8; 32],
    tag: Vec<u8>,
}

impl PinAuthenticator {
    /// Fails when the configured PIN is not exactly four ASCII digits
    pub fn new(pin: &str) -> Result<Self, AuthError> {
        if !is_well_formed(pin) {
            return Err(AuthError::InvalidPinFormat(PIN_LENGTH));
        }
        let key: [u8; 32] = rand::random();
        let tag = Self::mac(&key, pin)?.finalize().into_bytes().to_vec();
        Ok(Self { key, tag })
    }

    fn mac(key: &[u8], pin: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| AuthError::AuthenticationFailed(e.to_string()))?;
        mac.update(pin.as_bytes());
        Ok(mac)
    }

    #[instrument(skip_all)]
    pub fn verify(&self, attempt: &str) -> Result<(), AuthError> {
        if !is_valid_pin_length(attempt) {
            return Err(AuthError::InvalidPinFormat(PIN_LENGTH));
        }
        Self::mac(&self.key, attempt)?
            .verify_slice(&self.tag)
            .map_err(|_| {
                warn!("Incorrect PIN entered");
                AuthError::InvalidCredentials
            })
    }
}

impl std::fmt::Debug for PinAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinAuthenticator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_pin_is_accepted() {
        let auth = PinAuthenticator::new("1234").unwrap();
        assert!(auth.verify("1234").is_ok());
    }

    #[test]
    fn test_wrong_pin_is_rejected() {
        let auth = PinAuthenticator::new("1234").unwrap();
        assert_eq!(auth.verify("4321"), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn test_short_attempt_is_a_format_error() {
        let auth = PinAuthenticator::new("1234").unwrap();
        assert_eq!(auth.verify("123"), Err(AuthError::InvalidPinFormat(4)));
    }

    #[test]
    fn test_configured_pin_must_be_digits() {
        assert!(PinAuthenticator::new("12a4").is_err());
        assert!(PinAuthenticator::new("12345").is_err());
    }

    #[test]
    fn test_pin_length_check() {
        assert!(is_valid_pin_length("0000"));
        assert!(!is_valid_pin_length(""));
        assert!(!is_valid_pin_length("00000"));
    }
}
