//! OAuth `state` parameter generation and validation
//!
//! The state value binds a callback to the login attempt that produced it.
//! It is drawn from the OS RNG and compared in constant time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes behind each state value (encodes to 43 characters)
const STATE_BYTES: usize = 32;

/// Generate a cryptographically random state token for CSRF protection
///
/// Returns a URL-safe base64 string without padding.
#[must_use]
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate that the callback state matches the pending one
///
/// Empty values never validate.
#[must_use]
pub fn validate_state(expected: &str, received: &str) -> bool {
    !expected.is_empty() && constant_time_eq(expected, received)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
