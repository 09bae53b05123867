/// Opaque token and code generation
///
/// # Formats
///
/// - **Session token**: `tf_` + 40 base62 characters (43 chars total)
/// - **Verification / invitation code**: 32 base62 characters
///
/// Session tokens are handed to the client once. The server only keeps
/// their SHA-256 digest, both in the session ledger and as the cache key.
/// Codes travel inside links and are stored as-is.
///
/// # Example
///
/// ```
/// use taskforge_shared::auth::token::{digest_token, generate_session_token, is_session_token};
///
/// let token = generate_session_token();
/// assert!(is_session_token(&token));
/// assert_eq!(digest_token(&token).len(), 64);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Session token prefix
const SESSION_PREFIX: &str = "tf_";

/// Length of the random part of a session token
const SESSION_RANDOM_LENGTH: usize = 40;

/// Length of verification and invitation codes
pub const CODE_LENGTH: usize = 32;

/// Total length of a session token
pub const SESSION_TOKEN_LENGTH: usize = SESSION_PREFIX.len() + SESSION_RANDOM_LENGTH;

/// Generates a new session token
///
/// Key space is 62^40, roughly 2^238.
pub fn generate_session_token() -> String {
    format!("{}{}", SESSION_PREFIX, generate_random_string(SESSION_RANDOM_LENGTH))
}

/// Generates a verification or invitation code
pub fn generate_code() -> String {
    generate_random_string(CODE_LENGTH)
}

/// Hex SHA-256 digest of a token, used as its storage key
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Checks the shape of a session token
///
/// Lets callers reject garbage before hitting the cache or the ledger.
pub fn is_session_token(token: &str) -> bool {
    token.len() == SESSION_TOKEN_LENGTH
        && token
            .strip_prefix(SESSION_PREFIX)
            .map(|rest| rest.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or(false)
}

/// Generates a random alphanumeric string
///
/// Uses base62 (A-Z, a-z, 0-9) so the result is URL-safe.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
