/// Password hashing using Argon2id
///
/// Passwords are hashed once at registration and compared at login. The
/// plaintext is never stored or logged.
///
/// # Parameters
///
/// - **Algorithm**: Argon2id
/// - **Memory**: 64 MB (65536 KiB) by default
/// - **Iterations**: 3 passes by default
/// - **Parallelism**: 4 lanes by default
/// - **Output**: 32-byte hash
///
/// The cost parameters come from [`PasswordParams`] so deployments can tune
/// them (`PASSWORD_MEMORY_KIB`, `PASSWORD_ITERATIONS`, `PASSWORD_PARALLELISM`).
/// Verification reads the parameters embedded in the stored PHC string, so
/// hashes made with older settings keep verifying after a change.
///
/// # Example
///
/// ```
/// use taskforge_shared::auth::password::{hash_password_with, verify_password, PasswordParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let params = PasswordParams { memory_kib: 1024, iterations: 1, parallelism: 1 };
/// let hash = hash_password_with("super_secret_password_123", &params)?;
///
/// assert!(verify_password("super_secret_password_123", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("password verification failed: {0}")]
    Verify(String),

    /// The stored value is not a PHC string
    #[error("malformed password hash: {0}")]
    MalformedHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Hashes a password with the default parameters
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with(password, &PasswordParams::default())
}

/// Hashes with a fresh salt into a PHC string
/// (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`)
pub fn hash_password_with(password: &str, params: &PasswordParams) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon_params = ParamsBuilder::new()
        .m_cost(params.memory_kib)
        .t_cost(params.iterations)
        .p_cost(params.parallelism)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::Hash(format!("invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon_params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Constant-time comparison against a stored PHC string
///
/// A mismatch is `Ok(false)`; only unparsable hashes and internal failures
/// are errors.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let stored = PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    // Cost parameters are read from the PHC string
    match Argon2::default().verify_password(password.as_bytes(), &stored) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordParams {
        PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_default_params_in_phc_string() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_with_custom_params() {
        let hash = hash_password_with("pw", &cheap()).unwrap();
        assert!(hash.contains("m=1024,t=1,p=1"));
    }

    #[test]
    fn test_salt_differs_per_hash() {
        let hash1 = hash_password_with("same_password", &cheap()).unwrap();
        let hash2 = hash_password_with("same_password", &cheap()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_matches_only_original() {
        let hash = hash_password_with("correct_password", &cheap()).unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(matches!(
            verify_password("password", "invalid_hash"),
            Err(PasswordError::MalformedHash(_))
        ));
        assert!(verify_password("password", "$argon2id$invalid").is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = PasswordParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 0,
        };
        assert!(matches!(
            hash_password_with("pw", &params),
            Err(PasswordError::Hash(_))
        ));
    }

    #[test]
    fn test_unicode_password_roundtrip() {
        let hash = hash_password_with("unicode-密码-パスワード", &cheap()).unwrap();
        assert!(verify_password("unicode-密码-パスワード", &hash).unwrap());
    }
}
