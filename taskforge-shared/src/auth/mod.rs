/// Authentication and authorization primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`token`]: session token and one-shot code generation, token digests
/// - [`policy`]: the role / ownership / membership decision table
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::auth::password::{hash_password, verify_password};
/// use taskforge_shared::auth::token::{digest_token, generate_session_token};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = generate_session_token();
/// let ledger_key = digest_token(&token);
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod policy;
pub mod token;
