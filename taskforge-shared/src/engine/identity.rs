/// Registration, verification, sessions and identity management

use serde::Serialize;
use uuid::Uuid;

use super::{
    require_principal, validate_email, validate_password, validate_photo, Engine, EngineError,
};
use crate::auth::password::{hash_password_with, verify_password, PasswordParams};
use crate::auth::token::{digest_token, generate_code, generate_session_token};
use crate::models::identity::{normalize_email, NewIdentity, Principal, Role};
use crate::notify::Notification;
use crate::store::StoreError;

/// A freshly issued session
///
/// `token` is the only copy of the plaintext; the ledger keeps its digest.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub principal: Principal,
}

impl Engine {
    /// Creates an unverified identity and sends its verification link
    ///
    /// The email is normalized (trimmed, lowercased) before the uniqueness
    /// check. The link is published after the identity is committed and
    /// outside the operation deadline.
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed email or empty password
    /// - `EmailExists` if a live identity already holds the email
    pub async fn register(&self, email: &str, password: &str) -> Result<Principal, EngineError> {
        let (principal, code) = self.bounded("register", async {
            let email = normalize_email(email);
            validate_email(&email)?;
            validate_password(password)?;

            if self.store.identity_by_email(&email).await?.is_some() {
                return Err(EngineError::EmailExists);
            }

            let password_hash = self.hash_password(password).await?;
            let code = generate_code();

            let identity = self
                .store
                .create_identity(NewIdentity {
                    email: email.clone(),
                    password_hash,
                    role: Role::User,
                    verification_code: code.clone(),
                })
                .await
                .map_err(|e| match e {
                    // Lost a race with a concurrent registration
                    StoreError::Conflict(_) => EngineError::EmailExists,
                    other => other.into(),
                })?;

            tracing::info!(identity_id = %identity.id, "Identity registered");
            Ok((identity.principal(), code))
        })
        .await?;

        self.notify(Notification::verification(&principal.email, &self.config.app_url, &code))
            .await;

        Ok(principal)
    }

    /// Marks the identity holding `code` as verified
    ///
    /// Codes stay valid after use, so verifying twice succeeds both times.
    pub async fn verify(&self, code: &str) -> Result<(), EngineError> {
        self.bounded("verify", async {
            if code.is_empty() {
                return Err(EngineError::validation("verification code is required"));
            }

            if !self.store.mark_verified(code).await? {
                return Err(EngineError::not_found("verification code"));
            }

            tracing::info!("Identity verified");
            Ok(())
        })
        .await
    }

    /// Issues a new verification code and sends it again
    ///
    /// The previous code stops working.
    pub async fn resend_verification(&self, email: &str) -> Result<(), EngineError> {
        let (email, code) = self.bounded("resend_verification", async {
            let email = normalize_email(email);
            validate_email(&email)?;

            let identity = self
                .store
                .identity_by_email(&email)
                .await?
                .ok_or_else(|| EngineError::not_found("identity"))?;

            if identity.verified {
                return Err(EngineError::validation("email is already verified"));
            }

            let code = generate_code();
            if !self.store.rotate_verification_code(identity.id, &code).await? {
                return Err(EngineError::not_found("identity"));
            }

            Ok((identity.email, code))
        })
        .await?;

        self.notify(Notification::verification(&email, &self.config.app_url, &code))
            .await;

        Ok(())
    }

    /// Checks credentials and issues a session
    ///
    /// Credentials are checked before the verification flag, so an
    /// unverified account only learns it is unverified after proving the
    /// password.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` for an unknown email or a wrong password
    /// - `NotVerification` if the password matches but the email is unverified
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, EngineError> {
        let (token_hash, issued) = self.bounded("login", async {
            let email = normalize_email(email);
            if email.is_empty() || password.is_empty() {
                return Err(EngineError::NotAuthenticated);
            }

            let identity = match self.store.identity_by_email(&email).await? {
                Some(identity) => identity,
                None => {
                    tracing::debug!("Login for unknown email");
                    return Err(EngineError::NotAuthenticated);
                }
            };

            if !self
                .check_password(password, &identity.password_hash)
                .await?
            {
                tracing::debug!(identity_id = %identity.id, "Login with wrong password");
                return Err(EngineError::NotAuthenticated);
            }

            if !identity.verified {
                return Err(EngineError::NotVerification);
            }

            let token = generate_session_token();
            let token_hash = digest_token(&token);
            self.store.record_session(&token_hash, identity.id).await?;

            tracing::info!(identity_id = %identity.id, "Session issued");
            Ok((
                token_hash,
                IssuedSession {
                    token,
                    principal: identity.principal(),
                },
            ))
        })
        .await?;

        self.sessions.remember(&token_hash, &issued.principal).await;
        Ok(issued)
    }

    /// Revokes a session
    ///
    /// Unknown and empty tokens are accepted silently. The cached snapshot
    /// is dropped after the revocation, outside the operation deadline, and
    /// also when the deadline fired, since the revocation may have
    /// committed anyway.
    pub async fn logout(&self, token: &str) -> Result<(), EngineError> {
        if token.is_empty() {
            return Ok(());
        }

        let token_hash = digest_token(token);
        let result = self
            .bounded("logout", async {
                let revoked = self.store.revoke_session(&token_hash).await?;
                tracing::debug!(revoked, "Session logout");
                Ok(())
            })
            .await;

        self.sessions.forget(&token_hash).await;
        result
    }

    /// Resolves a session token to its principal
    pub async fn resolve(&self, token: &str) -> Result<Principal, EngineError> {
        self.bounded("resolve", async {
            let principal = self.sessions.resolve(token).await?;
            require_principal(principal)
        })
        .await
    }

    /// Fresh copy of the actor's own identity
    pub async fn profile(&self, actor: &Principal) -> Result<Principal, EngineError> {
        self.bounded("profile", async {
            let identity = self.store.identity_by_id(actor.id).await?;
            require_principal(identity.map(|identity| identity.principal()))
        })
        .await
    }

    /// Identity lookup for admins, or for the identity itself
    pub async fn identity_by_id(&self, actor: &Principal, id: Uuid) -> Result<Principal, EngineError> {
        self.bounded("identity_by_id", async {
            if !actor.is_admin() && actor.id != id {
                return Err(EngineError::Forbidden);
            }

            self.store
                .identity_by_id(id)
                .await?
                .map(|identity| identity.principal())
                .ok_or_else(|| EngineError::not_found("identity"))
        })
        .await
    }

    /// Every live identity; admins only
    pub async fn list_identities(&self, actor: &Principal) -> Result<Vec<Principal>, EngineError> {
        self.bounded("list_identities", async {
            if !actor.is_admin() {
                return Err(EngineError::Forbidden);
            }

            let identities = self.store.list_identities().await?;
            Ok(identities.iter().map(|identity| identity.principal()).collect())
        })
        .await
    }

    /// Sets or clears the actor's photo reference
    ///
    /// Cached sessions of the actor are evicted so every session sees the
    /// new photo on its next request.
    pub async fn update_photo(
        &self,
        actor: &Principal,
        photo: Option<String>,
    ) -> Result<Principal, EngineError> {
        let result = self
            .bounded("update_photo", async {
                if let Some(photo) = &photo {
                    validate_photo(photo)?;
                }

                let identity = self
                    .store
                    .set_photo(actor.id, photo)
                    .await?
                    .ok_or_else(|| EngineError::not_found("identity"))?;

                Ok(identity.principal())
            })
            .await;

        self.evict_after_write(actor.id, &result).await?;
        result
    }

    /// Soft-deletes an identity; admins or the identity itself
    ///
    /// Existing sessions stop resolving immediately.
    pub async fn delete_identity(&self, actor: &Principal, id: Uuid) -> Result<(), EngineError> {
        let result = self
            .bounded("delete_identity", async {
                if !actor.is_admin() && actor.id != id {
                    return Err(EngineError::Forbidden);
                }

                if !self.store.soft_delete_identity(id).await? {
                    return Err(EngineError::not_found("identity"));
                }

                Ok(())
            })
            .await;

        let evicted = self.evict_after_write(id, &result).await?;
        if result.is_ok() {
            tracing::info!(identity_id = %id, actor_id = %actor.id, sessions = evicted, "Identity deleted");
        }
        result
    }

    /// Evicts an identity's cached sessions once its write section is over
    ///
    /// Runs outside the operation deadline. A `Transient` result still
    /// evicts because the write may have committed before the deadline
    /// fired; any other error committed nothing.
    async fn evict_after_write<T>(
        &self,
        identity_id: Uuid,
        result: &Result<T, EngineError>,
    ) -> Result<usize, EngineError> {
        match result {
            Ok(_) | Err(EngineError::Transient(_)) => {
                Ok(self.sessions.evict_identity(identity_id).await?)
            }
            Err(_) => Ok(0),
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, EngineError> {
        let password = password.to_string();
        let params: PasswordParams = self.config.password;

        tokio::task::spawn_blocking(move || hash_password_with(&password, &params))
            .await
            .map_err(|e| EngineError::Transient(format!("hashing task failed: {}", e)))?
            .map_err(EngineError::from)
    }

    async fn check_password(&self, password: &str, hash: &str) -> Result<bool, EngineError> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| EngineError::Transient(format!("verification task failed: {}", e)))?
            .map_err(EngineError::from)
    }
}
