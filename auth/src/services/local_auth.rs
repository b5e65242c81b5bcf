//! Registration and login over email + password.
//!
//! `AuthService` wires a `UserStore`, a `CredentialHasher` and a
//! `TokenIssuer` together. It holds no mutable state of its own and can be
//! shared behind an `Arc`.

use std::sync::Arc;
use std::time::Instant;

use authcore_config::AuthConfig;
use authcore_models::{
    strip_reserved_keys, AuthResponse, LoginRequest, NewUser, PaginatedResult, Pagination,
    RegisterRequest, User, UserView,
};
use authcore_observability::{log_auth_event, AuthEventKind};
use uuid::Uuid;

use super::password::{hasher_for, CredentialHasher};
use super::tokens::TokenIssuer;
use super::users::UserStore;
use crate::errors::{AuthError, HashingError, StoreError};

const SERVICE_NAME: &str = "authcore";

pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: TokenIssuer,
    /// Verified against when the email is unknown, so both login failures cost one verification.
    decoy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: TokenIssuer,
    ) -> Result<Self, AuthError> {
        let decoy_hash = hasher.hash(&Uuid::new_v4().to_string()).map_err(|e| {
            tracing::error!(error = %e, "Failed to prepare decoy credential hash");
            AuthError::Internal
        })?;

        Ok(Self {
            store,
            hasher,
            tokens,
            decoy_hash,
        })
    }

    pub fn from_config(config: &AuthConfig, store: Arc<dyn UserStore>) -> Result<Self, AuthError> {
        let hasher = hasher_for(config).map_err(|e| {
            tracing::error!(error = %e, "Invalid password hasher configuration");
            AuthError::Internal
        })?;
        let tokens = TokenIssuer::from_config(config).map_err(|e| {
            tracing::error!(error = %e, "Invalid token issuer configuration");
            AuthError::Internal
        })?;
        Self::new(store, hasher, tokens)
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    #[tracing::instrument(skip_all)]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        let started = Instant::now();
        let result = self.register_inner(request).await;
        let failure = result.as_ref().err().map(AuthError::code);
        let user_id = result.as_ref().ok().map(|r| r.user.id);
        log_auth_event(
            SERVICE_NAME,
            AuthEventKind::Register,
            user_id,
            failure,
            elapsed_ms(started),
        );
        result
    }

    async fn register_inner(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);
        let password_hash = self.hash(&request.password).await?;

        let mut profile = request.profile.clone();
        let dropped = strip_reserved_keys(&mut profile);
        if !dropped.is_empty() {
            tracing::warn!(keys = ?dropped, "Ignoring reserved profile keys");
        }

        let new_user = NewUser {
            email,
            password_hash,
            profile,
        };

        let user = match self.store.insert(new_user).await {
            Ok(user) => user,
            Err(StoreError::Duplicate) => return Err(AuthError::EmailTaken),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create user");
                return Err(AuthError::Internal);
            }
        };

        tracing::info!(user_id = %user.id, "User registered");
        self.respond(user)
    }

    #[tracing::instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let started = Instant::now();
        let result = self.login_inner(request).await;
        let failure = result.as_ref().err().map(AuthError::code);
        let user_id = result.as_ref().ok().map(|r| r.user.id);
        log_auth_event(
            SERVICE_NAME,
            AuthEventKind::Login,
            user_id,
            failure,
            elapsed_ms(started),
        );
        result
    }

    async fn login_inner(&self, request: &LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&request.email);

        let user = match self.store.find_by_email(&email).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => None,
            Err(e) => {
                tracing::error!(error = %e, "Failed to look up user for login");
                return Err(AuthError::Internal);
            }
        };

        let stored_hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.decoy_hash.clone());
        let verified = self.verify(&request.password, stored_hash).await?;

        match user {
            Some(user) if verified => {
                tracing::info!(user_id = %user.id, "User logged in");
                self.respond(user)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    /// Resolve a session token to the user it was issued for.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<UserView, AuthError> {
        let started = Instant::now();
        let result = self.authenticate_inner(token).await;
        if let Err(e) = &result {
            log_auth_event(
                SERVICE_NAME,
                AuthEventKind::TokenCheck,
                None,
                Some(e.code()),
                elapsed_ms(started),
            );
        }
        result
    }

    async fn authenticate_inner(&self, token: &str) -> Result<UserView, AuthError> {
        let claims = self.tokens.verify(token)?;
        let user_id = claims.subject_id().ok_or(AuthError::InvalidCredentials)?;

        match self.store.find_by_id(user_id).await {
            Ok(user) => Ok(UserView::from(user)),
            // The account behind a valid token is gone.
            Err(StoreError::NotFound) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load token subject");
                Err(AuthError::Internal)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_user(&self, id: Uuid) -> Result<UserView, AuthError> {
        match self.store.find_by_id(id).await {
            Ok(user) => Ok(UserView::from(user)),
            Err(StoreError::NotFound) => Err(AuthError::UserNotFound),
            Err(e) => {
                tracing::error!(error = %e, user_id = %id, "Failed to load user");
                Err(AuthError::Internal)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_users(
        &self,
        pagination: &Pagination,
    ) -> Result<PaginatedResult<UserView>, AuthError> {
        let page = self.store.list(pagination).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list users");
            AuthError::Internal
        })?;
        Ok(page.map(UserView::from))
    }

    fn respond(&self, user: User) -> Result<AuthResponse, AuthError> {
        let issued = self.tokens.issue(user.id).map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "Failed to issue session token");
            AuthError::Internal
        })?;

        Ok(AuthResponse {
            user: UserView::from(user),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let plaintext = password.to_owned();

        let hashed = tokio::task::spawn_blocking(move || -> Result<String, HashingError> {
            let hash = hasher.hash(&plaintext)?;
            if hash.is_empty() || hash == plaintext {
                return Err(HashingError::Internal(
                    "hasher returned an unusable hash".to_string(),
                ));
            }
            Ok(hash)
        })
        .await;

        match hashed {
            Ok(Ok(hash)) => Ok(hash),
            Ok(Err(HashingError::TooLong { max })) => Err(AuthError::PasswordTooLong { max }),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Password hashing failed");
                Err(AuthError::Internal)
            }
            Err(e) => {
                tracing::error!(error = %e, "Password hashing task failed");
                Err(AuthError::Internal)
            }
        }
    }

    async fn verify(&self, password: &str, stored_hash: String) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let plaintext = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored_hash))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Password verification task failed");
                AuthError::Internal
            })
    }
}

/// Emails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
