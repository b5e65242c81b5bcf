// Credential issuance core - library only (no HTTP server)
//
// This crate provides:
// - Email/password registration and login
// - Password hashing (bcrypt or argon2) behind a swappable interface
// - Signed, expiring session tokens (HS256 JWT)
// - A user store interface with in-memory and Postgres implementations

pub mod errors;
pub mod services;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use errors::{AuthError, HashingError, StoreError, TokenError};
pub use services::{
    hasher_for, Argon2Hasher, AuthService, BcryptHasher, CredentialHasher, IssuedToken,
    MemoryUserStore, PgUserStore, TokenIssuer, UserStore,
};

pub use authcore_config::AuthConfig;
pub use authcore_models::{
    AuthResponse, Claims, LoginRequest, NewUser, PaginatedResult, Pagination, Profile,
    RegisterRequest, User, UserView,
};
