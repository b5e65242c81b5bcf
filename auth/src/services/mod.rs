pub mod local_auth;
pub mod password;
pub mod pg_users;
pub mod tokens;
pub mod users;

pub use local_auth::{normalize_email, AuthService};
pub use password::{
    hasher_for, Argon2Hasher, BcryptHasher, CredentialHasher, BCRYPT_MAX_PASSWORD_LEN,
};
pub use pg_users::PgUserStore;
pub use tokens::{IssuedToken, TokenIssuer};
pub use users::{MemoryUserStore, UserStore};
