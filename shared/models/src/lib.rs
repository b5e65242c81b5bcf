//! Shared data types for the auth core: user records, the caller-facing
//! user view, token claims and pagination.

pub mod auth;
pub mod pagination;

pub use auth::*;
pub use pagination::{PaginatedResult, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
