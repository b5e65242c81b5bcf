//! User persistence boundary.
//!
//! `UserStore` is the contract the auth core relies on; email uniqueness is
//! the store's job. `MemoryUserStore` is a complete in-process implementation,
//! `PgUserStore` (see `pg_users`) is the Postgres one.

use async_trait::async_trait;
use authcore_models::{NewUser, PaginatedResult, Pagination, User};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::StoreError;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user. Fails with `StoreError::Duplicate` if the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    /// One page of users ordered by creation time, oldest first.
    async fn list(&self, pagination: &Pagination) -> Result<PaginatedResult<User>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
    email_index: DashMap<String, Uuid>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        // The index entry holds its shard lock until the user is stored, so
        // two inserts of one email cannot both pass the vacancy check.
        match self.email_index.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: Uuid::new_v4(),
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                    profile: new_user.profile,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let id = *self.email_index.get(email).ok_or(StoreError::NotFound)?;
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.users
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, pagination: &Pagination) -> Result<PaginatedResult<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = users.len() as i64;
        let items = users
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();

        Ok(PaginatedResult::new(items, total, pagination))
    }
}
