#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use authcore::test_support::ManualClock;
use authcore::{AuthService, BcryptHasher, MemoryUserStore, TokenIssuer, UserStore};
use authcore_config::MIN_BCRYPT_COST;
use chrono::Utc;
use uuid::Uuid;

pub const TEST_SECRET: &str = "authcore_test_secret_0123456789abcdef";
pub const TOKEN_TTL: Duration = Duration::from_secs(3600);

pub struct TestHarness {
    pub service: AuthService,
    pub store: Arc<MemoryUserStore>,
    pub clock: Arc<ManualClock>,
}

/// Service over an in-memory store, cheap bcrypt and a clock the test controls.
pub fn harness() -> TestHarness {
    authcore_observability::init_test_tracing();

    let store = Arc::new(MemoryUserStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = service_with(store.clone(), clock.clone());
    TestHarness {
        service,
        store,
        clock,
    }
}

pub fn service_with(store: Arc<dyn UserStore>, clock: Arc<ManualClock>) -> AuthService {
    let hasher = Arc::new(BcryptHasher::new(MIN_BCRYPT_COST).expect("valid bcrypt cost"));
    let tokens = TokenIssuer::new(TEST_SECRET.as_bytes(), TOKEN_TTL)
        .expect("valid token issuer")
        .with_clock(clock);
    AuthService::new(store, hasher, tokens).expect("auth service")
}

/// Helper to generate unique test emails
pub fn generate_test_email() -> String {
    format!("test_{}@example.com", Uuid::new_v4())
}
