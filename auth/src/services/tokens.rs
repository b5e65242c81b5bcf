//! Session token issuance and verification (HS256 JWT).
//!
//! Expiry is checked against the issuer's `Clock` rather than inside
//! `jsonwebtoken`, so `Expired` is only ever reported for a token whose
//! signature, issuer and audience are already known to be good.

use std::sync::Arc;

use authcore_config::{AuthConfig, MAX_TOKEN_TTL_SECS};
use authcore_models::Claims;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mockable::{Clock, DefaultClock};
use uuid::Uuid;

use crate::errors::TokenError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    leeway: Duration,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .field("leeway", &self.leeway)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: std::time::Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Signing("signing secret is empty".to_string()));
        }
        let ttl = to_chrono(ttl)?;
        if ttl <= Duration::zero() {
            return Err(TokenError::Signing("token lifetime must be positive".to_string()));
        }
        if ttl > max_window() {
            return Err(TokenError::Signing(format!(
                "token lifetime must be at most {} seconds",
                MAX_TOKEN_TTL_SECS
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
            leeway: Duration::zero(),
            issuer: authcore_config::DEFAULT_ISSUER.to_string(),
            audience: authcore_config::DEFAULT_AUDIENCE.to_string(),
            clock: Arc::new(DefaultClock),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        Ok(Self::new(config.jwt_secret.expose(), config.token_ttl)?
            .with_issuer(config.issuer.clone())
            .with_audience(config.audience.clone())
            .with_leeway(config.leeway)?)
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn with_leeway(mut self, leeway: std::time::Duration) -> Result<Self, TokenError> {
        let leeway = to_chrono(leeway)?;
        if leeway > max_window() {
            return Err(TokenError::Signing(format!(
                "leeway must be at most {} seconds",
                MAX_TOKEN_TTL_SECS
            )));
        }
        self.leeway = leeway;
        Ok(self)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a fresh token for `subject_id`.
    pub fn issue(&self, subject_id: Uuid) -> Result<IssuedToken, TokenError> {
        let now = self.clock.utc();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".to_string()))?;

        let claims = Claims {
            sub: subject_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        // Report the second-truncated expiry that is actually inside the token.
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            TokenError::Invalid
        })?;
        let claims = data.claims;

        if claims.subject_id().is_none() {
            tracing::debug!("Token subject is not a user id");
            return Err(TokenError::Invalid);
        }

        let now = self.clock.utc().timestamp();
        if now > claims.exp.saturating_add(self.leeway.num_seconds()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn max_window() -> Duration {
    Duration::seconds(MAX_TOKEN_TTL_SECS as i64)
}

fn to_chrono(duration: std::time::Duration) -> Result<Duration, TokenError> {
    Duration::from_std(duration).map_err(|e| TokenError::Signing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ManualClock;
    use std::time::Duration as StdDuration;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    const TTL: StdDuration = StdDuration::from_secs(3600);

    fn issuer_at(clock: Arc<ManualClock>) -> TokenIssuer {
        TokenIssuer::new(SECRET, TTL).unwrap().with_clock(clock)
    }

    #[test]
    fn test_issue_then_verify() {
        let issuer = TokenIssuer::new(SECRET, TTL).unwrap();
        let user_id = Uuid::new_v4();

        let issued = issuer.issue(user_id).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();

        assert_eq!(claims.subject_id(), Some(user_id));
        assert_eq!(claims.iss, authcore_config::DEFAULT_ISSUER);
        assert_eq!(claims.aud, authcore_config::DEFAULT_AUDIENCE);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expiry_window() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let issuer = issuer_at(clock.clone());
        let issued = issuer.issue(Uuid::new_v4()).unwrap();

        clock.set(start + Duration::seconds(1));
        assert!(issuer.verify(&issued.token).is_ok());

        clock.set(start + Duration::seconds(3600));
        assert!(issuer.verify(&issued.token).is_ok());

        clock.set(start + Duration::seconds(3601));
        assert_eq!(issuer.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_leeway_extends_validity() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let issuer = issuer_at(clock.clone())
            .with_leeway(StdDuration::from_secs(30))
            .unwrap();
        let issued = issuer.issue(Uuid::new_v4()).unwrap();

        clock.set(start + Duration::seconds(3620));
        assert!(issuer.verify(&issued.token).is_ok());

        clock.set(start + Duration::seconds(3640));
        assert_eq!(issuer.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let issuer = TokenIssuer::new(SECRET, TTL).unwrap();
        let issued = issuer.issue(Uuid::new_v4()).unwrap();

        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();
        let other = issuer.issue(Uuid::new_v4()).unwrap();
        parts[1] = other.token.split('.').nth(1).unwrap().to_string();
        let forged = parts.join(".");

        assert_eq!(issuer.verify(&forged), Err(TokenError::Invalid));
        assert_eq!(issuer.verify("not-a-token"), Err(TokenError::Invalid));
        assert_eq!(issuer.verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = TokenIssuer::new(SECRET, TTL).unwrap();
        let other = TokenIssuer::new(b"another-secret-another-secret-xx", TTL).unwrap();
        let issued = other.issue(Uuid::new_v4()).unwrap();

        assert_eq!(issuer.verify(&issued.token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_forgery_is_invalid_not_expired() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let other = TokenIssuer::new(b"another-secret-another-secret-xx", TTL)
            .unwrap()
            .with_clock(clock.clone());
        let issuer = issuer_at(clock.clone());
        let issued = other.issue(Uuid::new_v4()).unwrap();

        clock.advance(Duration::days(2));
        assert_eq!(issuer.verify(&issued.token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_issuer_and_audience_are_checked() {
        let issuer = TokenIssuer::new(SECRET, TTL).unwrap();
        let foreign_iss = TokenIssuer::new(SECRET, TTL).unwrap().with_issuer("someone-else");
        let foreign_aud = TokenIssuer::new(SECRET, TTL).unwrap().with_audience("other-app");

        let token = foreign_iss.issue(Uuid::new_v4()).unwrap().token;
        assert_eq!(issuer.verify(&token), Err(TokenError::Invalid));

        let token = foreign_aud.issue(Uuid::new_v4()).unwrap().token;
        assert_eq!(issuer.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_non_uuid_subject_is_invalid() {
        let now = Utc::now();
        let claims = Claims {
            sub: "auth0|123".to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + 60,
            iss: authcore_config::DEFAULT_ISSUER.to_string(),
            aud: authcore_config::DEFAULT_AUDIENCE.to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let issuer = TokenIssuer::new(SECRET, TTL).unwrap();
        assert_eq!(issuer.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_each_token_is_unique() {
        let issuer = TokenIssuer::new(SECRET, TTL).unwrap();
        let user_id = Uuid::new_v4();
        let first = issuer.issue(user_id).unwrap();
        let second = issuer.issue(user_id).unwrap();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_constructor_rejects_bad_input() {
        assert!(TokenIssuer::new(b"", TTL).is_err());
        assert!(TokenIssuer::new(SECRET, StdDuration::ZERO).is_err());
        assert!(TokenIssuer::new(SECRET, StdDuration::from_secs(10_000_000_000_000)).is_err());
        assert!(TokenIssuer::new(SECRET, TTL)
            .unwrap()
            .with_leeway(StdDuration::from_secs(10_000_000_000_000))
            .is_err());
    }

    #[test]
    fn test_expiry_past_the_calendar_is_an_error() {
        let clock = Arc::new(ManualClock::new(DateTime::<Utc>::MAX_UTC - Duration::seconds(10)));
        let issuer = issuer_at(clock);

        assert!(matches!(
            issuer.issue(Uuid::new_v4()),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let mut config = AuthConfig::new("0123456789abcdef0123456789abcdef");
        config.issuer = "accounts".to_string();
        config.audience = "web".to_string();

        let issuer = TokenIssuer::from_config(&config).unwrap();
        let claims = issuer.verify(&issuer.issue(Uuid::new_v4()).unwrap().token).unwrap();
        assert_eq!(claims.iss, "accounts");
        assert_eq!(claims.aud, "web");
    }
}
