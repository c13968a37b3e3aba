use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode as jwt_decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::config;

/// Session tokens live exactly seven days from issuance.
pub const TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

/// Claim names a caller may not supply through the identity payload.
const RESERVED_CLAIMS: &[&str] = &["iat", "exp", "nbf", "secret"];

/// Named identity fields; an extra claim with one of these names would shadow it.
const IDENTITY_FIELDS: &[&str] = &["id", "email", "name"];

/// Identity payload signed into a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdentityClaims {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Full claim set carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub identity: IdentityClaims,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    fn new(identity: IdentityClaims, now: DateTime<Utc>) -> Self {
        let exp = (now + Duration::seconds(TOKEN_LIFETIME_SECS)).timestamp();

        Self {
            identity,
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("signing secret is not configured (set JWT_SECRET)")]
    Configuration,
    #[error("claim '{0}' is reserved and cannot be part of the identity payload")]
    ReservedClaim(String),
    #[error("JWT generation error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Sign a session token using the process-wide secret and the current time.
pub fn issue(identity: &IdentityClaims) -> Result<String, IssueError> {
    let secret = config::config()
        .security
        .secret()
        .ok_or(IssueError::Configuration)?;

    issue_at(identity, secret, Utc::now())
}

/// Sign a session token for `identity` as of `now`.
pub fn issue_at(identity: &IdentityClaims, secret: &str, now: DateTime<Utc>) -> Result<String, IssueError> {
    if secret.trim().is_empty() {
        return Err(IssueError::Configuration);
    }

    if let Some(key) = RESERVED_CLAIMS
        .iter()
        .chain(IDENTITY_FIELDS)
        .find(|k| identity.extra.contains_key(**k))
    {
        return Err(IssueError::ReservedClaim((*key).to_string()));
    }

    let claims = SessionClaims::new(identity.clone(), now);
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    Ok(encode(&Header::default(), &claims, &encoding_key)?)
}

/// Verify signature and expiry and return the embedded claims.
pub fn decode(token: &str, secret: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    Ok(jwt_decode::<SessionClaims>(token, &decoding_key, &validation)?.claims)
}

/// Short, non-reversible label for a token, safe to put in logs.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn learner() -> IdentityClaims {
        IdentityClaims::new("64f1c0ffee")
            .with_email("ana@trilha.app")
            .with_name("Ana")
            .with_claim("role", json!("student"))
    }

    #[test]
    fn issued_token_round_trips_payload() {
        let identity = learner();
        let token = issue_at(&identity, SECRET, Utc::now()).unwrap();

        let claims = decode(&token, SECRET).unwrap();
        assert_eq!(claims.identity, identity);
    }

    #[test]
    fn lifetime_is_exactly_seven_days() {
        let token = issue_at(&learner(), SECRET, Utc::now()).unwrap();
        let claims = decode(&token, SECRET).unwrap();
        assert_eq!(claims.exp - claims.iat, 604_800);
    }

    #[test]
    fn different_instants_produce_different_tokens() {
        let now = Utc::now();
        let a = issue_at(&learner(), SECRET, now).unwrap();
        let b = issue_at(&learner(), SECRET, now + Duration::seconds(1)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let err = issue_at(&learner(), "", Utc::now()).unwrap_err();
        assert!(matches!(err, IssueError::Configuration));
    }

    #[test]
    fn payload_cannot_override_expiry() {
        let identity = learner().with_claim("exp", json!(9_999_999_999i64));
        let err = issue_at(&identity, SECRET, Utc::now()).unwrap_err();
        assert!(matches!(err, IssueError::ReservedClaim(ref k) if k == "exp"));
    }

    #[test]
    fn extra_claim_cannot_duplicate_id() {
        let identity = learner().with_claim("id", json!("someone-else"));
        let err = issue_at(&identity, SECRET, Utc::now()).unwrap_err();
        assert!(matches!(err, IssueError::ReservedClaim(ref k) if k == "id"));
    }

    #[test]
    fn extra_claim_cannot_shadow_optional_fields() {
        let identity = IdentityClaims::new("u1").with_claim("email", json!("x@y"));
        let err = issue_at(&identity, SECRET, Utc::now()).unwrap_err();
        assert!(matches!(err, IssueError::ReservedClaim(ref k) if k == "email"));

        let identity = IdentityClaims::new("u1").with_claim("name", json!("Ana"));
        assert!(issue_at(&identity, SECRET, Utc::now()).is_err());
    }

    #[test]
    fn wrong_secret_fails_to_decode() {
        let token = issue_at(&learner(), SECRET, Utc::now()).unwrap();
        assert!(decode(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_fails_to_decode() {
        let issued = Utc::now() - Duration::days(8);
        let token = issue_at(&learner(), SECRET, issued).unwrap();
        assert!(decode(&token, SECRET).is_err());
    }

    #[test]
    fn fingerprint_hides_token() {
        let fp = fingerprint("abc.def.ghi");
        assert_eq!(fp.len(), 8);
        assert_ne!(fp, fingerprint("abc.def.ghj"));
        assert_eq!(fp, fingerprint("abc.def.ghi"));
    }
}
