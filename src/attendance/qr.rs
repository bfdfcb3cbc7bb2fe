//! Signed check-in tokens

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::config::AttendanceConfig;
use crate::models::activity::{Activity, ActivityKind};
use crate::utils::errors::{TokenError, TokenResult};

/// Claims carried inside a QR check-in token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrClaims {
    pub sub: String,
    pub activity_id: i64,
    pub kind: ActivityKind,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl QrClaims {
    /// Reject a token minted for another activity
    pub fn ensure_matches(&self, activity: &Activity) -> TokenResult<()> {
        if self.activity_id != activity.id || self.kind != activity.kind {
            return Err(TokenError::WrongTarget {
                expected: format!("{}:{}", activity.kind, activity.id),
                actual: format!("{}:{}", self.kind, self.activity_id),
            });
        }
        Ok(())
    }
}

/// A freshly minted token ready to be rendered as a QR code
#[derive(Debug, Clone, Serialize)]
pub struct IssuedQrToken {
    pub token: String,
    pub activity_id: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct QrTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    leeway_seconds: u64,
}

impl std::fmt::Debug for QrTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrTokenService")
            .field("ttl", &self.ttl)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish_non_exhaustive()
    }
}

impl QrTokenService {
    pub fn new(config: &AttendanceConfig) -> Self {
        let secret = config.qr_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(config.qr_token_ttl_seconds as i64),
            leeway_seconds: config.leeway_seconds,
        }
    }

    pub fn issue(&self, activity: &Activity) -> TokenResult<IssuedQrToken> {
        self.issue_at(activity.id, activity.kind, Utc::now())
    }

    pub fn issue_at(&self, activity_id: i64, kind: ActivityKind, now: DateTime<Utc>) -> TokenResult<IssuedQrToken> {
        let expires_at = now + self.ttl;
        let claims = QrClaims {
            sub: format!("{}:{}", kind, activity_id),
            activity_id,
            kind,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedQrToken {
            token,
            activity_id,
            expires_at: Utc.timestamp_opt(claims.exp, 0).single().unwrap_or(expires_at),
        })
    }

    /// Check signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> TokenResult<QrClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<QrClaims>(token.trim(), &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::config::Settings;

    fn service() -> QrTokenService {
        QrTokenService::new(&Settings::default().attendance)
    }

    fn activity(id: i64, kind: ActivityKind) -> Activity {
        let now = Utc::now();
        Activity {
            id,
            kind,
            title: "Leadership Forum".to_string(),
            description: None,
            location: None,
            starts_at: now,
            ends_at: now + Duration::hours(2),
            capacity: None,
            is_active: true,
            created_by: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let svc = service();
        let issued = svc.issue(&activity(12, ActivityKind::Opportunity)).unwrap();
        let claims = svc.verify(&issued.token).unwrap();

        assert_eq!(claims.activity_id, 12);
        assert_eq!(claims.kind, ActivityKind::Opportunity);
        assert_eq!(claims.sub, "opportunity:12");
        assert!(claims.ensure_matches(&activity(12, ActivityKind::Opportunity)).is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let long_ago = Utc::now() - Duration::hours(3);
        let issued = svc.issue_at(3, ActivityKind::Program, long_ago).unwrap();
        assert_matches!(svc.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let mut other = Settings::default().attendance;
        other.qr_secret = "another-secret-another-secret-another".to_string();
        let foreign = QrTokenService::new(&other);

        let issued = foreign.issue(&activity(3, ActivityKind::Program)).unwrap();
        assert_matches!(service().verify(&issued.token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_garbage_rejected() {
        assert_matches!(service().verify("not-a-token"), Err(TokenError::Malformed(_)));
    }

    #[test]
    fn test_token_for_other_activity() {
        let svc = service();
        let issued = svc.issue(&activity(3, ActivityKind::Program)).unwrap();
        let claims = svc.verify(&issued.token).unwrap();

        assert_matches!(
            claims.ensure_matches(&activity(4, ActivityKind::Program)),
            Err(TokenError::WrongTarget { .. })
        );
        assert_matches!(
            claims.ensure_matches(&activity(3, ActivityKind::Opportunity)),
            Err(TokenError::WrongTarget { .. })
        );
    }
}
