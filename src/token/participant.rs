//! Rotating participant tokens
//!
//! A participant's QR code re-mints itself every rotation interval. The
//! token is an HS256 JWT whose claims carry the registration number, the
//! rotation window it was minted in, and a short nonce. Verification accepts
//! the current window plus a small number of prior windows (grace) to absorb
//! clock skew and scan latency, and rejects future windows to shut down
//! pre-minting.

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TokenError, TokenKind};

const NONCE_LEN: usize = 8;

/// Claims embedded in a rotating participant token.
///
/// Only the stable natural key rides along; profile data stays in the
/// directory so token length does not vary with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantClaims {
    /// Registration number of the participant
    pub sub: String,

    /// Rotation window the token was minted in: floor(epoch / interval)
    pub win: i64,

    /// Short random nonce so two tokens minted in one window differ
    pub nce: String,

    /// Token kind tag; a stall claim smuggled into a signed token is
    /// rejected as malformed
    pub knd: TokenKind,
}

/// Signs and verifies rotating participant tokens
pub struct ParticipantTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    rotation_interval_secs: i64,
    grace_windows: i64,
}

impl ParticipantTokenCodec {
    /// Build a codec over the process-wide secret. Rotating the secret
    /// invalidates every outstanding token; holders self-heal within one
    /// rotation interval once the new secret is distributed.
    pub fn new(secret: &str, rotation_interval_secs: u64, grace_windows: u32) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            rotation_interval_secs: rotation_interval_secs.max(1) as i64,
            grace_windows: grace_windows as i64,
        }
    }

    /// Rotation window a given instant falls into
    pub fn window_at(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.rotation_interval_secs)
    }

    /// Seconds until the current window rolls over. Advisory only - tells
    /// a presenting device when to re-mint, not a security boundary.
    pub fn seconds_until_rotation(&self, now: DateTime<Utc>) -> u64 {
        let into_window = now.timestamp().rem_euclid(self.rotation_interval_secs);
        (self.rotation_interval_secs - into_window) as u64
    }

    /// Mint a signed token for the current rotation window
    pub fn generate(&self, subject_id: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();

        let claims = ParticipantClaims {
            sub: subject_id.to_string(),
            win: self.window_at(now),
            nce: nonce,
            knd: TokenKind::Student,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Verify signature and rotation window, returning the claims.
    ///
    /// Accepts windows in `[current - grace, current]`. Fails closed: any
    /// parse or signature problem yields a typed error, never a panic.
    pub fn verify(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ParticipantClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<ParticipantClaims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed(e.to_string()),
            },
        )?;

        let claims = data.claims;
        if claims.knd != TokenKind::Student {
            return Err(TokenError::Malformed("wrong token kind".to_string()));
        }

        let current = self.window_at(now);
        if claims.win > current {
            debug!(
                subject = %claims.sub,
                window = claims.win,
                current,
                "rejected future-window token"
            );
            return Err(TokenError::FutureWindow);
        }
        if claims.win < current - self.grace_windows {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const INTERVAL: u64 = 30;

    fn codec() -> ParticipantTokenCodec {
        ParticipantTokenCodec::new("unit-test-secret", INTERVAL, 1)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_roundtrip_returns_subject() {
        let codec = codec();
        let now = at(1_700_000_000);
        let token = codec.generate("R-1001", now).unwrap();

        let claims = codec.verify(&token, now).unwrap();
        assert_eq!(claims.sub, "R-1001");
        assert_eq!(claims.win, codec.window_at(now));
    }

    #[test]
    fn test_token_length_is_stable() {
        let codec = codec();
        let now = at(1_700_000_000);
        let short = codec.generate("R-1", now).unwrap();
        let long = codec.generate("R-99999999", now).unwrap();

        // Only the natural key varies; the token stays compact either way.
        assert!(short.len() < 250);
        assert!((long.len() as i64 - short.len() as i64).abs() < 20);
    }

    #[test]
    fn test_accepts_within_grace_window() {
        let codec = codec();
        let minted = at(1_700_000_000);
        let token = codec.generate("R-1001", minted).unwrap();

        // Same window
        assert!(codec.verify(&token, minted).is_ok());
        // One window later - inside the default grace of 1
        assert!(codec
            .verify(&token, at(1_700_000_000 + INTERVAL as i64))
            .is_ok());
        // Two windows later - expired
        assert_eq!(
            codec
                .verify(&token, at(1_700_000_000 + 2 * INTERVAL as i64 + 5))
                .unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_rejects_future_window() {
        let codec = codec();
        let token = codec.generate("R-1001", at(1_700_000_060)).unwrap();

        assert_eq!(
            codec.verify(&token, at(1_700_000_000)).unwrap_err(),
            TokenError::FutureWindow
        );
    }

    #[test]
    fn test_rejects_tampered_signature() {
        let codec = codec();
        let other = ParticipantTokenCodec::new("different-secret", INTERVAL, 1);
        let now = at(1_700_000_000);
        let token = other.generate("R-1001", now).unwrap();

        assert_eq!(
            codec.verify(&token, now).unwrap_err(),
            TokenError::BadSignature
        );
    }

    #[test]
    fn test_rejects_garbage() {
        let codec = codec();
        let err = codec.verify("abc.def.ghi", at(1_700_000_000)).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn test_seconds_until_rotation() {
        let codec = codec();
        // 1_699_999_990 is 10s into the window starting at 1_699_999_980
        assert_eq!(codec.seconds_until_rotation(at(1_699_999_990)), 20);
        // On the boundary a full window remains
        assert_eq!(codec.seconds_until_rotation(at(1_699_999_980)), 30);
    }

    #[test]
    fn test_claim_wire_shape_is_stable() {
        let claims = ParticipantClaims {
            sub: "R-1001".to_string(),
            win: 42,
            nce: "a1b2c3d4".to_string(),
            knd: TokenKind::Student,
        };

        // Claim names are part of the token wire format; renaming a field
        // would orphan every outstanding token.
        let json: serde_json::Value = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "R-1001");
        assert_eq!(json["win"], 42);
        assert_eq!(json["nce"], "a1b2c3d4");
        assert_eq!(json["knd"], "STUDENT");
    }

    #[test]
    fn test_wider_grace_is_honored() {
        let codec = ParticipantTokenCodec::new("unit-test-secret", INTERVAL, 3);
        let minted = at(1_700_000_000);
        let token = codec.generate("R-1001", minted).unwrap();

        assert!(codec
            .verify(&token, at(1_700_000_000 + 3 * INTERVAL as i64))
            .is_ok());
        assert_eq!(
            codec
                .verify(&token, at(1_700_000_000 + 4 * INTERVAL as i64 + 1))
                .unwrap_err(),
            TokenError::Expired
        );
    }
}
