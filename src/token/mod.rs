//! Identity tokens
//!
//! Two token kinds, two verification strategies:
//! - Participant tokens rotate on a fixed interval, are HS256-signed, and
//!   prove freshness without a network round trip per scan.
//! - Stall tokens are printed once and displayed statically, so they carry
//!   no signature; they prove identity by directory lookup alone.
//!
//! `decode_scanned` dispatches a raw scanned string to the right verifier.

pub mod participant;
pub mod stall;

pub use participant::{ParticipantClaims, ParticipantTokenCodec};
pub use stall::{mint_stall_token, parse_stall_token, StallTokenParts, STALL_TOKEN_PREFIX};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of subject a token identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    Student,
    Stall,
}

/// Errors from token decoding and verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Embedded window is older than the acceptance window allows
    #[error("token expired")]
    Expired,

    /// Signature does not match the process secret
    #[error("token signature invalid")]
    BadSignature,

    /// Token could not be parsed at all, or claims are inconsistent
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Embedded window is ahead of the verifier's clock; pre-minted
    /// tokens are rejected outright
    #[error("token window is in the future")]
    FutureWindow,
}

/// Verified identity decoded from a scanned string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedToken {
    /// Signature-verified participant identity
    Participant { subject_id: String },
    /// Parsed stall identity; existence must still be confirmed against
    /// the directory by the caller
    Stall { subject_id: String },
}

impl ScannedToken {
    pub fn subject_id(&self) -> &str {
        match self {
            ScannedToken::Participant { subject_id } => subject_id,
            ScannedToken::Stall { subject_id } => subject_id,
        }
    }
}

/// Classify a scanned string by shape and run the matching verifier.
///
/// Stall tokens are recognized by their printed prefix; everything else is
/// treated as a rotating participant token and must pass signature and
/// window checks.
pub fn decode_scanned(
    codec: &ParticipantTokenCodec,
    token: &str,
    now: DateTime<Utc>,
) -> Result<ScannedToken, TokenError> {
    if stall::looks_like_stall_token(token) {
        let parts = parse_stall_token(token)?;
        return Ok(ScannedToken::Stall {
            subject_id: parts.subject_id,
        });
    }

    let claims = codec.verify(token, now)?;
    Ok(ScannedToken::Participant {
        subject_id: claims.sub,
    })
}
