//! Static stall tokens
//!
//! Stall codes are printed once and taped to a table, so rotation buys
//! nothing: the token only has to say *which* stall, not *when*. The format
//! is a plain delimited string - prefix, stall number, mint timestamp,
//! random suffix - and verification is a directory existence lookup done by
//! the caller, not a signature check here.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::TokenError;

pub const STALL_TOKEN_PREFIX: &str = "STALL";

const SUFFIX_LEN: usize = 6;

/// Fields parsed out of a printed stall token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallTokenParts {
    /// Stall number to resolve against the directory
    pub subject_id: String,

    /// Millisecond timestamp the code was minted at
    pub minted_at_ms: i64,

    /// Random disambiguation suffix
    pub suffix: String,
}

/// Quick shape check used to route a scanned string to the right verifier
pub fn looks_like_stall_token(token: &str) -> bool {
    token.starts_with(&format!("{STALL_TOKEN_PREFIX}_"))
}

/// Mint a printable stall token: `STALL_{stall_no}_{epoch_ms}_{random6}`
pub fn mint_stall_token(subject_id: &str, now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!(
        "{STALL_TOKEN_PREFIX}_{subject_id}_{}_{suffix}",
        now.timestamp_millis()
    )
}

/// Parse a stall token back into its parts.
///
/// The stall number may itself contain underscores, so the timestamp and
/// suffix are split off the right-hand end.
pub fn parse_stall_token(token: &str) -> Result<StallTokenParts, TokenError> {
    let rest = token
        .strip_prefix(&format!("{STALL_TOKEN_PREFIX}_"))
        .ok_or_else(|| TokenError::Malformed("missing stall prefix".to_string()))?;

    let mut fields = rest.rsplitn(3, '_');
    let suffix = fields
        .next()
        .filter(|s| s.len() == SUFFIX_LEN && s.chars().all(|c| c.is_ascii_alphanumeric()))
        .ok_or_else(|| TokenError::Malformed("bad stall token suffix".to_string()))?;
    let minted_at_ms = fields
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| TokenError::Malformed("bad stall token timestamp".to_string()))?;
    let subject_id = fields
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TokenError::Malformed("empty stall number".to_string()))?;

    Ok(StallTokenParts {
        subject_id: subject_id.to_string(),
        minted_at_ms,
        suffix: suffix.to_string(),
    })
}
