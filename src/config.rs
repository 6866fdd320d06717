//! Configuration for the fairgate CLI and services
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};

use crate::attendance::AttendanceLedger;
use crate::feedback::FeedbackGate;
use crate::ranking::{RankWeights, RankingService};
use crate::token::ParticipantTokenCodec;

/// Fairgate - attendance and feedback core for expo events
#[derive(Parser, Debug, Clone)]
#[command(name = "fairgate")]
#[command(about = "Token utility for the fairgate attendance core")]
pub struct Args {
    /// Process-wide secret for signing participant tokens (required)
    #[arg(long, env = "TOKEN_SECRET")]
    pub token_secret: Option<String>,

    /// Seconds after which a participant token's window advances
    #[arg(long, env = "ROTATION_INTERVAL_SECS", default_value = "30")]
    pub rotation_interval_secs: u64,

    /// Prior rotation windows still accepted at verification.
    /// Trades replay tolerance against scan-latency tolerance; keep small.
    #[arg(long, env = "GRACE_WINDOWS", default_value = "1")]
    pub grace_windows: u32,

    /// Maximum feedback submissions per participant
    #[arg(long, env = "FEEDBACK_QUOTA", default_value = "200")]
    pub feedback_quota: u32,

    /// Points per placement for the weighted stall score, as "first,second,third"
    #[arg(long, env = "RANK_WEIGHTS", default_value = "5,3,1")]
    pub rank_weights: String,

    /// Minimum seconds between scans of the same participant (0 disables)
    #[arg(long, env = "SCAN_COOLDOWN_SECS", default_value = "0")]
    pub scan_cooldown_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Mint a rotating token for a participant
    MintParticipant {
        /// Registration number
        registration_no: String,
    },

    /// Verify a scanned participant token
    VerifyParticipant {
        /// The raw token string
        token: String,
    },

    /// Mint the static printed token for a stall
    MintStall {
        /// Stall number
        stall_no: String,
    },

    /// Show seconds until the current rotation window rolls over
    Rotation,
}

impl Args {
    /// Validate configuration before anything runs
    pub fn validate(&self) -> Result<(), String> {
        if self.token_secret.as_deref().unwrap_or("").is_empty() {
            return Err("TOKEN_SECRET must be set".to_string());
        }
        if self.rotation_interval_secs == 0 {
            return Err("ROTATION_INTERVAL_SECS must be at least 1".to_string());
        }
        if self.grace_windows > 10 {
            return Err("GRACE_WINDOWS above 10 defeats token rotation".to_string());
        }
        RankWeights::parse(&self.rank_weights)?;
        Ok(())
    }

    /// Build the participant token codec from this configuration
    pub fn codec(&self) -> ParticipantTokenCodec {
        ParticipantTokenCodec::new(
            self.token_secret.as_deref().unwrap_or(""),
            self.rotation_interval_secs,
            self.grace_windows,
        )
    }

    /// Parsed rank weights. Propagates the parse error so a bad
    /// RANK_WEIGHTS value cannot silently fall back to defaults.
    pub fn parsed_weights(&self) -> Result<RankWeights, String> {
        RankWeights::parse(&self.rank_weights)
    }
}

/// Wire the three services over one directory from parsed configuration
pub fn build_services(
    args: &Args,
    directory: std::sync::Arc<crate::directory::Directory>,
    clock: std::sync::Arc<dyn crate::clock::Clock>,
) -> Result<(AttendanceLedger, FeedbackGate, RankingService), String> {
    let weights = args.parsed_weights()?;
    let ledger = AttendanceLedger::new(directory.clone(), clock.clone())
        .with_cooldown(args.scan_cooldown_secs);
    let gate = FeedbackGate::new(directory.clone(), clock.clone()).with_quota(args.feedback_quota);
    let ranking = RankingService::new(directory, clock).with_weights(weights);
    Ok((ledger, gate, ranking))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["fairgate", "--token-secret", "s3cret", "rotation"])
    }

    #[test]
    fn test_defaults() {
        let args = base_args();
        assert_eq!(args.rotation_interval_secs, 30);
        assert_eq!(args.grace_windows, 1);
        assert_eq!(args.feedback_quota, 200);
        assert_eq!(args.rank_weights, "5,3,1");
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        let args = Args::parse_from(["fairgate", "rotation"]);
        assert!(args.validate().is_err());
    }

    #[tokio::test]
    async fn test_build_services_wires_config() {
        let mut args = base_args();
        args.feedback_quota = 1;
        let directory = std::sync::Arc::new(crate::directory::Directory::new());
        let clock = std::sync::Arc::new(crate::clock::SystemClock);
        let (_ledger, gate, _ranking) = build_services(&args, directory.clone(), clock).unwrap();

        let mut p = crate::types::Participant::new("R-1", "Asha", "North");
        p.inside_event = true;
        directory.register_participant(p);
        directory.register_stall(crate::types::Stall::new("S-1", "Robotics", "North", "Eng"));
        directory.register_stall(crate::types::Stall::new("S-2", "Solar", "North", "Eng"));

        gate.submit("R-1", "S-1", 5, None).await.unwrap();
        assert_eq!(
            gate.submit("R-1", "S-2", 5, None).await.unwrap_err(),
            crate::feedback::FeedbackError::QuotaExceeded(1)
        );
    }

    #[test]
    fn test_bad_weights_fail_validation() {
        let mut args = base_args();
        args.rank_weights = "5,3".to_string();
        assert!(args.validate().is_err());
        assert!(args.parsed_weights().is_err());
    }

    #[test]
    fn test_bad_weights_fail_service_wiring() {
        let mut args = base_args();
        args.rank_weights = "five,3,1".to_string();
        let directory = std::sync::Arc::new(crate::directory::Directory::new());
        let clock = std::sync::Arc::new(crate::clock::SystemClock);
        assert!(build_services(&args, directory, clock).is_err());
    }
}
