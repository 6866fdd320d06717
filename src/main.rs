//! Fairgate CLI - mint and verify event tokens from the command line

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fairgate::clock::{Clock, SystemClock};
use fairgate::config::{Args, Command};
use fairgate::token::{self, TokenError};

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fairgate={log_level},info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let codec = args.codec();
    let clock = SystemClock;
    let now = clock.now();

    match &args.command {
        Command::MintParticipant { registration_no } => {
            let token = codec
                .generate(registration_no, now)
                .map_err(|e| anyhow::anyhow!("mint failed: {e}"))?;
            println!("{token}");
            println!(
                "rotates in {}s",
                codec.seconds_until_rotation(now)
            );
        }
        Command::VerifyParticipant { token } => match codec.verify(token, now) {
            Ok(claims) => {
                println!("{}", serde_json::to_string_pretty(&claims)?);
            }
            Err(TokenError::Expired) => {
                println!("invalid: expired");
                std::process::exit(2);
            }
            Err(e) => {
                println!("invalid: {e}");
                std::process::exit(2);
            }
        },
        Command::MintStall { stall_no } => {
            println!("{}", token::mint_stall_token(stall_no, now));
        }
        Command::Rotation => {
            println!("{}", codec.seconds_until_rotation(now));
        }
    }

    Ok(())
}
