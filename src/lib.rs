//! Fairgate - attendance and feedback core for expo events
//!
//! Participants carry a rotating QR identity token, gate staff scan it to
//! toggle entry/exit, and participants scan printed stall tokens to leave
//! feedback or cast a one-shot weighted ranking.
//!
//! ## Services
//!
//! - **Token**: rotating signed participant tokens and static stall tokens,
//!   with one dispatch point over both kinds
//! - **Attendance**: toggle-based check-in/out ledger with per-participant
//!   linearization and duration tracking
//! - **Feedback**: once-per-stall reviews with a quota and a presence gate
//! - **Ranking**: write-once, exactly-three-item weighted ranking with
//!   transactional stall tallies
//! - **Directory**: natural-key participant/stall store providing the
//!   per-participant locking primitive
//!
//! HTTP transport, persistent storage, and admin reporting live outside
//! this crate; every operation here returns typed errors and never formats
//! user-facing messages.

pub mod attendance;
pub mod clock;
pub mod config;
pub mod directory;
pub mod feedback;
pub mod ranking;
pub mod token;
pub mod types;

pub use attendance::{AttendanceError, AttendanceLedger, ScanOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Args;
pub use directory::Directory;
pub use feedback::{FeedbackError, FeedbackGate};
pub use ranking::{RankWeights, RankingError, RankingReceipt, RankingService};
pub use token::{
    decode_scanned, mint_stall_token, ParticipantTokenCodec, ScannedToken, TokenError, TokenKind,
};
pub use types::{
    AttendanceRecord, Direction, FeedbackRecord, Participant, RankingEntry, RankingRow, Stall,
};
