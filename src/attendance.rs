//! Attendance ledger
//!
//! Gate staff never choose between check-in and check-out; the scan
//! direction is inferred from the participant's persisted inside/outside
//! flag and the flag flips in the same atomic unit that records the event.
//! Without that pairing two concurrent scans could both read "outside" and
//! both record an ENTRY, which is exactly the double-count this module
//! exists to prevent.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::directory::Directory;
use crate::types::{AttendanceRecord, Direction};

/// Errors from scan processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttendanceError {
    #[error("participant not found: {0}")]
    ParticipantNotFound(String),

    /// Scan arrived inside the configured cooldown of the previous scan;
    /// only raised when a cooldown is configured
    #[error("scan arrived {elapsed_secs}s after the previous one, cooldown is {cooldown_secs}s")]
    ScanTooSoon {
        elapsed_secs: i64,
        cooldown_secs: u64,
    },
}

/// Result of a processed scan
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub direction: Direction,
    pub record: AttendanceRecord,
}

/// Toggle-based check-in/out state machine over the directory
pub struct AttendanceLedger {
    directory: Arc<Directory>,
    clock: Arc<dyn Clock>,

    /// Minimum seconds between scans of the same participant; 0 disables
    /// the check and mirrors the historical behavior where a double-fired
    /// reader records an EXIT immediately after the ENTRY
    scan_cooldown_secs: u64,
}

impl AttendanceLedger {
    pub fn new(directory: Arc<Directory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory,
            clock,
            scan_cooldown_secs: 0,
        }
    }

    pub fn with_cooldown(mut self, scan_cooldown_secs: u64) -> Self {
        self.scan_cooldown_secs = scan_cooldown_secs;
        self
    }

    /// Process one gate scan: infer direction from the inside flag, flip
    /// the flag, and append the immutable attendance record - all while
    /// holding the participant's guard.
    pub async fn process_scan(
        &self,
        participant_id: &str,
        actor_id: &str,
    ) -> Result<ScanOutcome, AttendanceError> {
        let _guard = self.directory.lock_participant(participant_id).await;

        let participant = self
            .directory
            .find_participant(participant_id)
            .ok_or_else(|| AttendanceError::ParticipantNotFound(participant_id.to_string()))?;

        let now = self.clock.now();

        if self.scan_cooldown_secs > 0 {
            if let Some(previous) = self.directory.last_scan_time(participant_id).await {
                let elapsed = (now - previous).num_seconds();
                if elapsed >= 0 && (elapsed as u64) < self.scan_cooldown_secs {
                    return Err(AttendanceError::ScanTooSoon {
                        elapsed_secs: elapsed,
                        cooldown_secs: self.scan_cooldown_secs,
                    });
                }
            }
        }

        let (direction, duration_secs) = if participant.inside_event {
            let entered = self.directory.last_entry_time(participant_id).await;
            (
                Direction::Exit,
                entered.map(|t| (now - t).num_seconds()),
            )
        } else {
            (Direction::Entry, None)
        };

        // Record insert is the last suspension point; the flag flip stays in
        // the synchronous tail after it. A request dropped at the insert
        // leaves the flag untouched, never a flipped flag with no record.
        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            participant_id: participant_id.to_string(),
            scanned_by: actor_id.to_string(),
            direction,
            timestamp: now,
            duration_secs,
        };
        self.directory.push_attendance(record.clone()).await;

        self.directory.update_participant(participant_id, |p| {
            p.inside_event = direction == Direction::Entry;
        });

        info!(
            participant = %participant_id,
            scanned_by = %actor_id,
            %direction,
            duration_secs = ?duration_secs,
            "processed gate scan"
        );

        Ok(ScanOutcome { direction, record })
    }
}
