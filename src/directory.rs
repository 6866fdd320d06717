//! Identity directory and per-participant locking
//!
//! Reference in-memory store standing in for the persisted backing store.
//! Participants and stalls are keyed by natural key, the way tokens carry
//! them. The lock registry is the linearization primitive: every mutation of
//! a participant's contended state (inside flag, ranking flag, counters tied
//! to that participant's action) happens while the caller holds that
//! participant's guard, so two concurrent requests against the same
//! participant observe a strict before/after ordering while different
//! participants never block each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::types::{
    AttendanceRecord, Direction, FeedbackRecord, Participant, RankingRow, Stall,
};

/// In-memory participant/stall directory plus event record tables
#[derive(Default)]
pub struct Directory {
    participants: DashMap<String, Participant>,
    stalls: DashMap<String, Stall>,

    attendance: RwLock<Vec<AttendanceRecord>>,
    feedback: RwLock<Vec<FeedbackRecord>>,
    rankings: RwLock<Vec<RankingRow>>,

    /// One mutex per participant, created lazily on first lock
    participant_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------
    // Registration and lookup
    // -------------------------------------------------------------------

    pub fn register_participant(&self, participant: Participant) {
        debug!(registration_no = %participant.registration_no, "registered participant");
        self.participants
            .insert(participant.registration_no.clone(), participant);
    }

    pub fn register_stall(&self, stall: Stall) {
        debug!(stall_no = %stall.stall_no, "registered stall");
        self.stalls.insert(stall.stall_no.clone(), stall);
    }

    /// Look up a participant by registration number
    pub fn find_participant(&self, registration_no: &str) -> Option<Participant> {
        self.participants.get(registration_no).map(|p| p.clone())
    }

    /// Look up a stall by stall number
    pub fn find_stall(&self, stall_no: &str) -> Option<Stall> {
        self.stalls.get(stall_no).map(|s| s.clone())
    }

    /// Resolve a printed stall token in one step: parse the delimited
    /// string, then confirm the stall exists and is not revoked. This is
    /// the whole verification for stall tokens - they carry no signature.
    pub fn verify_stall_token(&self, token: &str) -> Result<Stall, crate::token::TokenError> {
        let parts = crate::token::parse_stall_token(token)?;
        self.find_stall(&parts.subject_id)
            .filter(|s| !s.revoked)
            .ok_or_else(|| {
                crate::token::TokenError::Malformed(format!(
                    "unknown or revoked stall: {}",
                    parts.subject_id
                ))
            })
    }

    // -------------------------------------------------------------------
    // Locking
    // -------------------------------------------------------------------

    /// Acquire the exclusive guard for one participant. Holding the guard
    /// is what makes a read-modify-write sequence atomic with respect to
    /// other requests for the same participant.
    pub async fn lock_participant(&self, registration_no: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .participant_locks
            .entry(registration_no.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    // -------------------------------------------------------------------
    // Mutation helpers - call only while holding the relevant guard
    // -------------------------------------------------------------------

    /// Apply a mutation to a participant in place. Returns false if the
    /// participant does not exist.
    pub fn update_participant<F>(&self, registration_no: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Participant),
    {
        match self.participants.get_mut(registration_no) {
            Some(mut p) => {
                mutate(&mut p);
                true
            }
            None => false,
        }
    }

    /// Apply a mutation to a stall in place. The DashMap entry guard
    /// serializes concurrent tally bumps on the same stall.
    pub fn update_stall<F>(&self, stall_no: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Stall),
    {
        match self.stalls.get_mut(stall_no) {
            Some(mut s) => {
                mutate(&mut s);
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------
    // Attendance records
    // -------------------------------------------------------------------

    pub async fn push_attendance(&self, record: AttendanceRecord) {
        self.attendance.write().await.push(record);
    }

    /// Timestamp of the most recent ENTRY record for a participant
    pub async fn last_entry_time(
        &self,
        registration_no: &str,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        self.attendance
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.participant_id == registration_no && r.direction == Direction::Entry)
            .map(|r| r.timestamp)
    }

    /// Timestamp of the most recent scan of any direction for a participant
    pub async fn last_scan_time(
        &self,
        registration_no: &str,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        self.attendance
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.participant_id == registration_no)
            .map(|r| r.timestamp)
    }

    pub async fn attendance_for(&self, registration_no: &str) -> Vec<AttendanceRecord> {
        self.attendance
            .read()
            .await
            .iter()
            .filter(|r| r.participant_id == registration_no)
            .cloned()
            .collect()
    }

    // -------------------------------------------------------------------
    // Feedback records
    // -------------------------------------------------------------------

    pub async fn push_feedback(&self, record: FeedbackRecord) {
        self.feedback.write().await.push(record);
    }

    /// Whether this participant already reviewed this stall
    pub async fn has_feedback(&self, registration_no: &str, stall_no: &str) -> bool {
        self.feedback
            .read()
            .await
            .iter()
            .any(|r| r.participant_id == registration_no && r.stall_id == stall_no)
    }

    pub async fn feedback_for_stall(&self, stall_no: &str) -> Vec<FeedbackRecord> {
        self.feedback
            .read()
            .await
            .iter()
            .filter(|r| r.stall_id == stall_no)
            .cloned()
            .collect()
    }

    // -------------------------------------------------------------------
    // Ranking rows
    // -------------------------------------------------------------------

    pub async fn push_rankings(&self, rows: [RankingRow; 3]) {
        self.rankings.write().await.extend(rows);
    }

    pub async fn rankings_for(&self, registration_no: &str) -> Vec<RankingRow> {
        self.rankings
            .read()
            .await
            .iter()
            .filter(|r| r.participant_id == registration_no)
            .cloned()
            .collect()
    }
}
