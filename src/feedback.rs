//! Feedback gate
//!
//! One review per (participant, stall), a per-participant quota, and a
//! presence requirement: feedback only counts from someone actually inside
//! the venue. The record insert and both derived counters move together
//! under the participant's guard.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::directory::Directory;
use crate::types::FeedbackRecord;

pub const DEFAULT_FEEDBACK_QUOTA: u32 = 200;

/// Errors from feedback submission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
    #[error("rating {0} is out of range 1..=5")]
    OutOfRange(u8),

    #[error("participant not found: {0}")]
    ParticipantNotFound(String),

    #[error("stall not found: {0}")]
    StallNotFound(String),

    /// Participant is not currently inside the event
    #[error("participant is not checked in")]
    NotCheckedIn,

    #[error("stall already reviewed by this participant")]
    AlreadyReviewed,

    #[error("feedback quota of {0} reached")]
    QuotaExceeded(u32),
}

/// Validates and commits feedback submissions
pub struct FeedbackGate {
    directory: Arc<Directory>,
    clock: Arc<dyn Clock>,
    quota: u32,
}

impl FeedbackGate {
    pub fn new(directory: Arc<Directory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory,
            clock,
            quota: DEFAULT_FEEDBACK_QUOTA,
        }
    }

    pub fn with_quota(mut self, quota: u32) -> Self {
        self.quota = quota;
        self
    }

    /// Submit one piece of feedback. All checks run before any write, so a
    /// rejection leaves the store untouched.
    pub async fn submit(
        &self,
        participant_id: &str,
        stall_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> Result<FeedbackRecord, FeedbackError> {
        if !(1..=5).contains(&rating) {
            return Err(FeedbackError::OutOfRange(rating));
        }

        let _guard = self.directory.lock_participant(participant_id).await;

        let participant = self
            .directory
            .find_participant(participant_id)
            .ok_or_else(|| FeedbackError::ParticipantNotFound(participant_id.to_string()))?;

        let stall = self
            .directory
            .find_stall(stall_id)
            .filter(|s| !s.revoked)
            .ok_or_else(|| FeedbackError::StallNotFound(stall_id.to_string()))?;

        // Duplicate check first: re-submitting for a stall you already
        // reviewed reports AlreadyReviewed even after you have left.
        if self.directory.has_feedback(participant_id, stall_id).await {
            return Err(FeedbackError::AlreadyReviewed);
        }
        if !participant.inside_event {
            return Err(FeedbackError::NotCheckedIn);
        }
        if participant.feedback_count >= self.quota {
            return Err(FeedbackError::QuotaExceeded(self.quota));
        }

        let record = FeedbackRecord {
            id: Uuid::new_v4(),
            participant_id: participant_id.to_string(),
            stall_id: stall_id.to_string(),
            rating,
            comment,
            submitted_at: self.clock.now(),
        };
        self.directory.push_feedback(record.clone()).await;
        self.directory
            .update_participant(participant_id, |p| p.feedback_count += 1);
        self.directory
            .update_stall(&stall.stall_no, |s| s.feedback_count += 1);

        info!(
            participant = %participant_id,
            stall = %stall_id,
            rating,
            "feedback submitted"
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{Participant, Stall};

    fn setup() -> (FeedbackGate, Arc<Directory>) {
        let directory = Arc::new(Directory::new());
        let clock = Arc::new(ManualClock::at_epoch_secs(1_700_000_000));

        let mut participant = Participant::new("R-1001", "Asha", "North");
        participant.inside_event = true;
        directory.register_participant(participant);
        directory.register_stall(Stall::new("S-1", "Robotics", "North", "Engineering"));

        let gate = FeedbackGate::new(directory.clone(), clock);
        (gate, directory)
    }

    #[tokio::test]
    async fn test_submit_bumps_both_counters() {
        let (gate, directory) = setup();

        let record = gate
            .submit("R-1001", "S-1", 4, Some("great demo".to_string()))
            .await
            .unwrap();
        assert_eq!(record.rating, 4);

        assert_eq!(directory.find_participant("R-1001").unwrap().feedback_count, 1);
        assert_eq!(directory.find_stall("S-1").unwrap().feedback_count, 1);
        assert_eq!(directory.feedback_for_stall("S-1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_second_review_rejected() {
        let (gate, directory) = setup();

        gate.submit("R-1001", "S-1", 5, None).await.unwrap();
        let err = gate.submit("R-1001", "S-1", 3, None).await.unwrap_err();
        assert_eq!(err, FeedbackError::AlreadyReviewed);

        // Counters unchanged by the rejected attempt
        assert_eq!(directory.find_participant("R-1001").unwrap().feedback_count, 1);
        assert_eq!(directory.find_stall("S-1").unwrap().feedback_count, 1);
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let (gate, _directory) = setup();
        assert_eq!(
            gate.submit("R-1001", "S-1", 0, None).await.unwrap_err(),
            FeedbackError::OutOfRange(0)
        );
        assert_eq!(
            gate.submit("R-1001", "S-1", 6, None).await.unwrap_err(),
            FeedbackError::OutOfRange(6)
        );
    }

    #[tokio::test]
    async fn test_requires_checked_in() {
        let (gate, directory) = setup();
        directory.update_participant("R-1001", |p| p.inside_event = false);

        assert_eq!(
            gate.submit("R-1001", "S-1", 4, None).await.unwrap_err(),
            FeedbackError::NotCheckedIn
        );
    }

    #[tokio::test]
    async fn test_unknown_stall_and_participant() {
        let (gate, _directory) = setup();
        assert_eq!(
            gate.submit("ghost", "S-1", 4, None).await.unwrap_err(),
            FeedbackError::ParticipantNotFound("ghost".to_string())
        );
        assert_eq!(
            gate.submit("R-1001", "S-99", 4, None).await.unwrap_err(),
            FeedbackError::StallNotFound("S-99".to_string())
        );
    }

    #[tokio::test]
    async fn test_revoked_stall_rejected() {
        let (gate, directory) = setup();
        directory.update_stall("S-1", |s| s.revoked = true);

        assert_eq!(
            gate.submit("R-1001", "S-1", 4, None).await.unwrap_err(),
            FeedbackError::StallNotFound("S-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_quota() {
        let (_gate, directory) = setup();
        let gate = FeedbackGate::new(directory.clone(), Arc::new(ManualClock::at_epoch_secs(0)))
            .with_quota(2);
        directory.register_stall(Stall::new("S-2", "Solar", "North", "Engineering"));
        directory.register_stall(Stall::new("S-3", "Hydro", "North", "Engineering"));

        gate.submit("R-1001", "S-1", 4, None).await.unwrap();
        gate.submit("R-1001", "S-2", 4, None).await.unwrap();
        assert_eq!(
            gate.submit("R-1001", "S-3", 4, None).await.unwrap_err(),
            FeedbackError::QuotaExceeded(2)
        );
    }
}
