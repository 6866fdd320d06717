//! One-shot weighted ranking
//!
//! Each participant ranks exactly three stalls, once, within their own
//! school. The submission is write-once: the completed flag is re-checked
//! under the participant's guard so two concurrent submissions cannot both
//! pass the check. Every validation runs before the first write, so a
//! failed submission never leaves a partial tally behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::clock::Clock;
use crate::directory::Directory;
use crate::types::{RankingEntry, RankingRow, Stall};

/// Points awarded per placement when recomputing a stall's weighted score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankWeights {
    pub first: u32,
    pub second: u32,
    pub third: u32,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            first: 5,
            second: 3,
            third: 1,
        }
    }
}

impl RankWeights {
    /// Parse a `"5,3,1"` style triple, as carried by configuration
    pub fn parse(raw: &str) -> Result<Self, String> {
        let parts: Vec<u32> = raw
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid rank weights '{raw}': {e}"))?;
        match parts.as_slice() {
            [first, second, third] => Ok(Self {
                first: *first,
                second: *second,
                third: *third,
            }),
            _ => Err(format!("rank weights '{raw}' must have three components")),
        }
    }

    /// Weighted score derived from a stall's vote counters
    pub fn score(&self, stall: &Stall) -> u32 {
        self.first * stall.rank_1_votes
            + self.second * stall.rank_2_votes
            + self.third * stall.rank_3_votes
    }
}

/// Errors from ranking submission
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("participant not found: {0}")]
    ParticipantNotFound(String),

    /// The participant's ranking is write-once and already committed
    #[error("ranking already submitted")]
    AlreadySubmitted,

    #[error("ranks must be exactly the set {{1, 2, 3}}")]
    InvalidRankSet,

    #[error("ranked stalls must be pairwise distinct")]
    DuplicateStall,

    /// Participants may only rank stalls of their own school
    #[error("stall {0} belongs to another school")]
    CrossSchoolStall(String),

    #[error("stall not found: {0}")]
    StallNotFound(String),
}

/// Committed ranking summary returned to the caller
#[derive(Debug, Clone)]
pub struct RankingReceipt {
    pub participant_id: String,
    /// Category recorded on the participant, taken from the rank-1 stall
    pub category: String,
    pub rows: [RankingRow; 3],
    pub submitted_at: DateTime<Utc>,
}

/// Validates and commits one-shot ranking submissions
pub struct RankingService {
    directory: Arc<Directory>,
    clock: Arc<dyn Clock>,
    weights: RankWeights,
}

impl RankingService {
    pub fn new(directory: Arc<Directory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory,
            clock,
            weights: RankWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: RankWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Submit a participant's ranking. Exactly three entries are enforced
    /// by the parameter type; everything else is validated here before any
    /// write happens.
    pub async fn submit(
        &self,
        participant_id: &str,
        entries: [RankingEntry; 3],
    ) -> Result<RankingReceipt, RankingError> {
        let mut ranks: Vec<u8> = entries.iter().map(|e| e.rank).collect();
        ranks.sort_unstable();
        if ranks != [1, 2, 3] {
            return Err(RankingError::InvalidRankSet);
        }

        if entries[0].stall_id == entries[1].stall_id
            || entries[0].stall_id == entries[2].stall_id
            || entries[1].stall_id == entries[2].stall_id
        {
            return Err(RankingError::DuplicateStall);
        }

        let _guard = self.directory.lock_participant(participant_id).await;

        let participant = self
            .directory
            .find_participant(participant_id)
            .ok_or_else(|| RankingError::ParticipantNotFound(participant_id.to_string()))?;

        if participant.has_completed_ranking {
            return Err(RankingError::AlreadySubmitted);
        }

        let mut stalls = Vec::with_capacity(3);
        for entry in &entries {
            let stall = self
                .directory
                .find_stall(&entry.stall_id)
                .filter(|s| !s.revoked)
                .ok_or_else(|| RankingError::StallNotFound(entry.stall_id.clone()))?;
            if stall.school != participant.school {
                return Err(RankingError::CrossSchoolStall(entry.stall_id.clone()));
            }
            stalls.push(stall);
        }

        // All checks passed; commit under the guard.
        let now = self.clock.now();
        let rows = entries.clone().map(|e| RankingRow {
            participant_id: participant_id.to_string(),
            stall_id: e.stall_id,
            rank: e.rank,
            submitted_at: now,
        });
        self.directory.push_rankings(rows.clone()).await;

        let category = entries
            .iter()
            .zip(&stalls)
            .find(|(e, _)| e.rank == 1)
            .map(|(_, s)| s.category.clone())
            .unwrap_or_default();

        self.directory.update_participant(participant_id, |p| {
            p.has_completed_ranking = true;
            p.ranked_category = Some(category.clone());
        });

        let weights = self.weights;
        for entry in &entries {
            self.directory.update_stall(&entry.stall_id, |s| {
                match entry.rank {
                    1 => s.rank_1_votes += 1,
                    2 => s.rank_2_votes += 1,
                    _ => s.rank_3_votes += 1,
                }
                s.weighted_score = weights.score(s);
            });
        }

        info!(
            participant = %participant_id,
            category = %category,
            "ranking committed"
        );

        Ok(RankingReceipt {
            participant_id: participant_id.to_string(),
            category,
            rows,
            submitted_at: now,
        })
    }
}
