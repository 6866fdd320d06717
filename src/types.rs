//! Domain entities and event records
//!
//! Everything here is keyed by natural identifiers (registration number,
//! stall number), never by a storage row id, so re-issued tokens can always
//! be resolved against the directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Direction of an attendance scan, inferred from the participant's
/// persisted inside/outside state rather than supplied by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Entry,
    Exit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Entry => write!(f, "ENTRY"),
            Direction::Exit => write!(f, "EXIT"),
        }
    }
}

/// A registered event participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Registration number - the natural key carried inside tokens
    pub registration_no: String,

    /// Display name
    pub name: String,

    /// Affiliation group; rankings may only target stalls of the same school
    pub school: String,

    /// Whether the participant is currently inside the venue.
    /// Single source of truth for scan direction inference.
    pub inside_event: bool,

    /// Number of feedback entries submitted so far
    pub feedback_count: u32,

    /// Set once the participant has cast their ranking; permanent
    pub has_completed_ranking: bool,

    /// Category of the ranked stalls, recorded at ranking commit
    pub ranked_category: Option<String>,
}

impl Participant {
    pub fn new(registration_no: &str, name: &str, school: &str) -> Self {
        Self {
            registration_no: registration_no.to_string(),
            name: name.to_string(),
            school: school.to_string(),
            inside_event: false,
            feedback_count: 0,
            has_completed_ranking: false,
            ranked_category: None,
        }
    }
}

/// A stall participants can review and rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stall {
    /// Stall number - the natural key embedded in the printed stall token
    pub stall_no: String,

    /// Display name
    pub name: String,

    /// Affiliation group the stall belongs to
    pub school: String,

    /// Category the stall competes in
    pub category: String,

    /// Revoked stalls fail token verification even though the printed
    /// code still parses
    pub revoked: bool,

    /// Number of feedback entries received
    pub feedback_count: u32,

    /// First-place votes received
    pub rank_1_votes: u32,

    /// Second-place votes received
    pub rank_2_votes: u32,

    /// Third-place votes received
    pub rank_3_votes: u32,

    /// Derived score, recomputed from the vote counters on every ranking commit
    pub weighted_score: u32,
}

impl Stall {
    pub fn new(stall_no: &str, name: &str, school: &str, category: &str) -> Self {
        Self {
            stall_no: stall_no.to_string(),
            name: name.to_string(),
            school: school.to_string(),
            category: category.to_string(),
            revoked: false,
            feedback_count: 0,
            rank_1_votes: 0,
            rank_2_votes: 0,
            rank_3_votes: 0,
            weighted_score: 0,
        }
    }
}

/// Immutable record of a single gate scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,

    /// Registration number of the scanned participant
    pub participant_id: String,

    /// Staff actor who performed the scan
    pub scanned_by: String,

    pub direction: Direction,

    pub timestamp: DateTime<Utc>,

    /// Seconds since the matching ENTRY scan; present on EXIT records only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
}

/// Immutable record of one feedback submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub participant_id: String,
    pub stall_id: String,
    /// Rating in 1..=5
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// One committed row of a ranking submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRow {
    pub participant_id: String,
    pub stall_id: String,
    /// Placement in 1..=3
    pub rank: u8,
    pub submitted_at: DateTime<Utc>,
}

/// Caller-supplied ranking choice, validated by the ranking service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    pub stall_id: String,
    pub rank: u8,
}

impl RankingEntry {
    pub fn new(stall_id: &str, rank: u8) -> Self {
        Self {
            stall_id: stall_id.to_string(),
            rank,
        }
    }
}
