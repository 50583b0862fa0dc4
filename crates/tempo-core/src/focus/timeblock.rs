//! Scheduled time blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::SessionId;

/// Why a requested window was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    #[error("start time must be in the future")]
    StartNotInFuture,

    #[error("end time must be after start time")]
    EndNotAfterStart,
}

/// A reserved interval `[start, end)` for focused work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    /// What the block is for. Empty when not given.
    #[serde(default)]
    pub task_name: String,
}

impl TimeBlock {
    /// Validates a window against `now`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        task_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, WindowError> {
        if start <= now {
            return Err(WindowError::StartNotInFuture);
        }
        if end <= start {
            return Err(WindowError::EndNotAfterStart);
        }
        Ok(Self {
            start,
            end,
            task_name: task_name.into(),
        })
    }

    /// Whole minutes between start and end.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Half-open interval intersection. Touching blocks do not overlap.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }

    /// Where `now` falls relative to the block.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> BlockStatus {
        if now < self.start {
            BlockStatus::Scheduled {
                remaining_seconds: (self.start - now).num_seconds(),
            }
        } else if now < self.end {
            BlockStatus::InProgress {
                remaining_seconds: (self.end - now).num_seconds(),
            }
        } else {
            BlockStatus::Completed
        }
    }
}

/// Time block status as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockStatus {
    /// No block is held.
    Inactive,
    /// The block has not started. Seconds until start.
    Scheduled { remaining_seconds: i64 },
    /// The block is running. Seconds until end.
    InProgress { remaining_seconds: i64 },
    /// The block's end has passed.
    Completed,
}

impl BlockStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Scheduled { .. } => "scheduled",
            Self::InProgress { .. } => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Seconds to the relevant boundary; zero when inactive or completed.
    #[must_use]
    pub const fn remaining_seconds(&self) -> i64 {
        match self {
            Self::Scheduled { remaining_seconds } | Self::InProgress { remaining_seconds } => {
                *remaining_seconds
            }
            Self::Inactive | Self::Completed => 0,
        }
    }
}

/// Result of a successful schedule call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledBlock {
    /// Log row id, `None` if the log write failed.
    pub session_id: Option<SessionId>,
    pub block: TimeBlock,
    pub duration_minutes: i64,
}
