//! Lifecycle events emitted for membership transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default metric name for a member entering the segment.
pub const DEFAULT_JOINED_METRIC: &str = "Joined Segment";
/// Default metric name for a member leaving the segment.
pub const DEFAULT_LEFT_METRIC: &str = "Left Segment";

/// Direction of a membership transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Joined,
    Left,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Joined => write!(f, "joined"),
            EventKind::Left => write!(f, "left"),
        }
    }
}

/// Identifies the segment whose membership is being mirrored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentInfo {
    pub id: String,
    pub name: String,
}

impl SegmentInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Metric names used when delivering lifecycle events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricNames {
    pub joined: String,
    pub left: String,
}

impl MetricNames {
    pub fn name_for(&self, kind: EventKind) -> &str {
        match kind {
            EventKind::Joined => &self.joined,
            EventKind::Left => &self.left,
        }
    }
}

impl Default for MetricNames {
    fn default() -> Self {
        Self {
            joined: DEFAULT_JOINED_METRIC.to_string(),
            left: DEFAULT_LEFT_METRIC.to_string(),
        }
    }
}

/// Auxiliary data attached to every notification attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationContext {
    pub segment_id: String,
    pub segment_name: String,
    /// When this particular attempt was made.
    pub timestamp: DateTime<Utc>,
}

impl NotificationContext {
    pub fn for_segment(segment: &SegmentInfo, timestamp: DateTime<Utc>) -> Self {
        Self {
            segment_id: segment.id.clone(),
            segment_name: segment.name.clone(),
            timestamp,
        }
    }
}
