//! Core data types shared by the history walk and the timeline

use crate::contributors::VerifiedContributor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit in the walked history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit SHA hash (40 characters)
    pub id: String,
    /// Commit timestamp
    pub timestamp: DateTime<Utc>,
    /// Author's name
    pub author_name: String,
    /// Author's email address
    pub author_email: String,
}

impl Commit {
    /// Abbreviated commit id (7 characters) for logs and display
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

/// One accepted point of the timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Commit that first produced this graph
    pub commit: String,
    /// Timestamp of that commit
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
    /// Canonical graph description
    #[serde(rename = "dot")]
    pub graph: String,
    /// All contributors known at the commit, verified or not
    pub contributor_count: usize,
    /// Contributors with a verified platform account, in first-seen order
    pub contributors: Vec<VerifiedContributor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_short_id() {
        let commit = Commit {
            id: "0123456789abcdef0123456789abcdef01234567".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
        };
        assert_eq!(commit.short_id(), "0123456");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_snapshot_serialization_field_names() {
        let snapshot = Snapshot {
            commit: "abc".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            graph: "digraph {\n}\n".to_string(),
            contributor_count: 2,
            contributors: vec![],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["date"], "2024-05-01T12:00:00Z");
        assert_eq!(json["dot"], "digraph {\n}\n");
        assert_eq!(json["contributor_count"], 2);
    }
}
