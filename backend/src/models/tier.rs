use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription tier controlling feature and resource access.
///
/// Tiers are ordered by privilege, `Free < Builder < Admin`. All
/// comparisons go through the numeric rank so authorization checks
/// never compare role strings directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Builder,
    Admin,
}

impl Tier {
    /// Numeric privilege rank: free=1, builder=2, admin=3.
    pub fn rank(self) -> u8 {
        match self {
            Tier::Free => 1,
            Tier::Builder => 2,
            Tier::Admin => 3,
        }
    }

    /// Whether this tier grants at least the privileges of `other`.
    pub fn at_least(self, other: Tier) -> bool {
        self.rank() >= other.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Builder => "builder",
            Tier::Admin => "admin",
        }
    }

    /// Strict parse of a role string.
    pub fn parse(value: &str) -> Option<Tier> {
        match value {
            "free" => Some(Tier::Free),
            "builder" => Some(Tier::Builder),
            "admin" => Some(Tier::Admin),
            _ => None,
        }
    }

    /// Parse a stored role value. Anything unrecognized collapses to
    /// the least-privileged tier rather than failing the row.
    pub fn from_db(value: &str) -> Tier {
        Tier::parse(value).unwrap_or(Tier::Free)
    }
}

impl PartialOrd for Tier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
