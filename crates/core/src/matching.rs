use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Store-assigned contour identifier. Ascending in ingestion order.
pub type ContourId = i64;

/// Position of a Series in the caller's source list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(pub u32);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a stored contour lives in its source Series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContourRef {
    pub series: SeriesId,
    pub section: i32,
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Match types
// ---------------------------------------------------------------------------

/// Classification tier of a contour pair. Ordering is the reducer's default
/// scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Potential,
    PotentialRealigned,
}

impl MatchType {
    pub const ALL: [MatchType; 3] = [Self::Exact, Self::Potential, Self::PotentialRealigned];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Potential => "potential",
            Self::PotentialRealigned => "potential_realigned",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "potential" => Ok(Self::Potential),
            "potential_realigned" => Ok(Self::PotentialRealigned),
            other => Err(format!("unknown match type: {other}")),
        }
    }
}

/// A classification edge between two contours of one physical section.
///
/// `id1` is the contour that came first in the matching scan, so `id1 < id2`
/// whenever the scan runs over ids in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id1: ContourId,
    pub id2: ContourId,
    pub match_type: MatchType,
}

impl MatchRecord {
    pub fn new(id1: ContourId, id2: ContourId, match_type: MatchType) -> Self {
        Self { id1, id2, match_type }
    }

    pub fn touches(&self, id: ContourId) -> bool {
        self.id1 == id || self.id2 == id
    }
}

// ---------------------------------------------------------------------------
// Review categories
// ---------------------------------------------------------------------------

/// Review group category a curation decision was made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewCategory {
    Exact,
    Potential,
    PotentialRealigned,
    Unique,
}

impl ReviewCategory {
    /// Default reducer scan order.
    pub const DEFAULT_ORDER: [ReviewCategory; 4] =
        [Self::Exact, Self::Potential, Self::PotentialRealigned, Self::Unique];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Potential => "potential",
            Self::PotentialRealigned => "potential_realigned",
            Self::Unique => "unique",
        }
    }
}

impl From<MatchType> for ReviewCategory {
    fn from(value: MatchType) -> Self {
        match value {
            MatchType::Exact => Self::Exact,
            MatchType::Potential => Self::Potential,
            MatchType::PotentialRealigned => Self::PotentialRealigned,
        }
    }
}

impl fmt::Display for ReviewCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
