use serde::{Deserialize, Serialize};

/// Trust tier derived from a user's karma
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    NewNeighbor,
    ReliableLender,
    CommunityPillar,
    Legend,
}

impl Badge {
    pub const LEGEND_MIN: i64 = 500;
    pub const PILLAR_MIN: i64 = 200;
    pub const RELIABLE_MIN: i64 = 50;

    /// Classify a karma score
    ///
    /// Bands are inclusive on their lower bound. Negative scores are
    /// treated as zero.
    pub fn from_karma(karma: i64) -> Self {
        match karma.max(0) {
            k if k >= Self::LEGEND_MIN => Badge::Legend,
            k if k >= Self::PILLAR_MIN => Badge::CommunityPillar,
            k if k >= Self::RELIABLE_MIN => Badge::ReliableLender,
            _ => Badge::NewNeighbor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Badge::Legend => "DharLink Legend",
            Badge::CommunityPillar => "Community Pillar",
            Badge::ReliableLender => "Reliable Lender",
            Badge::NewNeighbor => "New Neighbor",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Badge::Legend => "👑",
            Badge::CommunityPillar => "🏛️",
            Badge::ReliableLender => "🤝",
            Badge::NewNeighbor => "🌱",
        }
    }
}
