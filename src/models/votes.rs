use serde::{Deserialize, Serialize};

/// One participant entry on the leaderboard. Never removed during a session;
/// only `votes_count` changes once the live feed is running.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VotingItem {
    pub id: i64,
    pub title: String,
    pub photo: String,
    pub url: Option<String>,
    pub votes_count: u64,
    /// Set by the bulk load only; live increments do NOT refresh this
    /// (the client never has a fresh denominator).
    pub votes_percents: f32,
    pub vote_code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    NotStarted,
    Started,
    Ended,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VoteData {
    pub voting_items: Vec<VotingItem>,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<VoteStatus>,
    pub sms_number: Option<String>,
    pub banner: Option<String>,
    pub banner_mobile: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

/// Bulk-fetch envelope. `data` is absent when no voting is published.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AllVotes {
    pub data: Option<VoteData>,
}
