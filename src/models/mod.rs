use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod post;

pub use post::Post;

/// Identifier of a post (a "twit" row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

/// Identifier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A post from one of the "top" streams, paired with its like count
///
/// The like count only reflects how the store ranked the stream; the merge
/// never reorders by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub post_id: PostId,
    pub like_count: u64,
}

impl ScoredCandidate {
    pub fn new(post_id: i64, like_count: u64) -> Self {
        Self {
            post_id: PostId(post_id),
            like_count,
        }
    }
}

/// Creation-time window `(start, end]` used for top-post lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window covering `(now - from, now - to]`
    pub fn ending_before(now: DateTime<Utc>, from: Duration, to: Duration) -> Self {
        Self {
            start: now - from,
            end: now - to,
        }
    }
}

/// The four candidate streams fed into the interleaver, fetched once per request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateStreams {
    pub friends: Vec<PostId>,
    pub follows: Vec<PostId>,
    pub top_hour: Vec<ScoredCandidate>,
    pub top_day: Vec<ScoredCandidate>,
}

/// Response body for the id-only recommendation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationIds {
    pub post_ids: Vec<PostId>,
    pub count: usize,
}

impl From<Vec<PostId>> for RecommendationIds {
    fn from(post_ids: Vec<PostId>) -> Self {
        let count = post_ids.len();
        Self { post_ids, count }
    }
}
