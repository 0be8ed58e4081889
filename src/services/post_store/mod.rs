/// Post store abstraction
///
/// Everything the recommendation builder and the HTTP boundary need from
/// persistence: the follow graph, time-windowed unseen post lookups, like-count
/// rankings and "already viewed" bookkeeping. The trait is schema-agnostic so
/// any backing schema can satisfy it.
use crate::{
    error::AppResult,
    models::{Post, PostId, ScoredCandidate, TimeWindow, UserId},
};

pub mod postgres;

pub use postgres::PgPostStore;

/// Trait for post stores consumed by the recommendation builder
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PostStore: Send + Sync {
    /// Users that `user_id` follows
    async fn list_follows(&self, user_id: UserId) -> AppResult<Vec<UserId>>;

    /// Users with a mutual follow relationship with `user_id`
    async fn list_mutual_friends(&self, user_id: UserId) -> AppResult<Vec<UserId>>;

    /// Posts by `author_ids` created in the last `window_hours` that `user_id`
    /// has not viewed, newest first
    async fn unseen_recent_posts_by_authors(
        &self,
        user_id: UserId,
        author_ids: &[UserId],
        window_hours: i64,
    ) -> AppResult<Vec<PostId>>;

    /// Most-liked posts created inside `window` that `user_id` has not viewed,
    /// at most `limit` of them
    async fn unseen_top_posts(
        &self,
        user_id: UserId,
        window: TimeWindow,
        limit: usize,
    ) -> AppResult<Vec<ScoredCandidate>>;

    /// Newest posts `user_id` has not viewed, no time bound
    async fn unseen_newest_posts(&self, user_id: UserId, limit: usize) -> AppResult<Vec<PostId>>;

    /// Newest posts overall, leaving out `exclude`
    async fn latest_posts_excluding(
        &self,
        count: usize,
        exclude: &[PostId],
    ) -> AppResult<Vec<PostId>>;

    /// Records that `user_id` has seen `post_ids`
    async fn mark_viewed(&self, user_id: UserId, post_ids: &[PostId]) -> AppResult<()>;

    /// Resolves ids to full posts; order of the result is unspecified
    async fn posts_by_ids(&self, post_ids: &[PostId]) -> AppResult<Vec<Post>>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}
