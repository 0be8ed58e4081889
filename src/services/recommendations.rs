use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::instrument;

use crate::{
    error::AppResult,
    models::{CandidateStreams, PostId, TimeWindow, UserId},
    services::{
        interleave::interleave,
        post_store::PostStore,
        random::RandomSource,
    },
};

/// How far back friend and follow posts are considered
const RECENT_WINDOW_HOURS: i64 = 24;
/// Boundary between the "last hour" and "last day" top streams
const TOP_HOUR_WINDOW_HOURS: i64 = 1;

/// Builds a user's recommendation feed from the post store
#[derive(Clone)]
pub struct RecommendationBuilder {
    store: Arc<dyn PostStore>,
}

impl RecommendationBuilder {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    /// Generates up to `requested_count` unique post ids for `user_id`
    ///
    /// Friends, follows and top posts are interleaved first. If that comes up
    /// short, the newest unseen posts fill the gap, and after that the newest
    /// posts overall that were not already chosen. Any store failure aborts
    /// the whole recommendation.
    #[instrument(skip(self, random), fields(user_id = %user_id))]
    pub async fn build_recommendation<R>(
        &self,
        user_id: UserId,
        requested_count: usize,
        random: &mut R,
    ) -> AppResult<Vec<PostId>>
    where
        R: RandomSource + Send + ?Sized,
    {
        if requested_count == 0 {
            return Ok(vec![]);
        }

        let streams = self.fetch_candidate_streams(user_id, requested_count).await?;

        tracing::debug!(
            user_id = %user_id,
            friends = streams.friends.len(),
            follows = streams.follows.len(),
            top_hour = streams.top_hour.len(),
            top_day = streams.top_day.len(),
            "Candidate streams fetched"
        );

        let mut recommended = interleave(
            &streams.friends,
            &streams.follows,
            &streams.top_hour,
            &streams.top_day,
            random,
            requested_count,
        );
        let interleaved = recommended.len();

        if recommended.len() < requested_count {
            let newest_unseen = self
                .store
                .unseen_newest_posts(user_id, requested_count)
                .await?;
            fill_unseen(&mut recommended, newest_unseen, requested_count);
        }
        let after_unseen = recommended.len();

        if recommended.len() < requested_count {
            let shortfall = requested_count - recommended.len();
            let latest = self
                .store
                .latest_posts_excluding(shortfall, &recommended)
                .await?;
            fill_latest(&mut recommended, latest, requested_count);
        }

        tracing::info!(
            user_id = %user_id,
            requested = requested_count,
            interleaved,
            from_newest_unseen = after_unseen - interleaved,
            from_latest = recommended.len() - after_unseen,
            "Recommendation built"
        );

        Ok(recommended)
    }

    async fn fetch_candidate_streams(
        &self,
        user_id: UserId,
        requested_count: usize,
    ) -> AppResult<CandidateStreams> {
        let follows = self.store.list_follows(user_id).await?;
        let friends = self.store.list_mutual_friends(user_id).await?;

        let friends_posts = self
            .store
            .unseen_recent_posts_by_authors(user_id, &friends, RECENT_WINDOW_HOURS)
            .await?;
        let follows_posts = self
            .store
            .unseen_recent_posts_by_authors(user_id, &follows, RECENT_WINDOW_HOURS)
            .await?;

        let now = Utc::now();
        let last_hour = TimeWindow::ending_before(
            now,
            Duration::hours(TOP_HOUR_WINDOW_HOURS),
            Duration::zero(),
        );
        let last_day = TimeWindow::ending_before(
            now,
            Duration::hours(RECENT_WINDOW_HOURS),
            Duration::hours(TOP_HOUR_WINDOW_HOURS),
        );

        let top_hour = self
            .store
            .unseen_top_posts(user_id, last_hour, requested_count)
            .await?;
        let top_day = self
            .store
            .unseen_top_posts(user_id, last_day, requested_count)
            .await?;

        Ok(CandidateStreams {
            friends: friends_posts,
            follows: follows_posts,
            top_hour,
            top_day,
        })
    }
}

/// Appends pool ids not already recommended, in pool order, until `limit`
fn fill_unseen(recommended: &mut Vec<PostId>, pool: Vec<PostId>, limit: usize) {
    let mut seen: HashSet<PostId> = recommended.iter().copied().collect();
    for id in pool {
        if recommended.len() >= limit {
            break;
        }
        if seen.insert(id) {
            recommended.push(id);
        }
    }
}

/// Appends the store's "latest excluding" answer in order.
///
/// The store already leaves out recommended ids; an id that slips through
/// anyway is dropped so the feed stays duplicate-free.
fn fill_latest(recommended: &mut Vec<PostId>, latest: Vec<PostId>, limit: usize) {
    let mut seen: HashSet<PostId> = recommended.iter().copied().collect();
    for id in latest {
        if recommended.len() >= limit {
            break;
        }
        if !seen.insert(id) {
            tracing::warn!(post_id = %id, "Store returned an excluded post, skipping");
            continue;
        }
        recommended.push(id);
    }
}
