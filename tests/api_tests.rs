use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};

use twittix_recommendation::api::{create_router, AppState, RecommendationSettings};
use twittix_recommendation::error::{AppError, AppResult};
use twittix_recommendation::models::{Post, PostId, RecommendationIds, ScoredCandidate, TimeWindow, UserId};
use twittix_recommendation::services::PostStore;

struct StoredPost {
    id: i64,
    author: i64,
    created_at: DateTime<Utc>,
    likes: u64,
}

/// In-memory post store mirroring the Postgres queries
#[derive(Default)]
struct InMemoryPostStore {
    posts: Vec<StoredPost>,
    follows: Vec<(i64, i64)>,
    viewed: Mutex<HashSet<(i64, i64)>>,
    unavailable: bool,
    reject_mark_viewed: bool,
}

impl InMemoryPostStore {
    fn post(mut self, id: i64, author: i64, age_minutes: i64, likes: u64) -> Self {
        self.posts.push(StoredPost {
            id,
            author,
            created_at: Utc::now() - Duration::minutes(age_minutes),
            likes,
        });
        self
    }

    fn follow(mut self, follower: i64, followed: i64) -> Self {
        self.follows.push((follower, followed));
        self
    }

    fn seen(self, user: i64, post: i64) -> Self {
        self.viewed.lock().unwrap().insert((user, post));
        self
    }

    fn is_unseen(&self, user: UserId, post: i64) -> bool {
        !self.viewed.lock().unwrap().contains(&(user.0, post))
    }

    fn check(&self) -> AppResult<()> {
        if self.unavailable {
            return Err(AppError::StoreUnavailable("connection refused".to_string()));
        }
        Ok(())
    }

    /// Posts sorted newest first
    fn newest_first(&self) -> Vec<&StoredPost> {
        let mut posts: Vec<&StoredPost> = self.posts.iter().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }
}

#[async_trait::async_trait]
impl PostStore for InMemoryPostStore {
    async fn list_follows(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        self.check()?;
        Ok(self
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id.0)
            .map(|(_, followed)| UserId(*followed))
            .collect())
    }

    async fn list_mutual_friends(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        self.check()?;
        Ok(self
            .follows
            .iter()
            .filter(|(follower, followed)| {
                *follower == user_id.0 && self.follows.contains(&(*followed, user_id.0))
            })
            .map(|(_, followed)| UserId(*followed))
            .collect())
    }

    async fn unseen_recent_posts_by_authors(
        &self,
        user_id: UserId,
        author_ids: &[UserId],
        window_hours: i64,
    ) -> AppResult<Vec<PostId>> {
        self.check()?;
        let since = Utc::now() - Duration::hours(window_hours);
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|p| author_ids.contains(&UserId(p.author)))
            .filter(|p| p.created_at > since && self.is_unseen(user_id, p.id))
            .map(|p| PostId(p.id))
            .collect())
    }

    async fn unseen_top_posts(
        &self,
        user_id: UserId,
        window: TimeWindow,
        limit: usize,
    ) -> AppResult<Vec<ScoredCandidate>> {
        self.check()?;
        let mut posts: Vec<&StoredPost> = self
            .posts
            .iter()
            .filter(|p| p.created_at > window.start && p.created_at <= window.end)
            .filter(|p| self.is_unseen(user_id, p.id))
            .collect();
        posts.sort_by(|a, b| b.likes.cmp(&a.likes));
        Ok(posts
            .into_iter()
            .take(limit)
            .map(|p| ScoredCandidate::new(p.id, p.likes))
            .collect())
    }

    async fn unseen_newest_posts(&self, user_id: UserId, limit: usize) -> AppResult<Vec<PostId>> {
        self.check()?;
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|p| self.is_unseen(user_id, p.id))
            .take(limit)
            .map(|p| PostId(p.id))
            .collect())
    }

    async fn latest_posts_excluding(
        &self,
        count: usize,
        exclude: &[PostId],
    ) -> AppResult<Vec<PostId>> {
        self.check()?;
        Ok(self
            .newest_first()
            .into_iter()
            .filter(|p| !exclude.contains(&PostId(p.id)))
            .take(count)
            .map(|p| PostId(p.id))
            .collect())
    }

    async fn mark_viewed(&self, user_id: UserId, post_ids: &[PostId]) -> AppResult<()> {
        if self.reject_mark_viewed {
            return Err(AppError::StoreUnavailable("read-only replica".to_string()));
        }
        let mut viewed = self.viewed.lock().unwrap();
        for id in post_ids {
            viewed.insert((user_id.0, id.0));
        }
        Ok(())
    }

    async fn posts_by_ids(&self, post_ids: &[PostId]) -> AppResult<Vec<Post>> {
        self.check()?;
        Ok(self
            .posts
            .iter()
            .filter(|p| post_ids.contains(&PostId(p.id)))
            .map(|p| Post {
                id: PostId(p.id),
                author_id: UserId(p.author),
                content: format!("twit #{}", p.id),
                created_at: p.created_at,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

fn create_test_server(store: InMemoryPostStore) -> (TestServer, Arc<InMemoryPostStore>) {
    let store = Arc::new(store);
    let settings = RecommendationSettings {
        default_count: 5,
        max_count: 20,
        rng_seed: Some(0),
    };
    let state = AppState::new(store.clone(), settings);
    let app = create_router(state);
    (TestServer::new(app).unwrap(), store)
}

/// User 1 is mutual friends with 4 and follows 2 and 3; posts span all sources
fn populated_store() -> InMemoryPostStore {
    InMemoryPostStore::default()
        .follow(1, 2)
        .follow(1, 3)
        .follow(1, 4)
        .follow(4, 1)
        // friend (author 4)
        .post(101, 4, 90, 0)
        .post(102, 4, 120, 1)
        // follows (authors 2 and 3)
        .post(201, 2, 95, 0)
        .post(202, 3, 130, 2)
        // strangers, last hour
        .post(301, 9, 10, 4)
        .post(302, 9, 20, 2)
        // strangers, earlier today
        .post(401, 8, 300, 10)
        .post(402, 8, 400, 5)
        // older than a day
        .post(501, 8, 3000, 50)
}

#[tokio::test]
async fn test_health_check() {
    let (server, _) = create_test_server(InMemoryPostStore::default());
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_recommendation_ids_default_count() {
    let (server, _) = create_test_server(populated_store());

    let response = server.get("/recommendation/1/ids").await;
    response.assert_status_ok();

    let body: RecommendationIds = response.json();
    assert_eq!(body.count, 5);
    assert_eq!(body.post_ids.len(), 5);

    let unique: HashSet<_> = body.post_ids.iter().collect();
    assert_eq!(unique.len(), 5);
    // Friend posts lead every feed
    assert_eq!(body.post_ids[0], PostId(101));
    assert!(body.post_ids.contains(&PostId(201)) || body.post_ids.contains(&PostId(202)));
}

#[tokio::test]
async fn test_recommendation_hydrates_posts_in_order() {
    let (server, _) = create_test_server(populated_store());

    let ids: RecommendationIds = server
        .get("/recommendation/1/ids")
        .add_query_param("count", 4)
        .await
        .json();

    // Same seed, fresh view state
    let (server, _) = create_test_server(populated_store());
    let response = server
        .get("/recommendation/1")
        .add_query_param("count", 4)
        .await;
    response.assert_status_ok();

    let posts: Vec<Post> = response.json();
    let hydrated: Vec<PostId> = posts.iter().map(|p| p.id).collect();
    assert_eq!(hydrated, ids.post_ids);
}

#[tokio::test]
async fn test_recommended_posts_are_marked_viewed() {
    let (server, store) = create_test_server(populated_store());

    let first: RecommendationIds = server
        .get("/recommendation/1/ids")
        .add_query_param("count", 3)
        .await
        .json();

    for id in &first.post_ids {
        assert!(!store.is_unseen(UserId(1), id.0));
    }

    // Already viewed posts never come back while unseen posts remain
    let second: RecommendationIds = server
        .get("/recommendation/1/ids")
        .add_query_param("count", 3)
        .await
        .json();
    for id in &second.post_ids {
        assert!(!first.post_ids.contains(id));
    }
}

#[tokio::test]
async fn test_only_newest_unseen_posts() {
    let store = InMemoryPostStore::default()
        .post(601, 9, 3000, 0)
        .post(602, 9, 3100, 0)
        .post(603, 9, 3200, 0);
    let (server, _) = create_test_server(store);

    let body: RecommendationIds = server
        .get("/recommendation/1/ids")
        .add_query_param("count", 5)
        .await
        .json();

    assert_eq!(body.post_ids, vec![PostId(601), PostId(602), PostId(603)]);
}

#[tokio::test]
async fn test_falls_back_to_already_seen_posts() {
    let store = InMemoryPostStore::default()
        .post(601, 9, 3000, 0)
        .post(602, 9, 3100, 0)
        .post(603, 9, 3200, 0)
        .seen(1, 601)
        .seen(1, 603);
    let (server, _) = create_test_server(store);

    let body: RecommendationIds = server
        .get("/recommendation/1/ids")
        .add_query_param("count", 3)
        .await
        .json();

    // Unseen 602 first, then the newest posts regardless of views
    assert_eq!(body.post_ids, vec![PostId(602), PostId(601), PostId(603)]);
}

#[tokio::test]
async fn test_non_positive_count_returns_empty() {
    let (server, _) = create_test_server(populated_store());

    for count in [0, -3] {
        let body: RecommendationIds = server
            .get("/recommendation/1/ids")
            .add_query_param("count", count)
            .await
            .json();
        assert_eq!(body.count, 0);
        assert!(body.post_ids.is_empty());
    }
}

#[tokio::test]
async fn test_count_is_clamped_to_max() {
    let mut store = InMemoryPostStore::default();
    for id in 1..=30 {
        store = store.post(id, 9, 3000 + id, 0);
    }
    let (server, _) = create_test_server(store);

    let body: RecommendationIds = server
        .get("/recommendation/1/ids")
        .add_query_param("count", 1000)
        .await
        .json();

    assert_eq!(body.count, 20);
}

#[tokio::test]
async fn test_store_unavailable_returns_503() {
    let store = InMemoryPostStore {
        unavailable: true,
        ..Default::default()
    };
    let (server, _) = create_test_server(store);

    let response = server.get("/recommendation/1").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_mark_viewed_failure_does_not_fail_request() {
    let mut store = populated_store();
    store.reject_mark_viewed = true;
    let (server, _) = create_test_server(store);

    let response = server.get("/recommendation/1").await;
    response.assert_status_ok();
    let posts: Vec<Post> = response.json();
    assert_eq!(posts.len(), 5);
}

#[tokio::test]
async fn test_invalid_user_id_is_rejected() {
    let (server, _) = create_test_server(populated_store());
    let response = server.get("/recommendation/not-a-user").expect_failure().await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_malformed_count_is_rejected() {
    let (server, store) = create_test_server(populated_store());
    let response = server
        .get("/recommendation/1/ids")
        .add_query_param("count", "lots")
        .expect_failure()
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().is_some());
    // Nothing was recommended, so nothing was marked viewed
    assert!(store.is_unseen(UserId(1), 101));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (server, _) = create_test_server(InMemoryPostStore::default());
    let request_id = "6f1c2b1e-8f43-4a4e-9d6a-2f0b8d0e5c11";

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static(request_id),
        )
        .await;

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        request_id
    );
}
