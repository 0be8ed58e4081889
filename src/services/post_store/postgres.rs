/// Postgres-backed post store
///
/// Works against the `twit` / `follow` / `"like"` / `user_twit` schema created
/// by `migrations/`. A post is "unseen" when `user_twit` holds no row for the
/// (user, post) pair.
use crate::{
    error::AppResult,
    models::{Post, PostId, ScoredCandidate, TimeWindow, UserId},
    services::post_store::PostStore,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgPostStore {
    db_pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    author_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: PostId(row.id),
            author_id: UserId(row.author_id),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

fn raw_post_ids(ids: &[PostId]) -> Vec<i64> {
    ids.iter().map(|id| id.0).collect()
}

/// `LIMIT` bind value, saturating at `i64::MAX`
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl PgPostStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait::async_trait]
impl PostStore for PgPostStore {
    async fn list_follows(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT followed_id
            FROM follow
            WHERE follower_id = $1
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(UserId).collect())
    }

    async fn list_mutual_friends(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT f1.followed_id
            FROM follow f1
            JOIN follow f2
              ON f1.followed_id = f2.follower_id
             AND f1.follower_id = f2.followed_id
            WHERE f1.follower_id = $1
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(UserId).collect())
    }

    async fn unseen_recent_posts_by_authors(
        &self,
        user_id: UserId,
        author_ids: &[UserId],
        window_hours: i64,
    ) -> AppResult<Vec<PostId>> {
        if author_ids.is_empty() {
            return Ok(vec![]);
        }

        let authors: Vec<i64> = author_ids.iter().map(|id| id.0).collect();
        let since = Utc::now() - Duration::hours(window_hours);

        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT p.id
            FROM twit p
            WHERE p.author_id = ANY($1)
              AND p.created_at > $2
              AND NOT EXISTS (
                SELECT 1
                FROM user_twit v
                WHERE v.twit_id = p.id
                  AND v.user_id = $3
              )
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(&authors)
        .bind(since)
        .bind(user_id.0)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(PostId).collect())
    }

    async fn unseen_top_posts(
        &self,
        user_id: UserId,
        window: TimeWindow,
        limit: usize,
    ) -> AppResult<Vec<ScoredCandidate>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.id, COUNT(l.twit_id) AS nb_likes
            FROM twit p
            LEFT JOIN "like" l ON p.id = l.twit_id
            WHERE p.created_at > $1
              AND p.created_at <= $2
              AND NOT EXISTS (
                SELECT 1
                FROM user_twit v
                WHERE v.twit_id = p.id
                  AND v.user_id = $3
              )
            GROUP BY p.id
            ORDER BY nb_likes DESC
            LIMIT $4
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(user_id.0)
        .bind(sql_limit(limit))
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, likes)| ScoredCandidate::new(id, likes.max(0) as u64))
            .collect())
    }

    async fn unseen_newest_posts(&self, user_id: UserId, limit: usize) -> AppResult<Vec<PostId>> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT p.id
            FROM twit p
            WHERE NOT EXISTS (
                SELECT 1
                FROM user_twit v
                WHERE v.twit_id = p.id
                  AND v.user_id = $1
            )
            ORDER BY p.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.0)
        .bind(sql_limit(limit))
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(PostId).collect())
    }

    async fn latest_posts_excluding(
        &self,
        count: usize,
        exclude: &[PostId],
    ) -> AppResult<Vec<PostId>> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT p.id
            FROM twit p
            WHERE NOT (p.id = ANY($1))
            ORDER BY p.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(raw_post_ids(exclude))
        .bind(sql_limit(count))
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(PostId).collect())
    }

    async fn mark_viewed(&self, user_id: UserId, post_ids: &[PostId]) -> AppResult<()> {
        if post_ids.is_empty() {
            return Ok(());
        }

        let result = sqlx::query(
            r#"
            INSERT INTO user_twit (user_id, twit_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id.0)
        .bind(raw_post_ids(post_ids))
        .execute(&self.db_pool)
        .await?;

        tracing::debug!(
            user_id = %user_id,
            inserted = result.rows_affected(),
            "Marked posts as viewed"
        );

        Ok(())
    }

    async fn posts_by_ids(&self, post_ids: &[PostId]) -> AppResult<Vec<Post>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT id, author_id, content, created_at
            FROM twit
            WHERE id = ANY($1)
            "#,
        )
        .bind(raw_post_ids(post_ids))
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
