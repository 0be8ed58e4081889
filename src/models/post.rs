use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PostId, UserId};

/// A post as returned to the client once recommended ids are resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Orders `posts` to follow `ids`, skipping ids with no matching post
pub fn order_by_ids(ids: &[PostId], posts: Vec<Post>) -> Vec<Post> {
    let mut by_id: std::collections::HashMap<PostId, Post> =
        posts.into_iter().map(|post| (post.id, post)).collect();

    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
