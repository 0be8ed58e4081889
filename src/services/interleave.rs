use std::collections::HashSet;

use crate::models::{PostId, ScoredCandidate};

use super::random::RandomSource;

/// Inclusive range a batch size is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub min: usize,
    pub max: usize,
}

impl BatchRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    fn draw<R: RandomSource + ?Sized>(&self, random: &mut R) -> usize {
        random.next_int(self.min, self.max)
    }
}

/// Batching policy applied on every interleaving round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterleavePolicy {
    pub friends: BatchRange,
    pub follows: BatchRange,
    pub top: BatchRange,
    /// Probability of preferring the last-hour stream for a top pick
    pub top_hour_bias: f64,
}

impl Default for InterleavePolicy {
    fn default() -> Self {
        Self {
            friends: BatchRange::new(1, 2),
            follows: BatchRange::new(1, 2),
            top: BatchRange::new(2, 4),
            top_hour_bias: 0.5,
        }
    }
}

/// Read position over one candidate stream; only ever moves forward
struct Cursor<'a, T> {
    items: &'a [T],
    pos: usize,
}

impl<'a, T> Cursor<'a, T> {
    fn new(items: &'a [T]) -> Self {
        Self { items, pos: 0 }
    }

    fn is_exhausted(&self) -> bool {
        self.pos >= self.items.len()
    }

    fn advance(&mut self) -> Option<&'a T> {
        let item = self.items.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }
}

/// Ids picked so far, with O(1) membership checks
struct Selection {
    ids: Vec<PostId>,
    seen: HashSet<PostId>,
    limit: usize,
}

impl Selection {
    /// `available` bounds the allocation; `limit` may be far larger
    fn new(limit: usize, available: usize) -> Self {
        let capacity = limit.min(available);
        Self {
            ids: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            limit,
        }
    }

    fn is_full(&self) -> bool {
        self.ids.len() >= self.limit
    }

    /// Returns false when `id` was already selected
    fn push(&mut self, id: PostId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.ids.push(id);
        true
    }
}

/// Merges the four candidate streams with the default batching policy.
///
/// Each round takes 1-2 friend posts, 1-2 follow posts, then 2-4 top posts
/// split between the last-hour and last-day streams by a coin flip. Rounds
/// repeat until `limit` ids are chosen or friends and both top streams run
/// dry. The follows stream is not part of that exhaustion check.
pub fn interleave<R: RandomSource + ?Sized>(
    friends: &[PostId],
    follows: &[PostId],
    top_hour: &[ScoredCandidate],
    top_day: &[ScoredCandidate],
    random: &mut R,
    limit: usize,
) -> Vec<PostId> {
    interleave_with_policy(
        &InterleavePolicy::default(),
        friends,
        follows,
        top_hour,
        top_day,
        random,
        limit,
    )
}

/// [`interleave`] with an explicit batching policy
pub fn interleave_with_policy<R: RandomSource + ?Sized>(
    policy: &InterleavePolicy,
    friends: &[PostId],
    follows: &[PostId],
    top_hour: &[ScoredCandidate],
    top_day: &[ScoredCandidate],
    random: &mut R,
    limit: usize,
) -> Vec<PostId> {
    let available = friends
        .len()
        .saturating_add(follows.len())
        .saturating_add(top_hour.len())
        .saturating_add(top_day.len());
    let mut selection = Selection::new(limit, available);

    let mut friends = Cursor::new(friends);
    let mut follows = Cursor::new(follows);
    let mut top_hour = Cursor::new(top_hour);
    let mut top_day = Cursor::new(top_day);

    while !selection.is_full() {
        take_plain_batch(&mut friends, policy.friends, &mut selection, random);
        if selection.is_full() {
            break;
        }

        take_plain_batch(&mut follows, policy.follows, &mut selection, random);
        if selection.is_full() {
            break;
        }

        take_top_batch(
            &mut top_hour,
            &mut top_day,
            policy,
            &mut selection,
            random,
        );

        if friends.is_exhausted() && top_hour.is_exhausted() && top_day.is_exhausted() {
            break;
        }
    }

    selection.ids
}

fn take_plain_batch<R: RandomSource + ?Sized>(
    cursor: &mut Cursor<'_, PostId>,
    range: BatchRange,
    selection: &mut Selection,
    random: &mut R,
) {
    // No draw for a stream that is already used up
    if cursor.is_exhausted() {
        return;
    }

    let wanted = range.draw(random);
    let mut taken = 0;
    while taken < wanted {
        let Some(&id) = cursor.advance() else {
            break;
        };
        if selection.push(id) {
            taken += 1;
        }
        if selection.is_full() {
            break;
        }
    }
}

fn take_top_batch<R: RandomSource + ?Sized>(
    top_hour: &mut Cursor<'_, ScoredCandidate>,
    top_day: &mut Cursor<'_, ScoredCandidate>,
    policy: &InterleavePolicy,
    selection: &mut Selection,
    random: &mut R,
) {
    let wanted = policy.top.draw(random);
    let mut taken = 0;
    while taken < wanted {
        let prefer_hour = random.next_float01() < policy.top_hour_bias;

        let candidate = if prefer_hour && !top_hour.is_exhausted() {
            top_hour.advance()
        } else if !top_day.is_exhausted() {
            top_day.advance()
        } else {
            top_hour.advance()
        };

        let Some(candidate) = candidate else {
            break;
        };
        if selection.push(candidate.post_id) {
            taken += 1;
        }
        if selection.is_full() {
            break;
        }
    }
}
