pub mod interleave;
pub mod post_store;
pub mod random;
pub mod recommendations;

pub use interleave::{interleave, interleave_with_policy, BatchRange, InterleavePolicy};
pub use post_store::{PgPostStore, PostStore};
pub use random::{RandomSource, SeededRandom};
pub use recommendations::RecommendationBuilder;
