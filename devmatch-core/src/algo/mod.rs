//! Scoring primitives used by the matchers.

mod edit_distance;
pub use edit_distance::{DISTANCE_OVER_LIMIT, edit_distance};

mod most_frequent;
pub use most_frequent::{most_frequent, most_frequent_with_count};
