// Candidate filtering pipeline: constraint filter, then scenery match.
//
// Both stages are pure functions over the shared catalog; the only state
// they produce is the per-request `Candidate` list.

pub mod filter;
pub mod scenery;

pub use filter::{filter_trails, Candidate, TrailQuery, HARD_RESULT_CAP, SOFT_RESULT_CAP};
pub use scenery::match_scenery;
