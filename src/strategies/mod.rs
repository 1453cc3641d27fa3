pub mod self_match;
pub mod traits;
