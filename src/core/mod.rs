pub mod cost;
pub mod engine;
pub mod reconciler;
pub mod supervisor;
