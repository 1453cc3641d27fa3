pub mod aster;
pub mod error;
pub mod messages;
#[cfg(test)]
pub mod mock;
pub mod traits;
