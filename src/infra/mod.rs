//! Implementations of the [`crate::services`] traits.

pub mod gobee;
pub mod jcdecaux;
pub mod memory;
pub mod s3;
pub mod ssm;
