//! Input validation and error types

pub mod data;
pub mod error;

pub use data::{align_observations, check_receiver_count, check_unique_ids};
pub use error::{MlatError, MlatResult};
