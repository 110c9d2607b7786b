//! Application services layer scaffolding.

pub mod detail;
pub mod error;
pub mod feed;
pub mod pagination;
pub mod preview;
pub mod repos;
