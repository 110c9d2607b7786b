//! Presentation layer: view structs and template rendering helpers.

pub mod views;
