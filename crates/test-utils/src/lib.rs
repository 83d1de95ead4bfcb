//! Shared test utilities for ensemble crates.
//!
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`strategies`] - Proptest generators for membership documents

#![deny(unsafe_code)]

mod assertions;
pub use assertions::{assert_eventually, poll_until};

pub mod strategies;
