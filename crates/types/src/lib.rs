//! Core membership types and errors for ensemble clients.
//!
//! This crate provides the foundational types shared by the client SDK:
//! - [`MembershipDocument`] and [`ServerEntry`], the parsed form of the
//!   ensemble's live configuration node
//! - The line-oriented membership parser
//! - Error types using snafu

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod membership;

pub use error::{ParseError, Result, UnknownServerRole};
pub use membership::{MEMBERSHIP_PATH, MembershipDocument, ServerEntry, ServerRole};
