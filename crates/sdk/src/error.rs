//! SDK-specific error types.
//!
//! Errors fall into two groups:
//! - **Terminal**: the connection is closing or its session has expired.
//!   These stop background work permanently.
//! - **Transient**: failed reads, rejected host lists, malformed membership
//!   documents. Background work logs them and tries again later.
//!
//! DNS failures inside host selection never surface here; see
//! [`ResolveError`](crate::ResolveError).

use ensemble_types::ParseError;
use snafu::{Location, Snafu};

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK error types with context-rich error messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SdkError {
    /// Configuration validation error.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// A host provider was given no candidates.
    #[snafu(display("Host list cannot be empty"))]
    EmptyHostList,

    /// A host provider refused a candidate list.
    #[snafu(display("Host list rejected: {message}"))]
    HostList {
        /// Rejection reason.
        message: String,
    },

    /// The connection is permanently closing.
    #[snafu(display("Connection closing"))]
    Closing,

    /// The session expired and cannot be recovered.
    #[snafu(display("Session expired"))]
    SessionExpired,

    /// Reading a node failed for a reason worth retrying.
    #[snafu(display("Read of {path} failed at {location}: {message}"))]
    Read {
        /// Node path.
        path: String,
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The membership node held a malformed document.
    #[snafu(display("Invalid membership document: {source}"))]
    Membership {
        /// Underlying parse error with line context.
        source: ParseError,
    },
}

impl SdkError {
    /// Returns true if the error means the connection is gone for good.
    ///
    /// Terminal errors:
    /// - `Closing`: the client is shutting down
    /// - `SessionExpired`: the session cannot be resumed
    ///
    /// Everything else is transient from the point of view of background
    /// membership refresh.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Closing | Self::SessionExpired => true,
            Self::Config { .. }
            | Self::EmptyHostList
            | Self::HostList { .. }
            | Self::Read { .. }
            | Self::Membership { .. } => false,
        }
    }
}
