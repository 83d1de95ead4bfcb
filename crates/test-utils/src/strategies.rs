//! Proptest strategies for membership documents.
//!
//! Generators produce well-formed [`MembershipDocument`] values, which can be
//! rendered with `Display` and fed back through the parser.
//!
//! # Usage
//!
//! ```no_run
//! use ensemble_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(document in strategies::arb_membership_document()) {
//!         // test invariant with a randomly generated document
//!     }
//! }
//! ```

use ensemble_types::{MembershipDocument, ServerEntry, ServerRole};
use proptest::prelude::*;

/// Generates a host name or IPv4 literal without delimiter characters.
pub fn arb_host() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9-]{0,14}(\\.[a-z][a-z0-9]{0,7}){0,2}",
        (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
            .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
    ]
}

/// Generates a non-zero port.
pub fn arb_port() -> impl Strategy<Value = u16> {
    1u16..=u16::MAX
}

/// Generates a server role, weighted towards participants.
pub fn arb_role() -> impl Strategy<Value = ServerRole> {
    prop_oneof![3 => Just(ServerRole::Participant), 1 => Just(ServerRole::Observer)]
}

/// Generates a server entry with the given id.
pub fn arb_server_entry(id: u64) -> impl Strategy<Value = ServerEntry> {
    (arb_host(), arb_port(), arb_port(), arb_role(), arb_host(), arb_port()).prop_map(
        move |(host, peer_port, election_port, role, client_host, client_port)| ServerEntry {
            id,
            host,
            peer_port,
            election_port,
            role,
            client_host,
            client_port,
        },
    )
}

/// Generates a document with 0-9 members, ids ascending from 1.
pub fn arb_membership_document() -> impl Strategy<Value = MembershipDocument> {
    (0usize..10, any::<i64>())
        .prop_flat_map(|(count, version)| {
            let servers: Vec<_> = (1..=count as u64).map(arb_server_entry).collect();
            (servers, Just(version))
        })
        .prop_map(|(servers, version)| MembershipDocument { version, servers })
}
