//! Domain types and pure logic for proposal-generation tracking.
//!
//! Defines the [`ProposalSnapshot`] lattice (status ordering, monotonic
//! field merge), the full [`Proposal`] record, the push-channel update
//! payload, and validated generation requests.  No I/O lives here.

pub mod merge;
pub mod proposal;
pub mod request;
pub mod status;

/// Backend proposal ids are integer primary keys.
pub type ProposalId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
