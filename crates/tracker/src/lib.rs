//! Proposal job tracking: submission, dual-channel updates, reconciliation.
//!
//! A [`TrackingSession`](session::TrackingSession) submits a brief,
//! then converges on a terminal state by racing two update sources --
//! the push listener and a fixed-interval poll loop -- through a single
//! [`Reconciler`](reconcile::Reconciler).  The reconciler owns the
//! current snapshot; feeders only ever submit candidates over a channel.

pub mod poll;
pub mod reconcile;
pub mod session;
pub mod source;

pub use reconcile::{Reconciler, TrackerState};
pub use session::{SessionHandle, TrackingSession};
pub use source::ProposalSource;
