//! Push-notification listener for proposal job updates.
//!
//! Connects to the backend's Pusher-compatible WebSocket transport,
//! authorizes the per-user private channel with the session's bearer
//! credential, and forwards `ProposalGenerated` events for one tracked
//! job onto an mpsc channel.  Every transport failure degrades silently
//! to "no push updates available" -- the poll fallback carries the job.

pub mod auth;
pub mod config;
pub mod listener;
pub mod protocol;

pub use config::PushConfig;
pub use listener::PushListener;
