//! Client-Facing HTTP API
//!
//! Expression submission and retrieval plus account endpoints. Authorization
//! happens here: handlers resolve the bearer token to an owner principal
//! before anything reaches the scheduler, and reads are served from the
//! Store, which owns the durable view.

pub mod handlers;
pub mod types;
