//! Host-facing JSON bridge: envelopes, command router, and stdio transport.

pub mod channel;
pub mod contract;
pub mod handler;
pub mod stdio;
