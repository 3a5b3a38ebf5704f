//! Network plumbing: the TLS HTTP transport over the embassy-net stack.

pub mod http;
