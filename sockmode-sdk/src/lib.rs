//! Shared types for Slack Socket Mode applications.
//!
//! The `objects` module holds the wire shapes exchanged over the socket,
//! `token` validates credentials, and the optional `client` module (behind
//! the `client` feature) talks to the Web API and the WebSocket endpoint.

#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod token;
