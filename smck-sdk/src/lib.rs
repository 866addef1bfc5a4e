#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

//! Shared wire types and the backend client for the SpotMe checkout
//! confirmation flow.
//!
//! The HTTP client lives behind the `client` cargo feature so downstream
//! crates that only need the shared types do not pull in `reqwest`.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
