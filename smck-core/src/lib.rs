#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod element;
pub mod entities;
pub mod error;
pub mod processors;
pub mod testing;
pub mod utils;
pub mod verify;
