//! Shared error plumbing and text utilities used across all chatter crates.

pub mod error;
pub mod text;

pub use error::FromMessage;
