//! Route inbound messages to per-conversation handlers and deliver replies.
//!
//! A [`ConversationRouter`] asks its factory for a handler on every message
//! and keeps the ones that report state, so a conversation talks to the same
//! instance until it is forgotten. A [`Bot`] ties the router to a
//! [`Transport`] that knows how to identify, read and answer messages.

pub mod bot;
pub mod error;
pub mod router;

pub use {
    bot::{Bot, Delivery, Transport},
    error::Error,
    router::{ConversationRouter, HandlerFactory},
};
