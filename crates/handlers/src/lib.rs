//! Message handler protocol for conversational bots.
//!
//! A [`Handler`] is one of three shapes: an async function, an ordered
//! sequence of handlers, or an object implementing [`MessageHandler`].
//! Dispatch resolves a handler against a message and yields
//! `Some(Response)` when it handled the message, or `None` when it did not.
//!
//! The building blocks compose into trees:
//! - [`Matcher`] gates children behind a prefix, pattern, or match function
//!   and hands them the remainder of the message;
//! - [`Parser`] tokenizes the message into positional args and typed options;
//! - [`Command`] combines both into named, self-documenting command trees;
//! - [`Conversation`] keeps a one-shot dialog handler between messages.

pub mod command;
pub mod conversation;
pub mod error;
pub mod handler;
pub mod matcher;
pub mod parser;
pub mod response;

pub use {
    command::{Command, CommandOptions},
    conversation::Conversation,
    error::{Error, Result},
    handler::{Context, Handler, HandlerFuture, Message, MessageHandler, Outcome, dispatch},
    matcher::{MatchSpec, Matcher},
    parser::{OptionKind, OptionValue, ParseError, ParseOptions, ParsedArgs, Parser},
    response::{Response, normalize_response, reply},
};
