//! Handler results and their rendering as deliverable text.

use std::fmt;

use serde_json::Value;

use crate::handler::{Handler, Outcome};

/// A handled result.
///
/// "Not handled" is represented by `None` around a response, never by a
/// variant, so `Empty` still counts as handled.
#[derive(Clone)]
pub enum Response {
    Text(String),
    /// Rendered one item per line.
    Lines(Vec<Response>),
    Data(Value),
    Empty,
    /// A response that also installs `next` as the handler for the next
    /// message of the conversation. Only a [`Conversation`](crate::Conversation)
    /// acts on the dialog; elsewhere it renders as `response`.
    Dialog {
        response: Box<Response>,
        next: Handler,
    },
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn lines<I, R>(lines: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Response>,
    {
        Self::Lines(lines.into_iter().map(Into::into).collect())
    }

    pub fn dialog(response: impl Into<Response>, next: impl Into<Handler>) -> Self {
        Self::Dialog {
            response: Box::new(response.into()),
            next: next.into(),
        }
    }

    /// Render this response as the text a transport would deliver.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines
                .iter()
                .map(Self::to_text)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Data(Value::String(text)) => text.clone(),
            Self::Data(Value::Null) | Self::Empty => String::new(),
            Self::Data(value) => value.to_string(),
            Self::Dialog { response, .. } => response.to_text(),
        }
    }
}

/// Normalize a response into deliverable text.
pub fn normalize_response(response: &Response) -> String {
    response.to_text()
}

/// Shorthand for a handled outcome.
pub fn reply(response: impl Into<Response>) -> Outcome {
    Ok(Some(response.into()))
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Lines(lines) => f.debug_tuple("Lines").field(lines).finish(),
            Self::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Dialog { response, next } => f
                .debug_struct("Dialog")
                .field("response", response)
                .field("next", next)
                .finish(),
        }
    }
}

impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Lines(a), Self::Lines(b)) => a == b,
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Empty, Self::Empty) => true,
            (
                Self::Dialog {
                    response: a,
                    next: next_a,
                },
                Self::Dialog {
                    response: b,
                    next: next_b,
                },
            ) => a == b && next_a.ptr_eq(next_b),
            _ => false,
        }
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Response {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<Vec<Response>> for Response {
    fn from(lines: Vec<Response>) -> Self {
        Self::Lines(lines)
    }
}
