//! Split free text into positional args and typed `name=value` options.

use std::collections::BTreeMap;

use {
    async_trait::async_trait,
    chatter_common::text,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    handler::{Context, Handler, Message, MessageHandler, Outcome},
};

/// How an option value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    String,
    Number,
    Boolean,
}

/// A coerced option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Number(_) | Self::Boolean(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(_) | Self::Boolean(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::String(_) | Self::Number(_) => None,
        }
    }
}

/// Non-fatal problems collected while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    #[error("invalid value {value:?} for option {option}: expected a {expected:?}")]
    InvalidOption {
        option: String,
        value: String,
        expected: OptionKind,
    },

    #[error("ambiguous option {token:?}: could be any of {candidates:?}")]
    AmbiguousOption {
        token: String,
        candidates: Vec<String>,
    },
}

/// Structured form of a message, handed to a parser's children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedArgs {
    /// The text that was parsed.
    pub input: String,
    pub options: BTreeMap<String, OptionValue>,
    /// Positional tokens in their original order.
    pub remain: Vec<String>,
    pub errors: Vec<ParseError>,
}

impl ParsedArgs {
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(OptionValue::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.option(name).and_then(OptionValue::as_f64)
    }

    /// A missing boolean option reads as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.option(name)
            .and_then(OptionValue::as_bool)
            .unwrap_or(false)
    }

    pub fn args(&self) -> &[String] {
        &self.remain
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

enum Resolved<'a> {
    Declared(&'a str, OptionKind),
    Ambiguous(Vec<String>),
    Unknown,
}

/// Declared options, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    options: Vec<(String, OptionKind)>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name`; redeclaring replaces the previous kind.
    #[must_use]
    pub fn option(mut self, name: impl Into<String>, kind: OptionKind) -> Self {
        let name = name.into();
        match self.options.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = kind,
            None => self.options.push((name, kind)),
        }
        self
    }

    #[must_use]
    pub fn string(self, name: impl Into<String>) -> Self {
        self.option(name, OptionKind::String)
    }

    #[must_use]
    pub fn number(self, name: impl Into<String>) -> Self {
        self.option(name, OptionKind::Number)
    }

    #[must_use]
    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.option(name, OptionKind::Boolean)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, OptionKind)> {
        self.options.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Exact names win; otherwise a token may abbreviate exactly one name.
    fn resolve(&self, token: &str) -> Resolved<'_> {
        if token.is_empty() {
            return Resolved::Unknown;
        }
        if let Some((name, kind)) = self.options.iter().find(|(name, _)| name == token) {
            return Resolved::Declared(name, *kind);
        }
        let mut candidates = self
            .options
            .iter()
            .filter(|(name, _)| name.starts_with(token));
        match (candidates.next(), candidates.next()) {
            (None, _) => Resolved::Unknown,
            (Some((name, kind)), None) => Resolved::Declared(name, *kind),
            (Some(first), Some(second)) => Resolved::Ambiguous(
                [first, second]
                    .into_iter()
                    .chain(candidates)
                    .map(|(name, _)| name.clone())
                    .collect(),
            ),
        }
    }

    /// Tokenize `input` on whitespace and pull out declared options.
    pub fn parse(&self, input: &str) -> ParsedArgs {
        let mut args = ParsedArgs {
            input: input.to_string(),
            ..ParsedArgs::default()
        };

        for token in text::tokens(input) {
            let Some((key, value)) = token.split_once('=') else {
                args.remain.push(token.to_string());
                continue;
            };
            match self.resolve(key) {
                Resolved::Unknown => args.remain.push(token.to_string()),
                Resolved::Ambiguous(candidates) => {
                    args.errors.push(ParseError::AmbiguousOption {
                        token: key.to_string(),
                        candidates,
                    });
                    args.remain.push(token.to_string());
                },
                Resolved::Declared(name, kind) => match coerce(value, kind) {
                    Some(coerced) => {
                        args.options.insert(name.to_string(), coerced);
                    },
                    None => args.errors.push(ParseError::InvalidOption {
                        option: name.to_string(),
                        value: value.to_string(),
                        expected: kind,
                    }),
                },
            }
        }

        args
    }
}

impl<S: Into<String>> FromIterator<(S, OptionKind)> for ParseOptions {
    fn from_iter<I: IntoIterator<Item = (S, OptionKind)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |options, (name, kind)| options.option(name, kind))
    }
}

fn coerce(value: &str, kind: OptionKind) -> Option<OptionValue> {
    match kind {
        OptionKind::String => Some(OptionValue::String(value.to_string())),
        OptionKind::Number if value.trim().is_empty() => Some(OptionValue::Number(0.0)),
        OptionKind::Number => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(OptionValue::Number),
        OptionKind::Boolean => Some(OptionValue::Boolean(parse_bool(value))),
    }
}

fn parse_bool(value: &str) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" => true,
        "false" | "no" | "n" | "off" | "" => false,
        other => other.parse::<f64>().is_ok_and(|n| n != 0.0 && !n.is_nan()),
    }
}

/// Hands its children a [`Message::Args`] built from the message text.
pub struct Parser {
    options: ParseOptions,
    children: Handler,
}

impl Parser {
    pub fn new(children: impl Into<Handler>) -> Result<Self> {
        let children = children.into();
        if children.is_empty() {
            return Err(Error::MissingHandlers);
        }
        Ok(Self {
            options: ParseOptions::default(),
            children,
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse(&self, input: &str) -> ParsedArgs {
        self.options.parse(input)
    }
}

#[async_trait]
impl MessageHandler for Parser {
    async fn handle_message(&self, message: Message, context: Context) -> Outcome {
        let args = self.parse(message.text());
        debug!(
            positional = args.remain.len(),
            options = args.options.len(),
            errors = args.errors.len(),
            "parsed message arguments"
        );
        self.children.dispatch(Message::Args(args), context).await
    }
}

impl From<Parser> for Handler {
    fn from(parser: Parser) -> Self {
        Self::object(parser)
    }
}
