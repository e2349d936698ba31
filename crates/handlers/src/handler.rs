//! The dispatch protocol shared by every handler shape.

use std::{fmt, future::Future, sync::Arc};

use {
    async_trait::async_trait,
    futures::future::{BoxFuture, FutureExt},
    serde::Serialize,
    serde_json::Value,
    tracing::{debug, trace},
};

use crate::{command::Command, parser::ParsedArgs, response::Response};

/// Result of a dispatch: `Ok(None)` means the message was not handled.
pub type Outcome = anyhow::Result<Option<Response>>;

/// Boxed future returned by function handlers.
pub type HandlerFuture = BoxFuture<'static, Outcome>;

type HandlerFn = dyn Fn(Message, Context) -> HandlerFuture + Send + Sync;

// ── Message ─────────────────────────────────────────────────────────────────

/// First argument of every dispatch.
///
/// Raw text flows through matchers; a [`Parser`](crate::Parser) replaces it
/// with the structured [`ParsedArgs`] for its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Text(String),
    Args(ParsedArgs),
}

impl Message {
    /// The text this message was built from.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Args(args) => &args.input,
        }
    }

    pub fn as_args(&self) -> Option<&ParsedArgs> {
        match self {
            Self::Args(args) => Some(args),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<ParsedArgs> for Message {
    fn from(args: ParsedArgs) -> Self {
        Self::Args(args)
    }
}

// ── Context ─────────────────────────────────────────────────────────────────

/// Extra dispatch-time arguments, passed unchanged to every nested handler
/// and match function. Cloning is cheap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    args: Arc<[Value]>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of this context with `arg` appended.
    #[must_use]
    pub fn with(&self, arg: impl Into<Value>) -> Self {
        let mut args = self.args.to_vec();
        args.push(arg.into());
        Self { args: args.into() }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl<V: Into<Value>> FromIterator<V> for Context {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ── MessageHandler trait ────────────────────────────────────────────────────

/// Object-shaped handler.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle the message, returning `Ok(None)` when it does not apply.
    async fn handle_message(&self, message: Message, context: Context) -> Outcome;

    /// Whether a conversation router should keep this instance for later
    /// messages of the same conversation. Fixed at construction.
    fn has_state(&self) -> bool {
        false
    }

    /// Command metadata, used to build help for parent commands.
    fn as_command(&self) -> Option<&Command> {
        None
    }
}

// ── Handler ─────────────────────────────────────────────────────────────────

/// A message handler: function, ordered sequence, or [`MessageHandler`].
#[derive(Clone)]
pub enum Handler {
    Func(Arc<HandlerFn>),
    Seq(Arc<[Handler]>),
    Object(Arc<dyn MessageHandler>),
}

impl Handler {
    /// Wrap an async function.
    pub fn func<F, Fut>(f: F) -> Self
    where
        F: Fn(Message, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        Self::Func(Arc::new(
            move |message: Message, context: Context| -> HandlerFuture {
                f(message, context).boxed()
            },
        ))
    }

    /// Wrap a synchronous function; its result becomes a ready future.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Message, &Context) -> Outcome + Send + Sync + 'static,
    {
        Self::Func(Arc::new(
            move |message: Message, context: Context| -> HandlerFuture {
                futures::future::ready(f(&message, &context)).boxed()
            },
        ))
    }

    /// An ordered sequence; the first child that handles the message wins.
    pub fn seq(handlers: impl IntoIterator<Item = Handler>) -> Self {
        Self::Seq(handlers.into_iter().collect())
    }

    pub fn object(handler: impl MessageHandler + 'static) -> Self {
        Self::Object(Arc::new(handler))
    }

    /// True for a sequence without children.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Seq(children) if children.is_empty())
    }

    /// Only object handlers can carry state.
    pub fn has_state(&self) -> bool {
        match self {
            Self::Object(handler) => handler.has_state(),
            Self::Func(_) | Self::Seq(_) => false,
        }
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Self::Object(handler) => handler.as_command(),
            Self::Func(_) | Self::Seq(_) => None,
        }
    }

    /// Direct children: the items of a sequence, or the handler itself.
    pub fn children(&self) -> Vec<Handler> {
        match self {
            Self::Seq(children) => children.to_vec(),
            Self::Func(_) | Self::Object(_) => vec![self.clone()],
        }
    }

    /// Whether both handles point at the same underlying handler.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Func(a), Self::Func(b)) => Arc::ptr_eq(a, b),
            (Self::Seq(a), Self::Seq(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Func(_) => "func",
            Self::Seq(_) => "seq",
            Self::Object(_) => "object",
        }
    }

    /// Resolve this handler against `message`.
    ///
    /// Sequences await each child in order and stop at the first one that
    /// handles the message. Errors from any handler fail the dispatch.
    pub fn dispatch(&self, message: Message, context: Context) -> BoxFuture<'_, Outcome> {
        async move {
            trace!(shape = self.shape(), "dispatching message");
            match self {
                Self::Func(f) => f(message, context).await,
                Self::Object(handler) => handler.handle_message(message, context).await,
                Self::Seq(children) => {
                    for (index, child) in children.iter().enumerate() {
                        let outcome = child.dispatch(message.clone(), context.clone()).await?;
                        if let Some(response) = outcome {
                            debug!(index, "sequence child handled message");
                            return Ok(Some(response));
                        }
                    }
                    Ok(None)
                },
            }
        }
        .boxed()
    }
}

/// Dispatch `message` to `handler` with the given context.
pub async fn dispatch(handler: &Handler, message: impl Into<Message>, context: Context) -> Outcome {
    handler.dispatch(message.into(), context).await
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Func(_) => f.write_str("Handler::Func"),
            Self::Seq(children) => f.debug_tuple("Handler::Seq").field(children).finish(),
            Self::Object(handler) => match handler.as_command() {
                Some(command) => f
                    .debug_tuple("Handler::Object")
                    .field(&command.name().unwrap_or("<anonymous>"))
                    .finish(),
                None => f.write_str("Handler::Object"),
            },
        }
    }
}

impl From<Vec<Handler>> for Handler {
    fn from(handlers: Vec<Handler>) -> Self {
        Self::seq(handlers)
    }
}

impl<const N: usize> From<[Handler; N]> for Handler {
    fn from(handlers: [Handler; N]) -> Self {
        Self::seq(handlers)
    }
}

impl From<Arc<dyn MessageHandler>> for Handler {
    fn from(handler: Arc<dyn MessageHandler>) -> Self {
        Self::Object(handler)
    }
}
