//! Gate child handlers behind a match on the start of the message.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use {
    async_trait::async_trait,
    chatter_common::text,
    regex::Regex,
    tracing::{debug, trace},
};

use crate::{
    error::{Error, Result},
    handler::{Context, Handler, Message, MessageHandler, Outcome},
};

/// Match function: `Ok(Some(remainder))` on match, `Ok(None)` otherwise.
pub type MatchFn = dyn Fn(&Message, &Context) -> anyhow::Result<Option<String>> + Send + Sync;

/// How a [`Matcher`] decides whether a message applies.
#[derive(Clone)]
pub enum MatchSpec {
    /// Literal prefix; the remainder has leading whitespace trimmed.
    Prefix(String),
    /// Regular expression anchored at the start of the message. The remainder
    /// is the `rest` capture group when present, otherwise the trimmed text
    /// after the match. Compiled on first dispatch.
    Pattern(String),
    /// Custom function with full control over the remainder.
    Func(Arc<MatchFn>),
}

impl MatchSpec {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Message, &Context) -> anyhow::Result<Option<String>> + Send + Sync + 'static,
    {
        Self::Func(Arc::new(f))
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Prefix(s) | Self::Pattern(s) => s.is_empty(),
            Self::Func(_) => false,
        }
    }
}

impl fmt::Debug for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            Self::Func(_) => f.write_str("Func"),
        }
    }
}

impl From<&str> for MatchSpec {
    fn from(prefix: &str) -> Self {
        Self::prefix(prefix)
    }
}

impl From<String> for MatchSpec {
    fn from(prefix: String) -> Self {
        Self::Prefix(prefix)
    }
}

/// Runs its children only when the message matches, passing them the
/// remainder instead of the full text.
pub struct Matcher {
    spec: MatchSpec,
    compiled: OnceLock<std::result::Result<Regex, String>>,
    children: Handler,
}

impl Matcher {
    pub fn new(spec: impl Into<MatchSpec>, children: impl Into<Handler>) -> Result<Self> {
        let spec = spec.into();
        if spec.is_empty() {
            return Err(Error::MissingMatch);
        }
        let children = children.into();
        if children.is_empty() {
            return Err(Error::MissingHandlers);
        }
        Ok(Self {
            spec,
            compiled: OnceLock::new(),
            children,
        })
    }

    pub fn spec(&self) -> &MatchSpec {
        &self.spec
    }

    /// Compute the remainder for `message`, or `None` when it does not match.
    pub fn remainder(&self, message: &Message, context: &Context) -> anyhow::Result<Option<String>> {
        let input = message.text();
        match &self.spec {
            MatchSpec::Prefix(prefix) => {
                Ok(text::strip_prefix_trimmed(input, prefix).map(str::to_string))
            },
            MatchSpec::Func(f) => f(message, context),
            MatchSpec::Pattern(pattern) => {
                let compiled = self
                    .compiled
                    .get_or_init(|| Regex::new(pattern).map_err(|e| e.to_string()));
                let re = compiled
                    .as_ref()
                    .map_err(|reason| Error::invalid_match(pattern.as_str(), reason))?;
                Ok(pattern_remainder(re, input))
            },
        }
    }
}

fn pattern_remainder(re: &Regex, text: &str) -> Option<String> {
    let captures = re.captures(text)?;
    let whole = captures.get(0)?;
    if whole.start() != 0 {
        return None;
    }
    if let Some(rest) = captures.name("rest") {
        return Some(rest.as_str().to_string());
    }
    text.get(whole.end()..).map(|rest| rest.trim_start().to_string())
}

#[async_trait]
impl MessageHandler for Matcher {
    async fn handle_message(&self, message: Message, context: Context) -> Outcome {
        let Some(remainder) = self.remainder(&message, &context)? else {
            trace!(spec = ?self.spec, "message did not match");
            return Ok(None);
        };
        debug!(spec = ?self.spec, remainder = %remainder, "message matched");
        self.children
            .dispatch(Message::Text(remainder), context)
            .await
    }
}

impl From<Matcher> for Handler {
    fn from(matcher: Matcher) -> Self {
        Self::object(matcher)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {super::*, crate::response::Response, rstest::rstest};

    fn echo_with_arg() -> Handler {
        Handler::sync(|message, context| {
            let arg = context.get(0).cloned().unwrap_or_default();
            Ok(Some(format!("{} {}", message.text(), arg).into()))
        })
    }

    fn nop() -> Handler {
        Handler::sync(|_, _| Ok(None))
    }

    #[test]
    fn construction_requires_match_and_children() {
        assert!(matches!(
            Matcher::new("", nop()),
            Err(Error::MissingMatch)
        ));
        assert!(matches!(
            Matcher::new(MatchSpec::pattern(""), nop()),
            Err(Error::MissingMatch)
        ));
        assert!(matches!(
            Matcher::new("foo", Handler::seq([])),
            Err(Error::MissingHandlers)
        ));
        assert!(Matcher::new("foo", nop()).is_ok());
        assert!(Matcher::new(MatchSpec::func(|_, _| Ok(None)), nop()).is_ok());
    }

    #[tokio::test]
    async fn children_only_run_on_match() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let matcher = Matcher::new(
            "foo",
            Handler::sync(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Response::text("yay")))
            }),
        )
        .unwrap();

        let out = matcher
            .handle_message("foo".into(), Context::new())
            .await
            .unwrap();
        assert_eq!(out, Some(Response::text("yay")));
        let out = matcher
            .handle_message("bar".into(), Context::new())
            .await
            .unwrap();
        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[case("foo bar")]
    #[case("foo    bar")]
    #[case("foo\t \nbar")]
    #[tokio::test]
    async fn prefix_remainder_is_trimmed(#[case] input: &str) {
        let matcher = Matcher::new("foo", echo_with_arg()).unwrap();
        let out = matcher
            .handle_message(input.into(), Context::new().with(1))
            .await
            .unwrap();
        assert_eq!(out, Some(Response::text("bar 1")));
    }

    #[tokio::test]
    async fn function_match_receives_message_and_context() {
        let spec = MatchSpec::func(|message, context| {
            let mut words = message.text().split(' ');
            let greeting = words.next().unwrap_or_default();
            let rest = words.next().unwrap_or_default();
            let arg = context.get(0).and_then(|v| v.as_str()).unwrap_or_default();
            Ok((greeting == "hello").then(|| format!("the {rest} is {arg}")))
        });
        let handler = Handler::sync(|message, context| {
            let arg = context.get(0).and_then(|v| v.as_str()).unwrap_or_default();
            Ok(Some(format!("{}, {arg}", message.text()).into()))
        });
        let matcher = Matcher::new(spec, handler).unwrap();
        let ctx = Context::new().with("me");

        let out = matcher
            .handle_message("hello world".into(), ctx.clone())
            .await
            .unwrap();
        assert_eq!(out, Some(Response::text("the world is me, me")));
        let out = matcher
            .handle_message("hello universe".into(), ctx.clone())
            .await
            .unwrap();
        assert_eq!(out, Some(Response::text("the universe is me, me")));
        let out = matcher
            .handle_message("goodbye world".into(), ctx)
            .await
            .unwrap();
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn match_function_errors_fail_dispatch() {
        let spec = MatchSpec::func(|message, _| anyhow::bail!("whoops {}", message.text()));
        let matcher = Matcher::new(spec, nop()).unwrap();
        let err = matcher
            .handle_message("foo".into(), Context::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("whoops foo"));
    }

    #[tokio::test]
    async fn invalid_pattern_fails_with_invalid_match() {
        let matcher = Matcher::new(MatchSpec::pattern("(unclosed"), nop()).unwrap();
        let err = matcher
            .handle_message("foo".into(), Context::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidMatch { pattern, .. }) if pattern == "(unclosed"
        ));
        assert!(err.to_string().to_lowercase().contains("invalid match"));
    }

    #[tokio::test]
    async fn pattern_must_match_at_start() {
        let matcher = Matcher::new(MatchSpec::pattern(r"(?i)yo+\b"), echo_with_arg()).unwrap();
        let out = matcher
            .handle_message("YOOO   lol".into(), Context::new().with("!"))
            .await
            .unwrap();
        assert_eq!(out, Some(Response::text("lol \"!\"")));
        let out = matcher
            .handle_message("not yo".into(), Context::new())
            .await
            .unwrap();
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn pattern_rest_capture_controls_remainder() {
        let matcher = Matcher::new(
            MatchSpec::pattern(r"^say (?P<rest>.+?)!*$"),
            Handler::sync(|message, _| Ok(Some(message.text().to_uppercase().into()))),
        )
        .unwrap();
        let out = matcher
            .handle_message("say hello!!!".into(), Context::new())
            .await
            .unwrap();
        assert_eq!(out, Some(Response::text("HELLO")));
    }

    #[tokio::test]
    async fn matcher_applies_to_parsed_input_text() {
        let args = crate::parser::ParseOptions::new().parse("foo bar");
        let matcher = Matcher::new("foo", echo_with_arg()).unwrap();
        let out = matcher
            .handle_message(Message::Args(args), Context::new().with(2))
            .await
            .unwrap();
        assert_eq!(out, Some(Response::text("bar 2")));
    }
}
