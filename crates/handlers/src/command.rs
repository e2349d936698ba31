//! Named, self-documenting command trees.
//!
//! A command is assembled from the other building blocks: a [`Matcher`] on
//! the command name (skipped for anonymous commands), an optional [`Parser`]
//! for leaf arguments, and the child handlers. Parent commands append a help
//! fallback after their children, so `help`, `help <sub> ...` and an empty
//! remainder render usage text derived from the tree.

use std::sync::{Arc, OnceLock, Weak};

use {async_trait::async_trait, chatter_common::text, tracing::debug};

use crate::{
    error::{Error, Result},
    handler::{Context, Handler, Message, MessageHandler, Outcome},
    matcher::{MatchSpec, Matcher},
    parser::{ParseOptions, Parser},
    response::reply,
};

/// Keyword that asks a parent command for help.
pub const HELP_KEYWORD: &str = "help";

const PARENT_USAGE: &str = "<command>";

/// Declarative description of a command.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub usage: Option<String>,
    /// Parent commands select one of their children or show help.
    pub is_parent: bool,
    /// Marks the command for per-conversation caching.
    pub stateful: bool,
    /// Options parsed from a leaf command's remainder.
    pub parse_options: Option<ParseOptions>,
}

impl CommandOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A nameless grouping command that sees the full message.
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    #[must_use]
    pub fn parent(mut self) -> Self {
        self.is_parent = true;
        self
    }

    #[must_use]
    pub fn stateful(mut self, stateful: bool) -> Self {
        self.stateful = stateful;
        self
    }

    #[must_use]
    pub fn parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = Some(options);
        self
    }
}

struct CommandInfo {
    name: Option<String>,
    description: Option<String>,
    usage: Option<String>,
    is_parent: bool,
    children: Vec<Handler>,
    /// Set once when another command adopts this one as a child.
    parent: OnceLock<Weak<CommandInfo>>,
}

impl CommandInfo {
    /// Child commands, with anonymous grouping commands flattened.
    fn subcommands(&self) -> Vec<&Command> {
        let mut out = Vec::new();
        for child in &self.children {
            let Some(command) = child.as_command() else {
                continue;
            };
            if command.info.name.is_some() {
                out.push(command);
            } else {
                out.extend(command.info.subcommands());
            }
        }
        out
    }

    fn find_subcommand(&self, name: &str) -> Option<&Command> {
        self.subcommands().into_iter().find(|command| {
            command
                .info
                .name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }

    fn usage(&self) -> Option<&str> {
        match (&self.usage, self.is_parent) {
            (Some(usage), _) => Some(usage),
            (None, true) => Some(PARENT_USAGE),
            (None, false) => None,
        }
    }

    fn summary(&self) -> String {
        let head = [self.name.as_deref(), self.usage.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        match &self.description {
            Some(description) => format!("{head} - {description}"),
            None => head,
        }
    }

    /// Names from the root of the tree down to this command; anonymous
    /// commands contribute nothing.
    fn full_name(&self) -> String {
        let mut names: Vec<String> = self.name.iter().cloned().collect();
        let mut next = self.parent.get().and_then(Weak::upgrade);
        while let Some(info) = next {
            names.extend(info.name.iter().cloned());
            next = info.parent.get().and_then(Weak::upgrade);
        }
        names.reverse();
        names.join(" ")
    }

    fn render_help(&self) -> String {
        let full = self.full_name();
        let mut lines = Vec::new();

        let usage = [Some(full.as_str()), self.usage()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>();
        if !usage.is_empty() {
            lines.push(format!("Usage: {}", usage.join(" ")));
        }
        if let Some(description) = &self.description {
            lines.push(description.clone());
        }

        if self.is_parent {
            let subcommands = self.subcommands();
            if !subcommands.is_empty() {
                lines.push("Commands:".to_string());
                lines.extend(
                    subcommands
                        .iter()
                        .map(|command| format!("  {}", command.info.summary())),
                );
                let hint = if full.is_empty() {
                    format!("{HELP_KEYWORD} {PARENT_USAGE}")
                } else {
                    format!("{full} {HELP_KEYWORD} {PARENT_USAGE}")
                };
                lines.push(format!("For more, try: {hint}"));
            }
        }

        lines.join("\n")
    }

    /// Help for the descendant named by `path` (space-separated names).
    fn help_for(&self, path: &str) -> String {
        let mut current = self;
        for word in text::tokens(path) {
            let Some(command) = current.find_subcommand(word) else {
                return format!("Unknown command: {word}\n{}", self.render_help());
            };
            current = command.info.as_ref();
        }
        current.render_help()
    }

    /// Link each direct child command back to `info` so help renders the
    /// full path. A command adopted by two parents keeps the first.
    fn adopt_children(info: &Arc<CommandInfo>) {
        for command in info.children.iter().filter_map(Handler::as_command) {
            if command.info.parent.set(Arc::downgrade(info)).is_err() {
                debug!(command = ?command.info.name, "command already has a parent");
            }
        }
    }
}

/// Appended to a parent's children; answers `help ...` and empty input.
fn help_fallback(info: Arc<CommandInfo>) -> Handler {
    Handler::sync(move |message, _| {
        let (word, rest) = text::split_word(message.text());
        if word.is_empty() {
            debug!(command = ?info.name, "empty remainder, showing help");
            return reply(info.render_help());
        }
        if word.eq_ignore_ascii_case(HELP_KEYWORD) {
            debug!(command = ?info.name, path = rest, "showing help");
            return reply(info.help_for(rest));
        }
        Ok(None)
    })
}

/// A named (or anonymous) node in a command tree.
pub struct Command {
    info: Arc<CommandInfo>,
    handler: Handler,
    stateful: bool,
}

impl Command {
    pub fn new(options: CommandOptions, children: impl Into<Handler>) -> Result<Self> {
        let children = children.into().children();
        if children.is_empty() {
            return Err(Error::MissingHandlers);
        }
        if options.name.as_deref().is_some_and(str::is_empty) {
            return Err(Error::MissingMatch);
        }

        let info = Arc::new(CommandInfo {
            name: options.name,
            description: options.description,
            usage: options.usage,
            is_parent: options.is_parent,
            children,
            parent: OnceLock::new(),
        });
        CommandInfo::adopt_children(&info);

        let body = if info.is_parent {
            let mut chain = info.children.clone();
            chain.push(help_fallback(Arc::clone(&info)));
            Handler::seq(chain)
        } else {
            let target = Handler::seq(info.children.clone());
            match options.parse_options {
                Some(parse_options) => Parser::new(target)?.with_options(parse_options).into(),
                None => target,
            }
        };

        let handler = match info.name.clone() {
            Some(name) => {
                let spec = MatchSpec::func(move |message, _| {
                    Ok(text::strip_word(message.text(), &name).map(str::to_string))
                });
                Matcher::new(spec, body)?.into()
            },
            None => body,
        };

        Ok(Self {
            info,
            handler,
            stateful: options.stateful,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.info.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.info.description.as_deref()
    }

    pub fn usage(&self) -> Option<&str> {
        self.info.usage.as_deref()
    }

    pub fn is_parent(&self) -> bool {
        self.info.is_parent
    }

    pub fn children(&self) -> &[Handler] {
        &self.info.children
    }

    pub fn subcommands(&self) -> Vec<&Command> {
        self.info.subcommands()
    }

    /// One-line `name usage - description` summary.
    pub fn summary(&self) -> String {
        self.info.summary()
    }

    pub fn help(&self) -> String {
        self.info.render_help()
    }

    /// Help for a descendant, e.g. `"math add"`.
    pub fn help_for(&self, path: &str) -> String {
        self.info.help_for(path)
    }
}

#[async_trait]
impl MessageHandler for Command {
    async fn handle_message(&self, message: Message, context: Context) -> Outcome {
        self.handler.dispatch(message, context).await
    }

    fn has_state(&self) -> bool {
        self.stateful
    }

    fn as_command(&self) -> Option<&Command> {
        Some(self)
    }
}

impl From<Command> for Handler {
    fn from(command: Command) -> Self {
        Self::object(command)
    }
}
