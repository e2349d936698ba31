//! Glue between a chat service and a [`ConversationRouter`].

use std::{fmt, hash::Hash};

use {
    anyhow::Context as _,
    async_trait::async_trait,
    chatter_config::BotConfig,
    chatter_handlers::{Context, normalize_response},
    tracing::{debug, error, warn},
};

use crate::{error::Error, router::ConversationRouter};

/// A chat service as seen by a [`Bot`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Inbound message type of the service.
    type Message: Send + Sync;
    /// Key that groups messages into conversations.
    type Id: Eq + Hash + Clone + fmt::Debug + Send + Sync;

    fn conversation_id(&self, message: &Self::Message) -> Self::Id;

    fn message_text(&self, message: &Self::Message) -> String;

    /// Extra dispatch arguments for the handlers. Empty by default.
    fn context(&self, _message: &Self::Message) -> Context {
        Context::new()
    }

    /// Deliver `text` in reply to `message`.
    async fn send_response(&self, message: &Self::Message, text: &str) -> anyhow::Result<()>;
}

/// What [`Bot::on_message`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A handler answered and this text was sent.
    Replied(String),
    /// A handler answered with nothing to send.
    Silent,
    /// No handler took the message; the configured fallback, if any, was sent.
    Unhandled(Option<String>),
}

pub struct Bot<T: Transport> {
    transport: T,
    router: ConversationRouter<T::Id>,
    config: BotConfig,
}

impl<T: Transport> Bot<T> {
    pub fn new(transport: T, router: ConversationRouter<T::Id>, config: BotConfig) -> Self {
        Self {
            transport,
            router,
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn router(&self) -> &ConversationRouter<T::Id> {
        &self.router
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Route `message` to its conversation's handler and send the reply.
    ///
    /// Handler failures are logged, answered with `error_reply` when one is
    /// configured, and returned.
    pub async fn on_message(&self, message: &T::Message) -> anyhow::Result<Delivery> {
        let id = self.transport.conversation_id(message);
        let text = self.transport.message_text(message);
        let bot = self.config.name.as_deref().unwrap_or_default();
        debug!(bot, conversation = ?id, text = %text, "message received");

        let outcome = self
            .router
            .handle_message(&id, text, self.transport.context(message))
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    bot,
                    conversation = ?id,
                    error = %format!("{e:#}"),
                    "message handling failed"
                );
                if let Some(reply) = self.config.error_reply.as_deref()
                    && let Err(send_err) = self.send(&id, message, reply).await
                {
                    error!(
                        bot,
                        conversation = ?id,
                        error = %format!("{send_err:#}"),
                        "failed to send error reply"
                    );
                }
                return Err(e);
            },
        };

        let Some(response) = response else {
            debug!(bot, conversation = ?id, "message not handled");
            let fallback = self.config.unhandled_reply.clone();
            if let Some(reply) = fallback.as_deref() {
                self.send(&id, message, reply).await?;
            }
            return Ok(Delivery::Unhandled(fallback));
        };

        let reply = normalize_response(&response);
        if reply.trim().is_empty() {
            return Ok(Delivery::Silent);
        }
        self.send(&id, message, &reply).await?;
        Ok(Delivery::Replied(reply))
    }

    async fn send(&self, id: &T::Id, message: &T::Message, text: &str) -> anyhow::Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.transport
            .send_response(message, text)
            .await
            .with_context(|| Error::Delivery {
                conversation: format!("{id:?}"),
            })
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for Bot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("transport", &self.transport)
            .field("router", &self.router)
            .field("config", &self.config)
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {
        super::*,
        chatter_handlers::{Handler, Response, reply},
    };

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
        fail_sends: bool,
    }

    struct Inbound {
        user: &'static str,
        text: &'static str,
    }

    #[async_trait]
    impl Transport for Recorder {
        type Id = String;
        type Message = Inbound;

        fn conversation_id(&self, message: &Inbound) -> String {
            message.user.to_string()
        }

        fn message_text(&self, message: &Inbound) -> String {
            message.text.to_string()
        }

        fn context(&self, message: &Inbound) -> Context {
            Context::new().with(message.user)
        }

        async fn send_response(&self, message: &Inbound, text: &str) -> anyhow::Result<()> {
            if self.fail_sends {
                anyhow::bail!("connection reset");
            }
            self.sent
                .lock()
                .unwrap()
                .push((message.user.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn handler() -> Handler {
        Handler::sync(|message, context| match message.text() {
            "boom" => anyhow::bail!("kaboom"),
            "quiet" => Ok(Some(Response::Empty)),
            "blank" => reply("   "),
            "list" => reply(Response::lines(["one", "two"])),
            "hi" => reply(format!("hi {}", context.get(0).and_then(|v| v.as_str()).unwrap_or("?"))),
            _ => Ok(None),
        })
    }

    fn bot(config: BotConfig, fail_sends: bool) -> Bot<Recorder> {
        let transport = Recorder {
            fail_sends,
            ..Default::default()
        };
        Bot::new(transport, ConversationRouter::new(|_| Ok(handler())), config)
    }

    fn sent(bot: &Bot<Recorder>) -> Vec<(String, String)> {
        bot.transport().sent.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn replies_are_normalized_and_sent() {
        let bot = bot(BotConfig::default(), false);
        let out = bot.on_message(&Inbound { user: "joe", text: "hi" }).await.unwrap();
        assert_eq!(out, Delivery::Replied("hi joe".into()));
        let out = bot.on_message(&Inbound { user: "joe", text: "list" }).await.unwrap();
        assert_eq!(out, Delivery::Replied("one\ntwo".into()));
        assert_eq!(sent(&bot), vec![
            ("joe".to_string(), "hi joe".to_string()),
            ("joe".to_string(), "one\ntwo".to_string()),
        ]);
    }

    #[tokio::test]
    async fn empty_responses_send_nothing() {
        let bot = bot(BotConfig::default(), false);
        let out = bot.on_message(&Inbound { user: "joe", text: "quiet" }).await.unwrap();
        assert_eq!(out, Delivery::Silent);
        assert!(sent(&bot).is_empty());
    }

    #[tokio::test]
    async fn whitespace_replies_are_silent() {
        let bot = bot(BotConfig::default(), false);
        let out = bot.on_message(&Inbound { user: "joe", text: "blank" }).await.unwrap();
        assert_eq!(out, Delivery::Silent);
        assert!(sent(&bot).is_empty());
    }

    #[tokio::test]
    async fn unhandled_messages_use_the_configured_fallback() {
        let quiet = bot(BotConfig::default(), false);
        let out = quiet.on_message(&Inbound { user: "joe", text: "??" }).await.unwrap();
        assert_eq!(out, Delivery::Unhandled(None));
        assert!(sent(&quiet).is_empty());

        let chatty = bot(
            BotConfig {
                unhandled_reply: Some("Sorry, I didn't get that.".into()),
                ..Default::default()
            },
            false,
        );
        let out = chatty.on_message(&Inbound { user: "joe", text: "??" }).await.unwrap();
        assert_eq!(out, Delivery::Unhandled(Some("Sorry, I didn't get that.".into())));
        assert_eq!(sent(&chatty), vec![(
            "joe".to_string(),
            "Sorry, I didn't get that.".to_string()
        )]);
    }

    #[tokio::test]
    async fn handler_errors_send_error_reply_and_propagate() {
        let bot = bot(
            BotConfig {
                error_reply: Some("Something went wrong.".into()),
                ..Default::default()
            },
            false,
        );
        let err = bot
            .on_message(&Inbound { user: "joe", text: "boom" })
            .await
            .unwrap_err();
        assert_eq!(err.root_cause().to_string(), "kaboom");
        assert_eq!(sent(&bot), vec![(
            "joe".to_string(),
            "Something went wrong.".to_string()
        )]);
    }

    #[tokio::test]
    async fn transport_failures_are_returned() {
        let bot = bot(BotConfig::default(), true);
        let err = bot
            .on_message(&Inbound { user: "joe", text: "hi" })
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Delivery { conversation }) if conversation == "\"joe\""
        ));
    }
}
