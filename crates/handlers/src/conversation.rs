//! Multi-step exchanges on top of a handler tree.

use std::sync::{Mutex, PoisonError};

use {async_trait::async_trait, tracing::debug};

use crate::{
    error::{Error, Result},
    handler::{Context, Handler, Message, MessageHandler, Outcome},
    response::Response,
};

/// Stateful wrapper that supports multi-step exchanges.
///
/// A child may answer with [`Response::Dialog`]; its `next` handler then
/// gets the first chance at the following message. The dialog is consumed
/// when that message arrives, and if it does not handle the message the
/// regular children are tried.
pub struct Conversation {
    children: Handler,
    dialog: Mutex<Option<Handler>>,
}

impl Conversation {
    pub fn new(children: impl Into<Handler>) -> Result<Self> {
        let children = children.into();
        if children.is_empty() {
            return Err(Error::MissingHandlers);
        }
        Ok(Self {
            children,
            dialog: Mutex::new(None),
        })
    }

    pub fn has_pending_dialog(&self) -> bool {
        self.dialog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn take_dialog(&self) -> Option<Handler> {
        self.dialog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn set_dialog(&self, next: Handler) {
        *self.dialog.lock().unwrap_or_else(PoisonError::into_inner) = Some(next);
    }
}

#[async_trait]
impl MessageHandler for Conversation {
    async fn handle_message(&self, message: Message, context: Context) -> Outcome {
        let mut outcome = None;
        if let Some(dialog) = self.take_dialog() {
            debug!("dispatching to pending dialog");
            outcome = dialog.dispatch(message.clone(), context.clone()).await?;
        }
        if outcome.is_none() {
            outcome = self.children.dispatch(message, context).await?;
        }

        match outcome {
            Some(Response::Dialog { response, next }) => {
                debug!("dialog installed for next message");
                self.set_dialog(next);
                Ok(Some(*response))
            },
            other => Ok(other),
        }
    }

    fn has_state(&self) -> bool {
        true
    }
}

impl From<Conversation> for Handler {
    fn from(conversation: Conversation) -> Self {
        Self::object(conversation)
    }
}
