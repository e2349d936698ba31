use std::{fmt, hash::Hash, sync::Arc};

use {
    anyhow::Context as _,
    chatter_handlers::{Context, Handler, Message, Outcome},
    dashmap::{DashMap, mapref::entry::Entry},
    tracing::{debug, trace},
};

use crate::error::Error;

/// Builds the handler for a conversation id.
pub type HandlerFactory<Id> = dyn Fn(&Id) -> anyhow::Result<Handler> + Send + Sync;

/// Resolves a handler per conversation, caching the stateful ones.
///
/// The factory runs for every message of a conversation whose handler is
/// not cached. A handler that reports [`Handler::has_state`] is stored and
/// reused until [`forget`](Self::forget) or [`clear`](Self::clear); a
/// stateless one is used once and dropped.
pub struct ConversationRouter<Id> {
    factory: Arc<HandlerFactory<Id>>,
    cache: DashMap<Id, Handler>,
}

impl<Id> ConversationRouter<Id>
where
    Id: Eq + Hash + Clone + fmt::Debug + Send + Sync,
{
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&Id) -> anyhow::Result<Handler> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            cache: DashMap::new(),
        }
    }

    /// The handler for `id`: the cached one, or a fresh one from the factory.
    ///
    /// When two tasks race to create a stateful handler for the same id, the
    /// first insert wins and both get that instance.
    pub fn get_message_handler(&self, id: &Id) -> anyhow::Result<Handler> {
        if let Some(cached) = self.cache.get(id) {
            trace!(conversation = ?id, "using cached handler");
            return Ok(cached.value().clone());
        }

        let handler = (self.factory)(id).with_context(|| Error::Factory {
            conversation: format!("{id:?}"),
        })?;
        if !handler.has_state() {
            trace!(conversation = ?id, "stateless handler, not cached");
            return Ok(handler);
        }

        let handler = match self.cache.entry(id.clone()) {
            Entry::Occupied(entry) => {
                debug!(conversation = ?id, "handler cached concurrently, dropping new one");
                entry.get().clone()
            },
            Entry::Vacant(entry) => {
                debug!(conversation = ?id, "caching stateful handler");
                entry.insert(handler).value().clone()
            },
        };
        Ok(handler)
    }

    /// Resolve the handler for `id` and dispatch `message` to it.
    ///
    /// Handler errors are returned as raised; only factory failures are
    /// wrapped with the conversation id.
    pub async fn handle_message(
        &self,
        id: &Id,
        message: impl Into<Message>,
        context: Context,
    ) -> Outcome {
        let handler = self.get_message_handler(id)?;
        handler.dispatch(message.into(), context).await
    }

    pub fn is_cached(&self, id: &Id) -> bool {
        self.cache.contains_key(id)
    }

    /// Drop the cached handler for `id`; the next message builds a new one.
    pub fn forget(&self, id: &Id) -> Option<Handler> {
        self.cache.remove(id).map(|(_, handler)| handler)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Number of cached handlers.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<Id: Eq + Hash> fmt::Debug for ConversationRouter<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationRouter")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
