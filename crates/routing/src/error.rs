#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create a handler for conversation {conversation}")]
    Factory { conversation: String },

    #[error("failed to deliver a reply to conversation {conversation}")]
    Delivery { conversation: String },
}
