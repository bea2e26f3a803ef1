pub mod telegram;

use std::time::Instant;

use async_trait::async_trait;

use crate::content::quiz::QuizSpec;
use crate::error::PublishError;

/// A text message received from the operator side of the bot
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub sender_id: u64,
    /// Username without the leading "@", if the sender has one
    pub sender_username: Option<String>,
    pub text: String,
    pub received_at: Instant,
}

/// Replies to the sender of the message being handled.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn reply(&self, text: &str);

    /// Show a "typing" indicator. Best effort.
    async fn typing(&self) {}
}

/// The broadcast channel the bot publishes to.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish_text(&self, text: &str) -> Result<(), PublishError>;

    /// Publish an anonymous quiz-mode poll with a single correct answer.
    async fn publish_quiz(&self, quiz: &QuizSpec) -> Result<(), PublishError>;
}
