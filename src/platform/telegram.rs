use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputPollOption, PollType, Recipient};
use teloxide::{ApiError, RequestError};
use tracing::{error, info, warn};

use crate::assistant::Assistant;
use crate::content::quiz::QuizSpec;
use crate::error::{ErrorKind, PublishError};
use crate::platform::{IncomingMessage, Outbox, Publisher};

/// Telegram rejects messages longer than 4096 characters
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        // max_len narrower than one character: emit that character alone
        if end == start {
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

fn publish_error(err: RequestError) -> PublishError {
    let message = err.to_string();
    let kind = match &err {
        RequestError::Api(ApiError::InvalidToken) => ErrorKind::Auth,
        RequestError::Api(
            ApiError::NotEnoughRightsToPostMessages | ApiError::BotKicked | ApiError::ChatNotFound,
        ) => ErrorKind::Permission,
        RequestError::RetryAfter(_) => ErrorKind::RateLimit,
        RequestError::Network(e) if e.is_timeout() => ErrorKind::Timeout,
        _ => ErrorKind::classify(&message),
    };
    error!(%kind, %message, "Channel publish failed");
    PublishError { kind, message }
}

/// Earlier parts of a split post stay in the channel when a later part fails.
fn partial_publish_error(mut err: PublishError, sent: usize, total: usize) -> PublishError {
    if sent > 0 {
        err.message = format!(
            "{} ({} of {} parts were already published)",
            err.message, sent, total
        );
    }
    err
}

/// Publishes to the configured channel through the Bot API.
pub struct TelegramChannel {
    bot: Bot,
    channel: Recipient,
}

impl TelegramChannel {
    pub fn new(bot: Bot, channel: Recipient) -> Self {
        Self { bot, channel }
    }
}

#[async_trait]
impl Publisher for TelegramChannel {
    async fn publish_text(&self, text: &str) -> Result<(), PublishError> {
        let chunks = split_message(text, MAX_MESSAGE_LEN);
        let total = chunks.len();
        for (sent, chunk) in chunks.into_iter().enumerate() {
            self.bot
                .send_message(self.channel.clone(), chunk)
                .await
                .map_err(|e| partial_publish_error(publish_error(e), sent, total))?;
        }
        Ok(())
    }

    async fn publish_quiz(&self, quiz: &QuizSpec) -> Result<(), PublishError> {
        let options: Vec<InputPollOption> = quiz
            .options
            .iter()
            .cloned()
            .map(InputPollOption::new)
            .collect();

        let mut req = self
            .bot
            .send_poll(self.channel.clone(), quiz.question.clone(), options);
        req.type_ = Some(PollType::Quiz);
        req.is_anonymous = Some(true);
        req.allows_multiple_answers = Some(false);
        req.correct_option_id = Some(quiz.correct_option_id.try_into().map_err(|_| {
            PublishError {
                kind: ErrorKind::Unknown,
                message: format!("correct option {} out of range", quiz.correct_option_id),
            }
        })?);

        req.await.map_err(publish_error)?;
        Ok(())
    }
}

/// Replies into the chat the current message came from.
#[derive(Clone)]
struct ChatOutbox {
    bot: Bot,
    chat_id: ChatId,
}

#[async_trait]
impl Outbox for ChatOutbox {
    async fn reply(&self, text: &str) {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            if let Err(e) = self.bot.send_message(self.chat_id, chunk).await {
                warn!(chat_id = self.chat_id.0, error = %e, "Failed to send reply");
            }
        }
    }

    async fn typing(&self) {
        self.bot
            .send_chat_action(self.chat_id, teloxide::types::ChatAction::Typing)
            .await
            .ok();
    }
}

/// Run the Telegram bot platform
pub async fn run(assistant: Arc<Assistant>, bot: Bot) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![assistant])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, assistant: Arc<Assistant>) -> ResponseResult<()> {
    // Channel posts and service messages carry no sender
    let user = match msg.from.as_ref() {
        Some(user) => user,
        None => return Ok(()),
    };

    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    info!(
        "Telegram message from {} ({}): {}",
        user.username.as_deref().unwrap_or(&user.first_name),
        user.id.0,
        text
    );

    let incoming = IncomingMessage {
        sender_id: user.id.0,
        sender_username: user.username.clone(),
        text,
        received_at: Instant::now(),
    };
    let outbox = ChatOutbox {
        bot: bot.clone(),
        chat_id: msg.chat.id,
    };

    // A panic inside a pipeline must not take the dispatcher down
    let task = {
        let assistant = assistant.clone();
        tokio::spawn(async move { assistant.handle(&incoming, &outbox).await })
    };
    if let Err(e) = task.await {
        error!(error = %e, "Message handler crashed");
        assistant.stats().record_error();
        bot.send_message(msg.chat.id, "❌ An unexpected error occurred.")
            .await?;
    }

    Ok(())
}
