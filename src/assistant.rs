use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::access::OperatorIdentity;
use crate::content::ContentPipeline;
use crate::error::BotError;
use crate::platform::{IncomingMessage, Outbox};
use crate::rate_limit::{wait_secs, RateLimiter};
use crate::router::{self, Intent};
use crate::stats::{format_uptime, Stats};

const HELP_TEXT: &str = "👋 Welcome! I manage your channel with AI.\n\n\
    Commands:\n\
    📝 Send \"Write about X\" (or just X) to generate and publish a post.\n\
    ❓ /quiz X to publish a quiz poll about X.\n\
    📅 /event Title | Date | Note to publish an event announcement.\n\
    📊 /stats to see counters, /status to check the bot.";

/// Platform-agnostic message handling: access control, admission, routing,
/// and the content pipelines.
pub struct Assistant {
    operator: OperatorIdentity,
    limiter: RateLimiter,
    pipeline: ContentPipeline,
    stats: Arc<Stats>,
    channel: String,
    model: String,
}

impl Assistant {
    pub fn new(
        operator: OperatorIdentity,
        limiter: RateLimiter,
        pipeline: ContentPipeline,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            operator,
            limiter,
            pipeline,
            stats,
            channel: String::new(),
            model: String::new(),
        }
    }

    /// Labels shown by `/status`.
    pub fn with_labels(mut self, channel: impl Into<String>, model: impl Into<String>) -> Self {
        self.channel = channel.into();
        self.model = model.into();
        self
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Handle one message. Every failure ends up as a reply to the sender.
    pub async fn handle(&self, incoming: &IncomingMessage, outbox: &dyn Outbox) {
        if let Err(e) = self.process_message(incoming, outbox).await {
            match &e {
                BotError::Unauthorized => warn!(
                    sender_id = incoming.sender_id,
                    username = incoming.sender_username.as_deref().unwrap_or("-"),
                    "Unauthorized access attempt"
                ),
                e if e.is_pipeline_failure() => {
                    self.stats.record_error();
                    error!(sender_id = incoming.sender_id, error = %e, "Request failed");
                }
                e => info!(sender_id = incoming.sender_id, reason = %e, "Request rejected"),
            }
            outbox.reply(&e.reply_text()).await;
        }
    }

    pub async fn process_message(
        &self,
        incoming: &IncomingMessage,
        outbox: &dyn Outbox,
    ) -> Result<(), BotError> {
        if !self
            .operator
            .allows(incoming.sender_id, incoming.sender_username.as_deref())
        {
            return Err(BotError::Unauthorized);
        }

        // Unknown commands are dropped before admission so they neither get a
        // reply nor use up the sender's window
        let routed = router::route(&incoming.text);
        if matches!(routed, Ok(Intent::Ignore)) {
            return Ok(());
        }

        self.limiter
            .admit(incoming.sender_id, incoming.received_at)
            .await
            .map_err(|remaining| BotError::RateLimited {
                wait_secs: wait_secs(remaining),
            })?;

        match routed? {
            Intent::Start | Intent::Help => outbox.reply(HELP_TEXT).await,
            Intent::Status => outbox.reply(&self.status_text()).await,
            Intent::Stats => {
                outbox
                    .reply(&self.stats.snapshot().render(Utc::now()))
                    .await
            }
            Intent::Quiz(args) => {
                let topic = router::quiz_topic(&args)?;
                self.pipeline.publish_quiz(&topic, outbox).await?;
            }
            Intent::Event(args) => self.pipeline.announce_event(&args, outbox).await?,
            Intent::Post(topic) => self.pipeline.publish_post(&topic, outbox).await?,
            Intent::Ignore => {}
        }
        Ok(())
    }

    fn status_text(&self) -> String {
        let snapshot = self.stats.snapshot();
        format!(
            "✅ Bot is running\n\n\
             ⏱ Uptime: {}\n\
             📢 Channel: {}\n\
             🧠 Model: {}",
            format_uptime(Utc::now() - snapshot.started_at),
            self.channel,
            self.model,
        )
    }
}
