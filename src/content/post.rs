use chrono::Utc;
use tracing::{info, warn};

use super::ContentPipeline;
use crate::error::{BotError, GenerationError};
use crate::platform::Outbox;

/// Prompt asking for a ready-to-publish channel post about `topic`.
pub fn build_post_prompt(topic: &str, language: &str) -> String {
    format!(
        "You are a professional Telegram channel admin.\n\
         Task: Write a professional post about: \"{topic}\"\n\
         \n\
         Rules:\n\
         1. Start with a catchy title or question.\n\
         2. Use emojis appropriately, without overdoing it.\n\
         3. Split into 3-5 short paragraphs.\n\
         4. Be interactive and engaging.\n\
         5. Add value and useful information.\n\
         6. End with a call to action.\n\
         7. Do NOT mention you are an AI.\n\
         8. Language: {language}.\n\
         9. Length: 150-300 words.\n\
         \n\
         Write the post now:"
    )
}

impl ContentPipeline {
    /// Generate a post about `topic` and publish it to the channel.
    ///
    /// Only generation is retried. A publish failure is surfaced at once so a post
    /// never goes out twice.
    pub async fn publish_post(&self, topic: &str, outbox: &dyn Outbox) -> Result<(), BotError> {
        outbox.reply(&format!("⏳ Writing about: \"{}\"...", topic)).await;
        outbox.typing().await;

        let prompt = build_post_prompt(topic, &self.language);
        let text = self.generate_with_retry(&prompt).await?;

        self.publisher.publish_text(&text).await?;
        self.stats.record_post(Utc::now());
        info!(topic, chars = text.chars().count(), "Post published");

        outbox.reply("✅ Post published to channel!").await;
        Ok(())
    }

    async fn generate_with_retry(&self, prompt: &str) -> Result<String, GenerationError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.generator.generate(prompt, &self.options).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < attempts => {
                    warn!(attempt, max_attempts = attempts, error = %e, "Generation failed, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
