use tracing::info;

use super::ContentPipeline;
use crate::error::BotError;
use crate::platform::Outbox;

pub const EVENT_USAGE: &str = "Invalid format.\n\
    Usage: /event Title | Date | Description\n\
    Example: /event Meeting | Tomorrow 9 PM | Discuss project roadmap";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAnnouncement {
    pub title: String,
    pub date: String,
    pub description: String,
}

impl EventAnnouncement {
    /// Parse `Title | Date | Description`. Parts after the third are ignored.
    pub fn parse(args: &str) -> Result<Self, BotError> {
        let mut parts = args.split('|').map(str::trim);
        let (Some(title), Some(date), Some(description)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(BotError::Validation(EVENT_USAGE.to_string()));
        };
        if title.is_empty() || date.is_empty() || description.is_empty() {
            return Err(BotError::Validation(EVENT_USAGE.to_string()));
        }
        Ok(Self {
            title: title.to_string(),
            date: date.to_string(),
            description: description.to_string(),
        })
    }

    /// Channel message text for this announcement.
    pub fn render(&self) -> String {
        format!(
            "📅 Announcement 📅\n\n\
             📌 Title: {}\n\
             🕒 When: {}\n\n\
             📝 Details:\n{}\n\n\
             ✨ We look forward to seeing you!",
            self.title, self.date, self.description
        )
    }
}

impl ContentPipeline {
    /// Publish an event announcement built from a fixed template. No generation involved.
    pub async fn announce_event(&self, args: &str, outbox: &dyn Outbox) -> Result<(), BotError> {
        let event = EventAnnouncement::parse(args)?;

        self.publisher.publish_text(&event.render()).await?;
        self.stats.record_event();
        info!(title = %event.title, "Event announced");

        outbox.reply("✅ Event announced in channel!").await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::content::test_support::{FakeGenerator, FakePublisher, RecordingOutbox};
    use crate::stats::Stats;

    #[test]
    fn test_parse_three_parts() {
        let event = EventAnnouncement::parse("Launch | Monday 5pm | Kickoff call").unwrap();
        assert_eq!(event.title, "Launch");
        assert_eq!(event.date, "Monday 5pm");
        assert_eq!(event.description, "Kickoff call");
    }

    #[test]
    fn test_two_parts_rejected_with_usage() {
        let err = EventAnnouncement::parse("Launch | Monday 5pm").unwrap_err();
        assert!(matches!(err, BotError::Validation(ref msg) if msg.contains("Usage: /event")));
    }

    #[test]
    fn test_empty_part_rejected() {
        assert!(EventAnnouncement::parse("Launch |  | Kickoff").is_err());
        assert!(EventAnnouncement::parse("").is_err());
    }

    #[test]
    fn test_extra_parts_are_dropped() {
        let event = EventAnnouncement::parse("A | B | C | D").unwrap();
        assert_eq!(event.description, "C");
    }

    #[test]
    fn test_render_contains_fields() {
        let text = EventAnnouncement::parse("Launch | Monday 5pm | Kickoff call")
            .unwrap()
            .render();
        assert!(text.contains("Launch"));
        assert!(text.contains("Monday 5pm"));
        assert!(text.contains("Kickoff call"));
    }

    #[tokio::test]
    async fn test_announce_publishes_without_generation() {
        let generator = Arc::new(FakeGenerator::new(vec![]));
        let publisher = Arc::new(FakePublisher::default());
        let outbox = RecordingOutbox::default();
        let pipeline =
            ContentPipeline::new(generator.clone(), publisher.clone(), Arc::new(Stats::new()));

        pipeline
            .announce_event("Launch | Monday 5pm | Kickoff call", &outbox)
            .await
            .unwrap();

        let texts = publisher.texts().await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Kickoff call"));
        assert_eq!(generator.calls().await, 0);
        assert_eq!(pipeline.stats().snapshot().events_announced, 1);
        assert_eq!(outbox.replies().await, vec!["✅ Event announced in channel!"]);
    }

    #[tokio::test]
    async fn test_bad_event_publishes_nothing() {
        let publisher = Arc::new(FakePublisher::default());
        let pipeline = ContentPipeline::new(
            Arc::new(FakeGenerator::new(vec![])),
            publisher.clone(),
            Arc::new(Stats::new()),
        );

        assert!(pipeline
            .announce_event("Launch | Monday 5pm", &RecordingOutbox::default())
            .await
            .is_err());
        assert!(publisher.texts().await.is_empty());
    }
}
