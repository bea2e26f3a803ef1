//! Maps raw message text to an intent.
//!
//! Slash commands route by name. Everything else is a post topic, optionally
//! introduced by one of the trigger phrases below.

use crate::error::BotError;

pub const MIN_TOPIC_CHARS: usize = 2;
pub const MAX_TOPIC_CHARS: usize = 200;

/// Phrases that may introduce a post topic, matched case-insensitively in order.
/// A phrase that is a prefix of another must come after it.
pub const TRIGGERS: &[&str] = &[
    "تحدث عن",
    "اكتب عن",
    "انشر عن",
    "موضوع عن",
    "كلم عن",
    "write a post about",
    "write about",
    "post about",
];

/// Localized "question about" prefix accepted after `/quiz`.
const QUIZ_PREFIX: &str = "سؤال عن";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    Help,
    Status,
    Stats,
    /// Generate a quiz; carries the raw text after the command.
    Quiz(String),
    /// Announce an event; carries the raw text after the command.
    Event(String),
    /// Generate and publish a post about the topic.
    Post(String),
    /// Unknown slash command, dropped without a reply.
    Ignore,
}

/// Classify trimmed message text.
pub fn route(text: &str) -> Result<Intent, BotError> {
    let text = text.trim();

    if let Some(command_line) = text.strip_prefix('/') {
        return Ok(route_command(command_line));
    }

    let topic = match strip_trigger(text) {
        Some(rest) => rest.trim(),
        None => text,
    };
    validate_topic(topic)?;
    Ok(Intent::Post(topic.to_string()))
}

fn route_command(command_line: &str) -> Intent {
    let (head, args) = match command_line.find(char::is_whitespace) {
        Some(pos) => (&command_line[..pos], command_line[pos..].trim()),
        None => (command_line, ""),
    };
    // `/quiz@MyChannelBot` addresses a specific bot in groups
    let name = head.split('@').next().unwrap_or_default().to_lowercase();

    match name.as_str() {
        "start" => Intent::Start,
        "help" => Intent::Help,
        "status" => Intent::Status,
        "stats" => Intent::Stats,
        "quiz" => Intent::Quiz(args.to_string()),
        "event" => Intent::Event(args.to_string()),
        _ => Intent::Ignore,
    }
}

/// If `text` starts with a trigger phrase, return the remainder after it.
fn strip_trigger(text: &str) -> Option<&str> {
    TRIGGERS.iter().find_map(|trigger| strip_prefix_ignore_case(text, trigger))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix_chars = prefix.chars().count();
    let split_at = match text.char_indices().nth(prefix_chars) {
        Some((idx, _)) => idx,
        None if text.chars().count() == prefix_chars => text.len(),
        None => return None,
    };
    let (head, rest) = text.split_at(split_at);
    (head.to_lowercase() == prefix.to_lowercase()).then_some(rest)
}

/// Topic length is counted in characters, not bytes.
pub fn validate_topic(topic: &str) -> Result<(), BotError> {
    let len = topic.chars().count();
    if len < MIN_TOPIC_CHARS {
        return Err(BotError::Validation("Topic is too short.".to_string()));
    }
    if len > MAX_TOPIC_CHARS {
        return Err(BotError::Validation(format!(
            "Topic is too long ({} characters, max {}).",
            len, MAX_TOPIC_CHARS
        )));
    }
    Ok(())
}

/// Extract the quiz topic from `/quiz` arguments.
pub fn quiz_topic(args: &str) -> Result<String, BotError> {
    let args = args.trim();
    let topic = strip_prefix_ignore_case(args, QUIZ_PREFIX)
        .map(str::trim)
        .unwrap_or(args);
    if topic.is_empty() {
        return Err(BotError::Validation(
            "Please specify a topic for the quiz. Example: /quiz Programming".to_string(),
        ));
    }
    validate_topic(topic)?;
    Ok(topic.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(topic: &str) -> Intent {
        Intent::Post(topic.to_string())
    }

    #[test]
    fn test_plain_text_is_topic() {
        assert_eq!(route("  Rust ownership  ").unwrap(), post("Rust ownership"));
    }

    #[test]
    fn test_trigger_is_stripped_case_insensitively() {
        assert_eq!(route("Write about async Rust").unwrap(), post("async Rust"));
        assert_eq!(route("WRITE ABOUT tokio").unwrap(), post("tokio"));
        assert_eq!(route("write a post about serde").unwrap(), post("serde"));
    }

    #[test]
    fn test_localized_trigger() {
        assert_eq!(route("اكتب عن الذكاء الاصطناعي").unwrap(), post("الذكاء الاصطناعي"));
        assert_eq!(route("تحدث عن الرياضة").unwrap(), post("الرياضة"));
    }

    #[test]
    fn test_trigger_with_nothing_after_is_too_short() {
        assert!(matches!(route("write about"), Err(BotError::Validation(_))));
        assert!(matches!(route("write about  x"), Err(BotError::Validation(_))));
    }

    #[test]
    fn test_topic_length_bounds() {
        assert!(route("").is_err());
        assert!(route("a").is_err());
        assert_eq!(route("ab").unwrap(), post("ab"));

        let max = "x".repeat(MAX_TOPIC_CHARS);
        assert_eq!(route(&max).unwrap(), post(&max));
        assert!(route(&"x".repeat(MAX_TOPIC_CHARS + 1)).is_err());
        assert!(route(&format!("write about {}", "y".repeat(201))).is_err());
    }

    #[test]
    fn test_length_counts_characters() {
        // 200 two-byte characters is still within the limit
        let arabic = "ع".repeat(MAX_TOPIC_CHARS);
        assert_eq!(route(&arabic).unwrap(), post(&arabic));
    }

    #[test]
    fn test_commands() {
        assert_eq!(route("/start").unwrap(), Intent::Start);
        assert_eq!(route("/help").unwrap(), Intent::Help);
        assert_eq!(route("/status").unwrap(), Intent::Status);
        assert_eq!(route("/stats").unwrap(), Intent::Stats);
        assert_eq!(route("/quiz Rust traits").unwrap(), Intent::Quiz("Rust traits".into()));
        assert_eq!(
            route("/event Launch | Monday 5pm | Kickoff call").unwrap(),
            Intent::Event("Launch | Monday 5pm | Kickoff call".into())
        );
        assert_eq!(route("/quiz").unwrap(), Intent::Quiz(String::new()));
    }

    #[test]
    fn test_command_with_bot_mention() {
        assert_eq!(route("/quiz@MyBot Rust").unwrap(), Intent::Quiz("Rust".into()));
        assert_eq!(route("/STATS@MyBot").unwrap(), Intent::Stats);
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        assert_eq!(route("/clear").unwrap(), Intent::Ignore);
        assert_eq!(route("/").unwrap(), Intent::Ignore);
    }

    #[test]
    fn test_quiz_topic() {
        assert_eq!(quiz_topic(" Geography ").unwrap(), "Geography");
        assert_eq!(quiz_topic("سؤال عن التاريخ").unwrap(), "التاريخ");
        assert!(matches!(quiz_topic(""), Err(BotError::Validation(_))));
        assert!(matches!(quiz_topic("سؤال عن"), Err(BotError::Validation(_))));
    }

    #[test]
    fn test_prefix_helper_handles_short_text() {
        assert_eq!(strip_prefix_ignore_case("wri", "write about"), None);
        assert_eq!(strip_prefix_ignore_case("Write About", "write about"), Some(""));
    }
}
