use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use super::ContentPipeline;
use crate::error::BotError;
use crate::platform::Outbox;

/// Telegram poll limits
const MAX_QUESTION_CHARS: usize = 300;
const MAX_OPTIONS: usize = 10;
const MAX_OPTION_CHARS: usize = 100;

/// A validated multiple-choice question, ready to publish as a quiz poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSpec {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based, always less than `options.len()`
    pub correct_option_id: usize,
}

#[derive(Debug, Deserialize)]
struct RawQuiz {
    question: Option<String>,
    options: Option<Vec<Value>>,
    correct_option_id: Option<Value>,
}

pub fn build_quiz_prompt(topic: &str, language: &str) -> String {
    format!(
        "Generate a multiple-choice question (Poll) for a Telegram channel about: \"{topic}\".\n\
         Output MUST be valid JSON only, with this format:\n\
         {{\n\
         \x20 \"question\": \"The question text in {language}\",\n\
         \x20 \"options\": [\"Option 1\", \"Option 2\", \"Option 3\", \"Option 4\"],\n\
         \x20 \"correct_option_id\": 0\n\
         }}\n\
         \"options\" must contain at least 4 short answers (under 100 characters each).\n\
         \"correct_option_id\" is the 0-based index of the correct option.\n\
         Do not add any markdown blocks or extra text. JSON ONLY."
    )
}

/// Remove a surrounding ``` fence, with or without a language tag.
fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line, e.g. "json"
    let inner = match inner.find('\n') {
        Some(pos) if !inner[..pos].contains('{') => &inner[pos + 1..],
        _ => inner.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    inner.trim().trim_end_matches("```").trim()
}

/// Parse model output into raw quiz fields, falling back to the outermost
/// `{...}` span when the model wrapped the JSON in prose.
fn parse_raw(raw: &str) -> Result<RawQuiz, BotError> {
    let cleaned = strip_code_fence(raw);
    if let Ok(quiz) = serde_json::from_str::<RawQuiz>(cleaned) {
        return Ok(quiz);
    }

    let object = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => return Err(BotError::Parse("response is not JSON".to_string())),
    };
    serde_json::from_str::<RawQuiz>(object).map_err(|e| BotError::Parse(e.to_string()))
}

fn option_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn index_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse and validate a generated quiz. Nothing invalid ever reaches the channel.
pub fn parse_quiz(raw: &str) -> Result<QuizSpec, BotError> {
    let quiz = parse_raw(raw)?;

    let question = quiz
        .question
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| BotError::Parse("missing question".to_string()))?;
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(BotError::Parse("question too long".to_string()));
    }

    let raw_options = quiz
        .options
        .ok_or_else(|| BotError::Parse("missing options".to_string()))?;
    let options = raw_options
        .iter()
        .map(option_text)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| BotError::Parse("options must be non-empty text".to_string()))?;
    if options.len() < 2 {
        return Err(BotError::Parse(format!(
            "need at least 2 options, got {}",
            options.len()
        )));
    }
    if options.len() > MAX_OPTIONS {
        return Err(BotError::Parse(format!(
            "at most {} options allowed, got {}",
            MAX_OPTIONS,
            options.len()
        )));
    }
    if options.iter().any(|o| o.chars().count() > MAX_OPTION_CHARS) {
        return Err(BotError::Parse("option too long".to_string()));
    }

    let correct_option_id = quiz
        .correct_option_id
        .as_ref()
        .and_then(index_value)
        .ok_or_else(|| BotError::Parse("missing or invalid correct_option_id".to_string()))?;
    if correct_option_id >= options.len() {
        return Err(BotError::Parse(format!(
            "correct_option_id {} out of range for {} options",
            correct_option_id,
            options.len()
        )));
    }

    Ok(QuizSpec {
        question,
        options,
        correct_option_id,
    })
}

impl ContentPipeline {
    /// Generate a quiz about `topic` and publish it as a channel poll. Single attempt.
    pub async fn publish_quiz(&self, topic: &str, outbox: &dyn Outbox) -> Result<(), BotError> {
        outbox
            .reply(&format!("⏳ Generating quiz about: \"{}\"...", topic))
            .await;
        outbox.typing().await;

        let prompt = build_quiz_prompt(topic, &self.language);
        let options = self.options.clone().with_temperature(self.quiz_temperature);
        let raw = self.generator.generate(&prompt, &options).await?;

        let quiz = parse_quiz(&raw).inspect_err(|e| {
            error!(error = %e, response = %raw, "Failed to parse quiz");
        })?;

        self.publisher.publish_quiz(&quiz).await?;
        self.stats.record_quiz();
        info!(topic, options = quiz.options.len(), "Quiz published");

        outbox.reply("✅ Quiz published to channel!").await;
        Ok(())
    }
}
