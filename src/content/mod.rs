//! Content pipelines: build a prompt, generate, validate, publish.

pub mod event;
pub mod post;
pub mod quiz;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::{GenerationOptions, Generator};
use crate::platform::Publisher;
use crate::stats::Stats;

/// How many times post generation is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

pub struct ContentPipeline {
    generator: Arc<dyn Generator>,
    publisher: Arc<dyn Publisher>,
    stats: Arc<Stats>,
    options: GenerationOptions,
    quiz_temperature: f32,
    language: String,
    retry: RetryPolicy,
}

impl ContentPipeline {
    pub fn new(
        generator: Arc<dyn Generator>,
        publisher: Arc<dyn Publisher>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            generator,
            publisher,
            stats,
            options: GenerationOptions::default(),
            quiz_temperature: 0.7,
            language: "Simple Arabic (MSA)".to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Apply model, language and retry settings from the config.
    pub fn configured(mut self, config: &Config) -> Self {
        self.options = GenerationOptions::from_config(&config.llm);
        self.quiz_temperature = config.llm.quiz_temperature;
        self.language = config.content.language.clone();
        self.with_retry(RetryPolicy {
            max_attempts: config.content.max_attempts,
            delay: config.retry_delay(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[cfg(test)]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}
