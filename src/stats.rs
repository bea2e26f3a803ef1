use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};

const NO_POST: i64 = i64::MIN;

/// Process-wide counters, shared by reference between handlers.
pub struct Stats {
    started_at: DateTime<Utc>,
    posts_generated: AtomicU64,
    quizzes_published: AtomicU64,
    events_announced: AtomicU64,
    errors: AtomicU64,
    /// Milliseconds since the epoch, `NO_POST` until the first post
    last_post_at: AtomicI64,
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub started_at: DateTime<Utc>,
    pub posts_generated: u64,
    pub quizzes_published: u64,
    pub events_announced: u64,
    pub errors: u64,
    pub last_post_at: Option<DateTime<Utc>>,
}

impl Stats {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            posts_generated: AtomicU64::new(0),
            quizzes_published: AtomicU64::new(0),
            events_announced: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            last_post_at: AtomicI64::new(NO_POST),
        }
    }

    pub fn record_post(&self, at: DateTime<Utc>) {
        self.posts_generated.fetch_add(1, Ordering::Relaxed);
        self.last_post_at
            .store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_quiz(&self) {
        self.quizzes_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event(&self) {
        self.events_announced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let last = self.last_post_at.load(Ordering::Relaxed);
        StatsSnapshot {
            started_at: self.started_at,
            posts_generated: self.posts_generated.load(Ordering::Relaxed),
            quizzes_published: self.quizzes_published.load(Ordering::Relaxed),
            events_announced: self.events_announced.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_post_at: (last != NO_POST)
                .then(|| DateTime::from_timestamp_millis(last))
                .flatten(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSnapshot {
    /// Render for the `/stats` reply.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        let last_post = self
            .last_post_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());

        format!(
            "📊 Bot stats\n\n\
             ⏱ Uptime: {}\n\
             📝 Posts generated: {}\n\
             ❓ Quizzes published: {}\n\
             📅 Events announced: {}\n\
             ⚠️ Errors: {}\n\
             🕒 Last post: {}",
            format_uptime(now - self.started_at),
            self.posts_generated,
            self.quizzes_published,
            self.events_announced,
            self.errors,
            last_post,
        )
    }
}

pub fn format_uptime(elapsed: chrono::TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
    );
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}
