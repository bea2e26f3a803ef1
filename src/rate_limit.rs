use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

/// Last admission time per sender, bounded by capacity with LRU eviction.
///
/// Every touch stamps the sender with a fresh generation; `access_order` maps
/// generations back to senders, so its first entry is always the least
/// recently used one.
struct AdmissionLog {
    last_accepted: HashMap<u64, (Instant, u64)>,
    access_order: BTreeMap<u64, u64>,
    next_generation: u64,
    capacity: usize,
}

impl AdmissionLog {
    fn new(capacity: usize) -> Self {
        Self {
            last_accepted: HashMap::new(),
            access_order: BTreeMap::new(),
            next_generation: 0,
            capacity: capacity.max(1),
        }
    }

    fn last(&self, sender: u64) -> Option<Instant> {
        self.last_accepted.get(&sender).map(|(at, _)| *at)
    }

    fn record(&mut self, sender: u64, now: Instant, window: Duration) {
        if self.last_accepted.len() >= self.capacity && !self.last_accepted.contains_key(&sender) {
            self.evict(now, window);
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        if let Some((_, previous)) = self.last_accepted.insert(sender, (now, generation)) {
            self.access_order.remove(&previous);
        }
        self.access_order.insert(generation, sender);
    }

    fn pop_oldest(&mut self) -> Option<(u64, Instant)> {
        let (_, sender) = self.access_order.pop_first()?;
        let (at, _) = self.last_accepted.remove(&sender)?;
        Some((sender, at))
    }

    /// Drop entries whose window has already elapsed, oldest first; if none
    /// have, drop the least recently used one.
    fn evict(&mut self, now: Instant, window: Duration) {
        let mut expired = 0;
        while let Some((_, sender)) = self.access_order.first_key_value() {
            let is_expired = self
                .last(*sender)
                .is_some_and(|at| now.saturating_duration_since(at) >= window);
            if !is_expired {
                break;
            }
            self.pop_oldest();
            expired += 1;
        }
        if expired > 0 {
            debug!(evicted = expired, "Evicted expired rate-limit entries");
            return;
        }

        if let Some((oldest, _)) = self.pop_oldest() {
            debug!(sender = oldest, "Evicted least recently used rate-limit entry");
        }
    }
}

/// Enforces a minimum interval between accepted requests from the same sender.
///
/// The check and the update happen under one lock with no await in between, so
/// two rapid messages from one sender cannot both be admitted.
pub struct RateLimiter {
    window: Duration,
    log: Mutex<AdmissionLog>,
}

impl RateLimiter {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            log: Mutex::new(AdmissionLog::new(capacity)),
        }
    }

    /// Admit a request at `now`, or return how long the sender still has to wait.
    ///
    /// Admission is recorded even if whatever runs afterwards fails.
    pub async fn admit(&self, sender: u64, now: Instant) -> Result<(), Duration> {
        let mut log = self.log.lock().await;

        if let Some(last) = log.last(sender) {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.window {
                return Err(self.window - elapsed);
            }
        }

        log.record(sender, now, self.window);
        Ok(())
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.log.lock().await.last_accepted.len()
    }
}

/// Remaining wait rounded up to whole seconds.
pub fn wait_secs(remaining: Duration) -> u64 {
    remaining.as_millis().div_ceil(1000) as u64
}
