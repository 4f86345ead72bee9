use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::super::domain::{JobId, UserId};
use super::Decision;

struct CacheEntry {
    decision: Decision,
    stored_at: DateTime<Utc>,
}

/// Bounded TTL cache for synthesized decisions, keyed by user and job.
/// Last writer wins; expired entries are ignored on read and the oldest
/// entry is evicted once capacity is reached.
pub struct DecisionCache {
    entries: Mutex<HashMap<(UserId, JobId), CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl DecisionCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, user: &UserId, job: &JobId, now: DateTime<Utc>) -> Option<Decision> {
        let guard = self.entries.lock().expect("decision cache mutex poisoned");
        guard
            .get(&(user.clone(), job.clone()))
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| entry.decision.clone())
    }

    pub fn put(&self, user: UserId, job: JobId, decision: Decision, now: DateTime<Utc>) {
        let mut guard = self.entries.lock().expect("decision cache mutex poisoned");

        guard.retain(|_, entry| now - entry.stored_at < self.ttl);

        if guard.len() >= self.capacity && !guard.contains_key(&(user.clone(), job.clone())) {
            if let Some(oldest) = guard
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone())
            {
                guard.remove(&oldest);
            }
        }

        guard.insert(
            (user, job),
            CacheEntry {
                decision,
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("decision cache mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(Duration::hours(1), 4096)
    }
}
