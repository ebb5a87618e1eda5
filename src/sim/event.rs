//! Bounded, rate-limited operator event stream.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

/// Event category shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    System,
    Policy,
    Warning,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("SYSTEM"),
            Self::Policy => f.write_str("POLICY"),
            Self::Warning => f.write_str("WARNING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub tick: u64,
    pub sim_time_s: f64,
    /// Time of day, `HH:MM:SS`.
    pub clock: String,
    pub category: EventCategory,
    pub message: String,
}

/// How an event is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Consumes a token; dropped when the bucket is empty.
    Limited,
    /// Always recorded (lifecycle events, one-off warnings).
    Always,
}

/// Token bucket refilled in simulated ticks.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_tick: f64,
    last_tick: u64,
}

impl TokenBucket {
    /// Creates a full bucket.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 1` or `refill_per_tick` is negative.
    pub fn new(capacity: f64, refill_per_tick: f64) -> Self {
        assert!(capacity >= 1.0, "bucket capacity must be >= 1");
        assert!(refill_per_tick >= 0.0, "refill_per_tick must be >= 0");
        Self {
            capacity,
            tokens: capacity,
            refill_per_tick,
            last_tick: 0,
        }
    }

    /// Refills for the ticks elapsed since the last call, then takes one token if available.
    pub fn try_take(&mut self, tick: u64) -> bool {
        let elapsed = tick.saturating_sub(self.last_tick) as f64;
        self.tokens = (self.tokens + elapsed * self.refill_per_tick).min(self.capacity);
        self.last_tick = self.last_tick.max(tick);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Capped ring of accepted events, newest first.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEvent>,
    capacity: usize,
    bucket: TokenBucket,
    suppressed: u64,
}

impl EventLog {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, bucket: TokenBucket) -> Self {
        assert!(capacity > 0, "event log capacity must be > 0");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            bucket,
            suppressed: 0,
        }
    }

    /// Offers an event to the log.
    ///
    /// Accepted events are also emitted through `tracing`.
    ///
    /// # Returns
    ///
    /// `true` if the event was recorded.
    pub fn record(
        &mut self,
        tick: u64,
        sim_time_s: f64,
        clock: &str,
        category: EventCategory,
        message: impl Into<String>,
        gate: Gate,
    ) -> bool {
        if gate == Gate::Limited && !self.bucket.try_take(tick) {
            self.suppressed += 1;
            return false;
        }

        let event = LogEvent {
            tick,
            sim_time_s,
            clock: clock.to_string(),
            category,
            message: message.into(),
        };
        mirror(&event);

        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(event);
        true
    }

    /// Events, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events dropped by the rate limiter since construction.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

fn mirror(event: &LogEvent) {
    match event.category {
        EventCategory::Warning => tracing::warn!(
            tick = event.tick,
            category = %event.category,
            "{}",
            event.message
        ),
        EventCategory::Policy => tracing::debug!(
            tick = event.tick,
            category = %event.category,
            "{}",
            event.message
        ),
        EventCategory::System => tracing::info!(
            tick = event.tick,
            category = %event.category,
            "{}",
            event.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(capacity: usize, burst: f64, refill: f64) -> EventLog {
        EventLog::new(capacity, TokenBucket::new(burst, refill))
    }

    #[test]
    fn bucket_allows_burst_then_refills() {
        let mut b = TokenBucket::new(5.0, 0.25);
        for _ in 0..5 {
            assert!(b.try_take(0));
        }
        assert!(!b.try_take(0));
        assert!(!b.try_take(2));
        assert!(b.try_take(4));
        assert!(!b.try_take(4));
    }

    #[test]
    fn bucket_never_exceeds_capacity() {
        let mut b = TokenBucket::new(2.0, 1.0);
        assert!(b.try_take(1_000));
        assert!(b.try_take(1_000));
        assert!(!b.try_take(1_000));
    }

    #[test]
    fn limited_events_are_throttled() {
        let mut l = log(50, 5.0, 0.0);
        let accepted = (0..20)
            .filter(|&i| l.record(i, 0.0, "06:00:00", EventCategory::Policy, "platoon", Gate::Limited))
            .count();
        assert_eq!(accepted, 5);
        assert_eq!(l.suppressed(), 15);
    }

    #[test]
    fn always_bypasses_limiter() {
        let mut l = log(50, 1.0, 0.0);
        assert!(l.record(0, 0.0, "", EventCategory::Policy, "a", Gate::Limited));
        assert!(!l.record(0, 0.0, "", EventCategory::Policy, "b", Gate::Limited));
        assert!(l.record(0, 0.0, "", EventCategory::System, "reset", Gate::Always));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn ring_is_capped_and_newest_first() {
        let mut l = log(3, 1.0, 0.0);
        for i in 0..5 {
            l.record(i, i as f64, "", EventCategory::System, format!("e{i}"), Gate::Always);
        }
        let msgs: Vec<_> = l.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, vec!["e4", "e3", "e2"]);
    }

    #[test]
    fn category_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&EventCategory::Warning).unwrap(),
            "\"WARNING\""
        );
    }
}
