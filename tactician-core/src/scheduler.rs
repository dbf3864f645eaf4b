//! Cancellation-safe delayed actions
//!
//! Every schedule bumps a counter; a pending action fires only if the counter
//! still holds the value captured when it was scheduled. Scheduling again, or
//! calling [`ActionScheduler::invalidate`], silently supersedes anything
//! pending, and the superseded entry is discarded on the spot. The host loop
//! drives delivery through [`ActionScheduler::poll`].

use std::time::{Duration, Instant};

/// Captured counter value identifying one schedule or request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionToken(u64);

#[derive(Debug)]
struct Pending<A> {
    token: ActionToken,
    due: Instant,
    action: A,
}

/// Delayed-action scheduler holding typed actions.
#[derive(Debug)]
pub struct ActionScheduler<A> {
    counter: u64,
    /// At most one entry; it always carries the current token
    pending: Option<Pending<A>>,
    in_flight: Option<ActionToken>,
}

impl<A> ActionScheduler<A> {
    pub fn new() -> Self {
        Self {
            counter: 0,
            pending: None,
            in_flight: None,
        }
    }

    /// Schedule `action` to fire `delay` from now.
    pub fn schedule(&mut self, action: A, delay: Duration) -> ActionToken {
        self.schedule_at(action, Instant::now(), delay)
    }

    /// Schedule relative to an explicit clock reading.
    pub fn schedule_at(&mut self, action: A, now: Instant, delay: Duration) -> ActionToken {
        let token = self.bump();
        self.pending = Some(Pending {
            token,
            due: now + delay,
            action,
        });
        tracing::trace!(token = token.0, delay_ms = delay.as_millis() as u64, "Action scheduled");
        token
    }

    /// Supersede every pending action and in-flight request.
    pub fn invalidate(&mut self) {
        self.bump();
    }

    /// Mark a backend request as in flight; `is_busy` stays true until the
    /// matching [`finish_request`](Self::finish_request).
    pub fn begin_request(&mut self) -> ActionToken {
        let token = self.bump();
        self.in_flight = Some(token);
        token
    }

    /// Close a request. Returns `true` if its reply is still current and
    /// should be applied.
    pub fn finish_request(&mut self, token: ActionToken) -> bool {
        if self.in_flight == Some(token) {
            self.in_flight = None;
        }
        self.is_current(token)
    }

    /// Whether `token` is the latest issued value
    pub fn is_current(&self, token: ActionToken) -> bool {
        token.0 == self.counter
    }

    /// True between scheduling and firing of a current action, or while a
    /// current request is outstanding.
    pub fn is_busy(&self) -> bool {
        let request_busy = self.in_flight.is_some_and(|t| self.is_current(t));
        request_busy || self.pending.as_ref().is_some_and(|p| self.is_current(p.token))
    }

    /// Deadline of the pending action, if any
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Fire the pending action if it is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<A> {
        match self.pending.take() {
            Some(entry) if entry.due > now => {
                self.pending = Some(entry);
                None
            }
            Some(entry) if self.is_current(entry.token) => Some(entry.action),
            Some(entry) => {
                tracing::trace!(token = entry.token.0, "Dropping superseded action");
                None
            }
            None => None,
        }
    }

    fn bump(&mut self) -> ActionToken {
        self.counter += 1;
        if let Some(stale) = self.pending.take() {
            tracing::trace!(token = stale.token.0, "Dropping superseded action");
        }
        ActionToken(self.counter)
    }
}

impl<A> Default for ActionScheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    #[test]
    fn test_fires_after_delay() {
        let now = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.schedule_at("reply", now, DELAY);

        assert!(scheduler.is_busy());
        assert_eq!(scheduler.poll(now + Duration::from_millis(999)), None);
        assert_eq!(scheduler.poll(now + DELAY), Some("reply"));
        assert!(!scheduler.is_busy());
        assert_eq!(scheduler.poll(now + DELAY * 2), None);
    }

    #[test]
    fn test_latest_schedule_supersedes() {
        let now = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.schedule_at("first", now, DELAY);
        scheduler.schedule_at("second", now + Duration::from_millis(200), DELAY);

        // The first deadline passes without firing anything
        assert_eq!(scheduler.poll(now + DELAY), None);
        assert!(scheduler.is_busy());
        assert_eq!(
            scheduler.poll(now + Duration::from_millis(1200)),
            Some("second")
        );
    }

    #[test]
    fn test_earlier_deadline_of_later_schedule_wins() {
        let now = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.schedule_at("slow", now, Duration::from_millis(100));
        scheduler.schedule_at("fast", now, Duration::from_millis(50));

        assert_eq!(scheduler.next_due(), Some(now + Duration::from_millis(50)));
        assert_eq!(scheduler.poll(now + Duration::from_millis(50)), Some("fast"));
        assert!(!scheduler.is_busy());
        assert_eq!(scheduler.poll(now + Duration::from_millis(100)), None);
    }

    #[test]
    fn test_superseded_deadline_is_forgotten() {
        let now = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.schedule_at("first", now, Duration::from_millis(10));
        scheduler.schedule_at("second", now, DELAY);
        assert_eq!(scheduler.next_due(), Some(now + DELAY));
    }

    #[test]
    fn test_invalidate_cancels() {
        let now = Instant::now();
        let mut scheduler = ActionScheduler::new();
        scheduler.schedule_at(1, now, DELAY);
        scheduler.invalidate();

        assert!(!scheduler.is_busy());
        assert_eq!(scheduler.poll(now + DELAY), None);
        assert_eq!(scheduler.next_due(), None);
    }

    #[test]
    fn test_request_lifecycle() {
        let mut scheduler: ActionScheduler<()> = ActionScheduler::new();
        let token = scheduler.begin_request();
        assert!(scheduler.is_busy());
        assert!(scheduler.finish_request(token));
        assert!(!scheduler.is_busy());
    }

    #[test]
    fn test_stale_request_is_dropped() {
        let mut scheduler: ActionScheduler<()> = ActionScheduler::new();
        let token = scheduler.begin_request();
        scheduler.invalidate();
        assert!(!scheduler.is_busy());
        assert!(!scheduler.finish_request(token));
    }

    #[test]
    fn test_next_due() {
        let now = Instant::now();
        let mut scheduler = ActionScheduler::new();
        assert_eq!(scheduler.next_due(), None);
        scheduler.schedule_at('a', now, DELAY);
        assert_eq!(scheduler.next_due(), Some(now + DELAY));
    }
}
