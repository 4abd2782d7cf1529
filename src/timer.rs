use std::time::{Duration, Instant};

/// Caps how many missed ticks are replayed after a stalled frame.
const MAX_CATCH_UP_TICKS: u32 = 50;

#[derive(Debug, Clone, Copy)]
struct Interval {
    period: Duration,
    next_due: Instant,
}

/// Frame-driven timers: one repeating progress sampler and one delayed
/// track advance.
///
/// Starting the sampler replaces whatever sampler was running, so at most
/// one is ever live.
#[derive(Debug, Default)]
pub struct Scheduler {
    sampler: Option<Interval>,
    advance_at: Option<Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_sampler(&mut self, period: Duration, now: Instant) {
        let period = period.max(Duration::from_millis(1));
        self.sampler = Some(Interval {
            period,
            next_due: now + period,
        });
    }

    pub fn cancel_sampler(&mut self) {
        self.sampler = None;
    }

    pub fn schedule_advance(&mut self, at: Instant) {
        self.advance_at = Some(at);
    }

    pub fn cancel_advance(&mut self) {
        self.advance_at = None;
    }

    pub fn cancel_all(&mut self) {
        self.cancel_sampler();
        self.cancel_advance();
    }

    pub fn sampler_running(&self) -> bool {
        self.sampler.is_some()
    }

    /// Number of live sampling timers; never more than one.
    pub fn active_timers(&self) -> usize {
        usize::from(self.sampler.is_some())
    }

    /// Consumes every sampler period that elapsed up to `now`.
    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let Some(interval) = self.sampler.as_mut() else {
            return 0;
        };

        let mut ticks = 0;
        while interval.next_due <= now && ticks < MAX_CATCH_UP_TICKS {
            interval.next_due += interval.period;
            ticks += 1;
        }
        if interval.next_due <= now {
            interval.next_due = now + interval.period;
        }
        ticks
    }

    /// Fires the delayed advance once its deadline has passed.
    pub fn take_due_advance(&mut self, now: Instant) -> bool {
        match self.advance_at {
            Some(at) if at <= now => {
                self.advance_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        let sampler = self.sampler.map(|interval| interval.next_due);
        match (sampler, self.advance_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(100);

    #[test]
    fn restarting_keeps_one_sampler() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.start_sampler(PERIOD, now);
        scheduler.start_sampler(PERIOD, now + Duration::from_millis(30));
        assert_eq!(scheduler.active_timers(), 1);

        // The first sampler's deadline was discarded with it.
        assert_eq!(scheduler.due_ticks(now + Duration::from_millis(110)), 0);
        assert_eq!(scheduler.due_ticks(now + Duration::from_millis(130)), 1);
    }

    #[test]
    fn counts_elapsed_periods() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.start_sampler(PERIOD, now);
        assert_eq!(scheduler.due_ticks(now + Duration::from_millis(50)), 0);
        assert_eq!(scheduler.due_ticks(now + Duration::from_millis(350)), 3);
        assert_eq!(scheduler.due_ticks(now + Duration::from_millis(399)), 0);
        assert_eq!(scheduler.due_ticks(now + Duration::from_millis(400)), 1);
    }

    #[test]
    fn catch_up_is_bounded() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.start_sampler(PERIOD, now);
        let later = now + Duration::from_secs(60);
        assert_eq!(scheduler.due_ticks(later), MAX_CATCH_UP_TICKS);
        assert_eq!(scheduler.next_deadline(), Some(later + PERIOD));
    }

    #[test]
    fn cancelled_sampler_never_ticks() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.start_sampler(PERIOD, now);
        scheduler.cancel_sampler();
        assert_eq!(scheduler.active_timers(), 0);
        assert_eq!(scheduler.due_ticks(now + Duration::from_secs(1)), 0);
    }

    #[test]
    fn advance_fires_once_after_deadline() {
        let now = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule_advance(now + Duration::from_secs(1));
        assert!(!scheduler.take_due_advance(now));
        assert_eq!(scheduler.next_deadline(), Some(now + Duration::from_secs(1)));
        assert!(scheduler.take_due_advance(now + Duration::from_secs(1)));
        assert!(!scheduler.take_due_advance(now + Duration::from_secs(2)));
        assert_eq!(scheduler.next_deadline(), None);
    }
}
