use std::time::Duration;

use crate::media::MediaClock;

/// Formats seconds as `m:ss`. Minutes are not rolled into hours.
pub fn format_time(seconds: f64) -> String {
    let total_seconds = if seconds.is_finite() {
        seconds.max(0.0).floor() as u64
    } else {
        0
    };
    let minutes = total_seconds / 60;
    let secs = total_seconds % 60;
    format!("{minutes}:{secs:02}")
}

/// Duration and start offset of a track, in seconds.
///
/// Fractions are percentages of the playable span between `start` and
/// `duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackTiming {
    pub duration: f64,
    pub start: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeIndicator {
    pub elapsed: String,
    pub remaining: String,
}

impl TrackTiming {
    pub fn new(duration: f64, start: f64) -> Self {
        Self { duration, start }
    }

    pub fn playable(&self) -> f64 {
        (self.duration - self.start).max(0.0)
    }

    pub fn elapsed(&self, fraction: f64) -> f64 {
        self.start + (fraction / 100.0) * (self.duration - self.start)
    }

    pub fn remaining(&self, fraction: f64) -> f64 {
        self.duration - self.elapsed(fraction)
    }

    /// Maps a media position onto the playable span.
    pub fn fraction_at(&self, position: f64) -> f64 {
        let playable = self.playable();
        if playable <= f64::EPSILON {
            return 100.0;
        }
        ((position - self.start) / playable * 100.0).clamp(0.0, 100.0)
    }

    pub fn indicator(&self, fraction: f64) -> TimeIndicator {
        TimeIndicator {
            elapsed: format_time(self.elapsed(fraction)),
            remaining: format_time(self.remaining(fraction)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Progress(f64),
    Finished,
}

/// Advances one track's fraction on every timer tick.
#[derive(Debug, Clone)]
pub struct ProgressSampler {
    fraction: f64,
    step: f64,
    baseline: f64,
}

impl ProgressSampler {
    /// Starts at the beginning of the span, or at `resume_from` when
    /// continuing after a pause.
    pub fn start(timing: TrackTiming, resume_from: Option<f64>, period: Duration) -> Self {
        let initial = resume_from.unwrap_or(0.0).clamp(0.0, 100.0);
        let playable = timing.playable();
        let baseline = initial / 100.0 * playable;
        let remaining_secs = playable - baseline;
        let period_ms = period.as_secs_f64() * 1000.0;
        let total_steps = if period_ms > 0.0 {
            remaining_secs * 1000.0 / period_ms
        } else {
            0.0
        };
        let remaining_pct = 100.0 - initial;
        let step = if total_steps > f64::EPSILON {
            remaining_pct / total_steps
        } else {
            remaining_pct
        };

        Self {
            fraction: initial,
            step,
            baseline,
        }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Seconds into the playable span that the simulation resumed from.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Reads the media clock when it is running, otherwise simulates.
    pub fn tick(&mut self, timing: TrackTiming, clock: Option<&dyn MediaClock>) -> Tick {
        let running_clock = clock.filter(|clock| {
            clock.is_ready() && !clock.is_paused() && clock.duration().is_some()
        });

        let next = match running_clock {
            Some(clock) => timing.fraction_at(clock.current_time()),
            None => self.fraction + self.step,
        };

        if next >= 100.0 {
            self.fraction = 100.0;
            Tick::Finished
        } else {
            self.fraction = next;
            Tick::Progress(next)
        }
    }
}
