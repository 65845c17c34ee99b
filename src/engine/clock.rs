//! Transport position bookkeeping.
//!
//! The clock is a pure value: it never reads the wall clock itself, every
//! method takes `now`. The periodic update is a `Ticker` owned by the
//! transport and armed only while playing.

use std::time::{Duration, Instant};

/// Which track's length defines the song when the tracks disagree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DurationPolicy {
    /// First loaded track, in descriptor order, that reports a length.
    #[default]
    First,
    Longest,
    Shortest,
}

impl DurationPolicy {
    /// Pick the reference track among `durations` (unknown lengths are
    /// skipped). Returns its index and length.
    pub fn pick(self, durations: &[Option<Duration>]) -> Option<(usize, Duration)> {
        let mut known = durations
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|d| (i, d)));

        match self {
            DurationPolicy::First => known.next(),
            // Ties resolve to the earliest track.
            DurationPolicy::Longest => known.fold(None, |best, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            }),
            DurationPolicy::Shortest => known.fold(None, |best, (i, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    at: Instant,
    from: Duration,
}

/// Logical song position shared by every track.
///
/// While running, the position is extrapolated from an anchor (an instant and
/// the position at that instant). Reported positions never move backwards
/// while running; a resync that lands behind simply holds the position until
/// the new anchor catches up.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    duration: Duration,
    position: Duration,
    anchor: Option<Anchor>,
}

impl PlaybackClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            position: Duration::ZERO,
            anchor: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Last computed position.
    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    /// Begin advancing from the current position once `deadline` passes.
    pub fn start(&mut self, deadline: Instant) {
        self.anchor = Some(Anchor {
            at: deadline,
            from: self.position,
        });
    }

    pub fn position_at(&self, now: Instant) -> Duration {
        match self.anchor {
            Some(a) => (a.from + now.saturating_duration_since(a.at))
                .max(self.position)
                .min(self.duration),
            None => self.position,
        }
    }

    /// Advance the stored position to `now`.
    pub fn tick(&mut self, now: Instant) -> Duration {
        self.position = self.position_at(now);
        self.position
    }

    /// Stop advancing and keep the position reached at `now`.
    pub fn freeze(&mut self, now: Instant) {
        self.position = self.position_at(now);
        self.anchor = None;
    }

    /// Jump to `position` (clamped to the song) and stop advancing.
    pub fn seek(&mut self, position: Duration) {
        self.position = position.min(self.duration);
        self.anchor = None;
    }

    pub fn reset(&mut self) {
        self.seek(Duration::ZERO);
    }

    /// Re-anchor on the position actually reported by the reference track.
    /// Ignored before the start deadline has passed.
    pub fn resync(&mut self, actual: Duration, now: Instant) {
        if let Some(a) = self.anchor {
            if now >= a.at {
                self.anchor = Some(Anchor {
                    at: now,
                    from: actual.min(self.duration),
                });
            }
        }
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        !self.duration.is_zero() && self.position_at(now) >= self.duration
    }
}

/// Cancelable periodic timer.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    /// Schedule the first firing at `first`.
    pub fn arm(&mut self, first: Instant) {
        self.next_due = Some(first);
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns `true` (and reschedules) when the timer is due at `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if due <= now => {
                self.next_due = Some(now + self.period);
                true
            }
            _ => false,
        }
    }

    /// Time left until the next firing.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
