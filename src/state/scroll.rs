//! Scroll-mode load-completion detector
//!
//! Infinite listings have no page index; the only observable progress is the
//! document height after each scroll to the bottom. Loading is complete once
//! the height has stayed the same for `stability_threshold` consecutive
//! readings. A wall-clock ceiling bounds listings that never settle.

use std::time::Duration;
use tokio::time::Instant;

/// Loading state of an infinite-scroll listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    /// New content is still appearing
    Loading,

    /// Height stopped changing
    Stable,

    /// The time ceiling elapsed first
    TimedOut,
}

impl ScrollState {
    /// Returns true if no further scrolls should be issued
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

/// Tracks measured heights across scrolls
#[derive(Debug, Clone)]
pub struct ScrollDetector {
    stability_threshold: u32,
    time_ceiling: Duration,
    started_at: Instant,
    last_height: Option<u64>,
    stable_readings: u32,
    readings: u32,
    state: ScrollState,
}

impl ScrollDetector {
    /// Creates a detector; the time ceiling starts counting now
    ///
    /// # Arguments
    ///
    /// * `stability_threshold` - Consecutive unchanged readings required (minimum 1)
    /// * `time_ceiling` - Total time allowed before forcing `TimedOut`
    pub fn new(stability_threshold: u32, time_ceiling: Duration) -> Self {
        Self {
            stability_threshold: stability_threshold.max(1),
            time_ceiling,
            started_at: Instant::now(),
            last_height: None,
            stable_readings: 0,
            readings: 0,
            state: ScrollState::Loading,
        }
    }

    /// Returns the current state
    pub fn state(&self) -> ScrollState {
        self.state
    }

    /// Returns the number of heights observed so far
    pub fn readings(&self) -> u32 {
        self.readings
    }

    /// Returns the last observed height
    pub fn last_height(&self) -> Option<u64> {
        self.last_height
    }

    /// Returns the time elapsed since the detector was created
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Forces `TimedOut` if the ceiling has elapsed
    ///
    /// Call this before issuing a scroll so no scroll starts past the ceiling.
    pub fn check_deadline(&mut self) -> ScrollState {
        if self.state == ScrollState::Loading && self.elapsed() >= self.time_ceiling {
            self.state = ScrollState::TimedOut;
        }
        self.state
    }

    /// Records the height measured after a scroll
    ///
    /// The first reading has nothing to compare against and always leaves the
    /// detector `Loading`.
    pub fn observe(&mut self, height: u64) -> ScrollState {
        if self.state.is_terminal() {
            return self.state;
        }

        self.readings += 1;

        match self.last_height {
            Some(previous) if previous == height => {
                self.stable_readings += 1;
            }
            _ => {
                self.stable_readings = 0;
            }
        }
        self.last_height = Some(height);

        if self.stable_readings >= self.stability_threshold {
            self.state = ScrollState::Stable;
        } else {
            self.check_deadline();
        }

        self.state
    }
}
