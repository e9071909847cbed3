//! Supply change detection

use std::time::{Duration, Instant};

/// Whether a comparison baseline exists yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    NoBaseline,
    HasBaseline(u64),
}

/// A change the detector considers reportable, before rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub previous_supply: u64,
    pub supply: u64,
    /// Time since the previous reportable change; `None` for the first one
    pub since_last_change: Option<Duration>,
}

impl Candidate {
    pub fn delta(&self) -> i64 {
        supply_delta(self.supply, self.previous_supply)
    }
}

/// Signed change from `previous` to `supply`, saturating at the `i64` range
pub fn supply_delta(supply: u64, previous: u64) -> i64 {
    let wide = i128::from(supply) - i128::from(previous);
    i64::try_from(wide).unwrap_or(if wide > 0 { i64::MAX } else { i64::MIN })
}

/// Compares each supply sample against the one before it
///
/// The first sample only seeds the baseline. Every later sample that differs
/// from its predecessor yields a [`Candidate`], increases and decreases
/// alike. The baseline always moves to the latest sample, whether or not the
/// candidate ends up being sent.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    state: DetectorState,
    last_change: Option<Instant>,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self {
            state: DetectorState::NoBaseline,
            last_change: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn last_supply(&self) -> Option<u64> {
        match self.state {
            DetectorState::NoBaseline => None,
            DetectorState::HasBaseline(supply) => Some(supply),
        }
    }

    pub fn last_change_time(&self) -> Option<Instant> {
        self.last_change
    }

    /// Feeds one sample observed at `now`
    pub fn observe(&mut self, supply: u64, now: Instant) -> Option<Candidate> {
        match self.state {
            DetectorState::NoBaseline => {
                self.state = DetectorState::HasBaseline(supply);
                None
            }
            DetectorState::HasBaseline(prev) if prev == supply => None,
            DetectorState::HasBaseline(prev) => {
                let candidate = Candidate {
                    previous_supply: prev,
                    supply,
                    since_last_change: self
                        .last_change
                        .map(|at| now.saturating_duration_since(at)),
                };
                self.state = DetectorState::HasBaseline(supply);
                self.last_change = Some(now);
                Some(candidate)
            }
        }
    }
}
