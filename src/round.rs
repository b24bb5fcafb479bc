use std::num::IntErrorKind;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::difficulty::DifficultyProfile;
use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RoundStatus {
    Pending,
    Won,
    Lost,
    TimedOut,
}

impl RoundStatus {
    pub fn is_terminal(self) -> bool {
        self != RoundStatus::Pending
    }
}

/// Result of a guess or of the round timing out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    TooHigh { attempts_remaining: u32 },
    TooLow { attempts_remaining: u32 },
    Won { points_awarded: u32, attempts_remaining: u32 },
    Lost { target: i64 },
    TimedOut { target: i64 },
}

impl GuessOutcome {
    /// True when this outcome ended the round
    pub fn resolves_round(&self) -> bool {
        !matches!(
            self,
            GuessOutcome::TooHigh { .. } | GuessOutcome::TooLow { .. }
        )
    }
}

/// One guess-the-number episode.
///
/// The target is fixed at creation, `attempts_remaining` only goes down, and
/// the status leaves `Pending` at most once.
#[derive(Debug, Clone)]
pub struct Round {
    id: u64,
    target: i64,
    attempts_remaining: u32,
    profile: DifficultyProfile,
    status: RoundStatus,
}

impl Round {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == RoundStatus::Pending
    }

    pub fn submit_guess(&mut self, value: i64) -> Result<GuessOutcome, GameError> {
        if self.status.is_terminal() {
            return Err(GameError::RoundAlreadyResolved);
        }
        if !self.profile.contains(value) {
            return Err(GameError::OutOfRange {
                low: self.profile.low,
                high: self.profile.high,
            });
        }

        // Pending implies at least one attempt left
        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);

        let outcome = if value == self.target {
            self.status = RoundStatus::Won;
            GuessOutcome::Won {
                points_awarded: self.attempts_remaining + 1,
                attempts_remaining: self.attempts_remaining,
            }
        } else if self.attempts_remaining == 0 {
            self.status = RoundStatus::Lost;
            GuessOutcome::Lost {
                target: self.target,
            }
        } else if value > self.target {
            GuessOutcome::TooHigh {
                attempts_remaining: self.attempts_remaining,
            }
        } else {
            GuessOutcome::TooLow {
                attempts_remaining: self.attempts_remaining,
            }
        };

        log::debug!("round {}: guess {} -> {:?}", self.id, value, outcome);
        Ok(outcome)
    }

    /// Time the round out. Returns `None` if it was already resolved.
    pub fn expire(&mut self) -> Option<GuessOutcome> {
        if self.status.is_terminal() {
            return None;
        }
        self.status = RoundStatus::TimedOut;
        log::debug!("round {} timed out", self.id);
        Some(GuessOutcome::TimedOut {
            target: self.target,
        })
    }
}

/// Parse raw guess text into an integer.
///
/// The whole trimmed text must be an integer: `"12abc"` and `"4.5"` are
/// rejected rather than truncated to their leading digits.
/// Integers too large for `i64` are reported against the profile's range.
pub fn parse_guess(text: &str, profile: &DifficultyProfile) -> Result<i64, GameError> {
    let trimmed = text.trim();
    trimmed.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => GameError::OutOfRange {
            low: profile.low,
            high: profile.high,
        },
        _ => GameError::InvalidInput(trimmed.to_string()),
    })
}

/// Creates rounds, owning the random source for target selection
#[derive(Debug)]
pub struct RoundEngine {
    rng: StdRng,
    next_id: u64,
}

impl RoundEngine {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            next_id: 1,
        }
    }

    /// Deterministic engine, same seed gives the same targets
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    pub fn begin(&mut self, profile: DifficultyProfile) -> Round {
        let target = self.rng.gen_range(profile.low..=profile.high);
        let id = self.next_id;
        self.next_id += 1;

        log::debug!(
            "round {} begins: range {}..={}, {} attempts, {}s",
            id,
            profile.low,
            profile.high,
            profile.attempts,
            profile.time_limit_secs
        );

        Round {
            id,
            target,
            attempts_remaining: profile.attempts,
            profile,
            status: RoundStatus::Pending,
        }
    }
}

impl Default for RoundEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn round_with_target(profile: DifficultyProfile, target: i64) -> Round {
    Round {
        id: 1,
        target,
        attempts_remaining: profile.attempts,
        profile,
        status: RoundStatus::Pending,
    }
}
