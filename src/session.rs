use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::difficulty::{Difficulty, DifficultyProfile};
use crate::error::GameError;
use crate::highscore::{HighScoreRecord, HighScoreStore};
use crate::round::{parse_guess, GuessOutcome, Round, RoundEngine};
use crate::runtime::{CountdownEvent, GameEvent};
use crate::timer::{Countdown, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionPhase {
    AwaitingName,
    InRound,
    RoundResolved,
    Ended,
}

/// What happened to the current round after a guess or a countdown expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    pub round_id: u64,
    pub outcome: GuessOutcome,
    pub cumulative_score: u32,
    pub new_high_score: bool,
}

/// Drives one player's session: rounds, countdown, cumulative score and the
/// shared high score.
///
/// Countdown callbacks and the celebration signal are delivered as
/// [`GameEvent`]s on `events`, so every state change happens on the thread
/// that owns the controller.
pub struct SessionController<C: Countdown> {
    phase: SessionPhase,
    player_name: String,
    cumulative_score: u32,
    difficulty: Difficulty,
    round: Option<Round>,
    seconds_left: Option<u32>,
    engine: RoundEngine,
    timer: C,
    high_scores: Arc<HighScoreStore>,
    events: Sender<GameEvent>,
}

impl<C: Countdown> SessionController<C> {
    pub fn new(timer: C, high_scores: Arc<HighScoreStore>, events: Sender<GameEvent>) -> Self {
        Self {
            phase: SessionPhase::AwaitingName,
            player_name: String::new(),
            cumulative_score: 0,
            difficulty: Difficulty::default(),
            round: None,
            seconds_left: None,
            engine: RoundEngine::new(),
            timer,
            high_scores,
            events,
        }
    }

    pub fn with_engine(mut self, engine: RoundEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn cumulative_score(&self) -> u32 {
        self.cumulative_score
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn profile(&self) -> DifficultyProfile {
        self.difficulty.profile()
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Seconds left on the countdown of the current round, as last reported
    pub fn seconds_left(&self) -> Option<u32> {
        self.seconds_left
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn timer(&self) -> &C {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut C {
        &mut self.timer
    }

    /// Current record, or an empty one if the store cannot be read
    pub fn high_score(&self) -> HighScoreRecord {
        self.high_scores.read().unwrap_or_else(|e| {
            log::warn!("could not read high score: {}", e);
            HighScoreRecord::default()
        })
    }

    fn expect_phase(
        &self,
        allowed: &[SessionPhase],
        action: &'static str,
    ) -> Result<(), GameError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            log::error!("{} rejected in phase {}", action, self.phase);
            Err(GameError::InvalidTransition {
                action,
                state: self.phase.to_string(),
            })
        }
    }

    pub fn start_session(&mut self, name: &str, difficulty: Difficulty) -> Result<(), GameError> {
        self.expect_phase(&[SessionPhase::AwaitingName, SessionPhase::Ended], "start session")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }

        self.begin_round(difficulty)?;
        self.player_name = name.to_string();
        self.cumulative_score = 0;
        log::info!("session started for {} on {}", self.player_name, difficulty);
        Ok(())
    }

    /// Same as [`start_session`](Self::start_session), taking a difficulty tag
    pub fn start_session_tag(&mut self, name: &str, tag: &str) -> Result<(), GameError> {
        let difficulty = tag.parse::<Difficulty>()?;
        self.start_session(name, difficulty)
    }

    /// Pick the difficulty used by the next round
    pub fn select_difficulty(&mut self, difficulty: Difficulty) -> Result<(), GameError> {
        self.expect_phase(
            &[
                SessionPhase::AwaitingName,
                SessionPhase::RoundResolved,
                SessionPhase::Ended,
            ],
            "change difficulty",
        )?;
        self.difficulty = difficulty;
        Ok(())
    }

    pub fn play_again(&mut self) -> Result<(), GameError> {
        self.expect_phase(&[SessionPhase::RoundResolved], "play again")?;
        self.begin_round(self.difficulty)
    }

    /// Begin a round and arm its countdown. Leaves state untouched if arming fails.
    fn begin_round(&mut self, difficulty: Difficulty) -> Result<(), GameError> {
        let profile = difficulty.profile();
        let round = self.engine.begin(profile);
        let round_id = round.id();

        let tick_tx = self.events.clone();
        let expire_tx = self.events.clone();
        self.timer.arm(
            profile.time_limit_secs,
            Box::new(move |remaining| {
                let _ = tick_tx.send(GameEvent::Countdown(CountdownEvent::Tick {
                    round: round_id,
                    remaining,
                }));
            }),
            Box::new(move || {
                let _ = expire_tx.send(GameEvent::Countdown(CountdownEvent::Expired {
                    round: round_id,
                }));
            }),
        )?;

        self.difficulty = difficulty;
        self.round = Some(round);
        self.seconds_left = Some(profile.time_limit_secs);
        self.phase = SessionPhase::InRound;
        Ok(())
    }

    pub fn guess(&mut self, raw: &str) -> Result<RoundReport, GameError> {
        self.expect_phase(&[SessionPhase::InRound], "guess")?;
        let Some(round) = self.round.as_mut() else {
            return Err(GameError::InvalidTransition {
                action: "guess",
                state: "no active round".to_string(),
            });
        };

        let value = parse_guess(raw, round.profile())?;
        let outcome = round.submit_guess(value)?;
        let round_id = round.id();

        let mut new_high_score = false;
        match outcome {
            GuessOutcome::Won { points_awarded, .. } => {
                self.timer.cancel();
                self.cumulative_score += points_awarded;
                new_high_score = self.record_high_score();
                self.phase = SessionPhase::RoundResolved;
            }
            GuessOutcome::Lost { .. } => {
                self.timer.cancel();
                self.phase = SessionPhase::RoundResolved;
            }
            _ => {}
        }

        Ok(RoundReport {
            round_id,
            outcome,
            cumulative_score: self.cumulative_score,
            new_high_score,
        })
    }

    fn record_high_score(&mut self) -> bool {
        match self
            .high_scores
            .write_if_higher(&self.player_name, self.cumulative_score)
        {
            Ok(true) => {
                if self.events.send(GameEvent::Celebrate).is_err() {
                    log::debug!("celebration signal dropped, no listener");
                }
                true
            }
            Ok(false) => false,
            Err(e) => {
                log::warn!("could not update high score: {}", e);
                false
            }
        }
    }

    /// Apply a countdown event. Returns a report when it timed the round out.
    pub fn on_countdown(&mut self, event: CountdownEvent) -> Option<RoundReport> {
        let current = self.round.as_ref().map(Round::id);
        match event {
            CountdownEvent::Tick { round, remaining } => {
                if Some(round) == current && self.phase == SessionPhase::InRound {
                    self.seconds_left = Some(remaining);
                }
                None
            }
            CountdownEvent::Expired { round } => {
                if Some(round) != current || self.phase != SessionPhase::InRound {
                    log::debug!("ignoring stale expiry for round {}", round);
                    return None;
                }
                let outcome = self.round.as_mut().and_then(Round::expire)?;
                self.seconds_left = Some(0);
                self.phase = SessionPhase::RoundResolved;
                Some(RoundReport {
                    round_id: round,
                    outcome,
                    cumulative_score: self.cumulative_score,
                    new_high_score: false,
                })
            }
        }
    }

    /// Leave the session from any phase
    pub fn end_session(&mut self) {
        self.timer.cancel();
        if self.phase != SessionPhase::AwaitingName {
            log::info!(
                "session ended for {} with score {}",
                self.player_name,
                self.cumulative_score
            );
        }
        self.cumulative_score = 0;
        self.round = None;
        self.seconds_left = None;
        self.phase = SessionPhase::Ended;
    }
}
