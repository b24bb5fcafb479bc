use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Range, attempt budget and time limit for one difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyProfile {
    pub low: i64,
    pub high: i64,
    pub attempts: u32,
    pub time_limit_secs: u32,
}

impl DifficultyProfile {
    pub fn contains(&self, value: i64) -> bool {
        (self.low..=self.high).contains(&value)
    }
}

const EASY: DifficultyProfile = DifficultyProfile {
    low: 1,
    high: 10,
    attempts: 5,
    time_limit_secs: 30,
};

const MEDIUM: DifficultyProfile = DifficultyProfile {
    low: 1,
    high: 50,
    attempts: 7,
    time_limit_secs: 45,
};

const HARD: DifficultyProfile = DifficultyProfile {
    low: 1,
    high: 100,
    attempts: 10,
    time_limit_secs: 60,
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Easy => EASY,
            Difficulty::Medium => MEDIUM,
            Difficulty::Hard => HARD,
        }
    }

    /// Next level for the selector, wrapping around after hard
    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(GameError::UnknownDifficulty(tag.to_string())),
        }
    }
}

/// Resolve a difficulty tag to its profile
pub fn lookup(tag: &str) -> Result<DifficultyProfile, GameError> {
    tag.parse::<Difficulty>().map(Difficulty::profile)
}
