use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the game core.
///
/// The first four variants describe bad player input and are shown as
/// messages. `RoundAlreadyResolved` and `InvalidTransition` mean a caller broke
/// the state machine contract; they are logged and otherwise ignored by the
/// front-end. Every error leaves the state it was raised from unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Please enter your name to start!")]
    EmptyName,

    #[error("Unknown difficulty '{0}' (expected easy, medium or hard)")]
    UnknownDifficulty(String),

    #[error("Please enter a valid number!")]
    InvalidInput(String),

    #[error("Please guess a number within the range {low} to {high}.")]
    OutOfRange { low: i64, high: i64 },

    #[error("round is already resolved")]
    RoundAlreadyResolved,

    #[error("cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },
}

impl GameError {
    /// True for errors caused by what the player typed or picked.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            GameError::EmptyName
                | GameError::UnknownDifficulty(_)
                | GameError::InvalidInput(_)
                | GameError::OutOfRange { .. }
        )
    }
}

/// Errors from the persisted key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite store failure")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create store directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode high score record")]
    Encode(#[from] serde_json::Error),
}
