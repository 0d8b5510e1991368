//! Bonus wagering error types.

use thiserror::Error;
use uuid::Uuid;

/// Bonus wagering errors
#[derive(Debug, Error)]
pub enum BonusError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bonus not found
    #[error("Bonus not found")]
    BonusNotFound,

    /// Bonus left the active state before the locked re-check
    #[error("Bonus {0} is not active")]
    BonusNotActive(Uuid),

    /// Bonus expiry timestamp is in the past
    #[error("Bonus {0} has expired")]
    BonusExpired(Uuid),

    /// Game not found
    #[error("Game not found: {0}")]
    GameNotFound(Uuid),

    /// Wagering event not found
    #[error("Wagering event not found for bet {0}")]
    WageringEventNotFound(String),
}

impl BonusError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            BonusError::Database(_) => "Internal server error".to_string(),
            BonusError::BonusNotFound => "Bonus not found".to_string(),
            BonusError::GameNotFound(_) => "Game not found".to_string(),
            BonusError::WageringEventNotFound(_) => "Wagering event not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bonus operations
pub type BonusResult<T> = Result<T, BonusError>;
