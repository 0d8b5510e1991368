//! Wallet error types.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Wallet not found
    #[error("Wallet not found for player {0}")]
    WalletNotFound(Uuid),

    /// Insufficient funds for a debit
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
    },

    /// Another writer committed to the wallet row first
    #[error("Optimistic lock conflict on wallet {0}")]
    OptimisticLockConflict(Uuid),

    /// Transaction type outside the credit/debit dispatch table
    #[error("Invalid transaction type: {0}")]
    InvalidTransactionType(String),

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),
}

impl WalletError {
    /// True when the failure is transient contention worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::OptimisticLockConflict(_))
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database errors are sanitized to prevent information disclosure about
    /// the internal system structure, and player/wallet IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Database(_) => "Internal server error".to_string(),
            WalletError::WalletNotFound(_) => "Wallet not found".to_string(),
            WalletError::OptimisticLockConflict(_) => {
                "Transaction conflict, please retry".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn only_lock_conflicts_are_retryable() {
        assert!(WalletError::OptimisticLockConflict(Uuid::nil()).is_retryable());
        assert!(
            !WalletError::InsufficientFunds {
                available: dec!(5),
                required: dec!(10),
            }
            .is_retryable()
        );
        assert!(!WalletError::WalletNotFound(Uuid::nil()).is_retryable());
    }

    #[test]
    fn client_message_hides_database_detail() {
        let err = WalletError::Database(sqlx::Error::PoolClosed);
        assert_eq!(err.client_message(), "Internal server error");
    }
}
