//! Wallet data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wallet kind. Each player holds at most one wallet per kind and currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Main,
    Bonus,
}

impl std::fmt::Display for WalletType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletType::Main => write!(f, "main"),
            WalletType::Bonus => write!(f, "bonus"),
        }
    }
}

impl std::str::FromStr for WalletType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(WalletType::Main),
            "bonus" => Ok(WalletType::Bonus),
            other => Err(format!("unknown wallet type: {other}")),
        }
    }
}

/// Ledger transaction type.
///
/// `Deposit` and `Win` are credit-class; `Withdrawal` and `Bet` are
/// debit-class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Bet,
    Win,
}

impl TransactionType {
    /// Credit-class types add funds; a missing wallet is created lazily.
    pub fn is_credit(self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::Win)
    }

    /// Debit-class types remove funds; a missing wallet cannot cover them.
    pub fn is_debit(self) -> bool {
        matches!(self, TransactionType::Withdrawal | TransactionType::Bet)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Deposit => write!(f, "deposit"),
            TransactionType::Withdrawal => write!(f, "withdrawal"),
            TransactionType::Bet => write!(f, "bet"),
            TransactionType::Win => write!(f, "win"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "bet" => Ok(TransactionType::Bet),
            "win" => Ok(TransactionType::Win),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// Wallet model.
///
/// `version` increases by one on every committed mutation and is the
/// optimistic-concurrency stamp: writers only commit if the row still
/// carries the version they read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub wallet_id: Uuid,
    pub player_id: Uuid,
    pub wallet_type: WalletType,
    pub currency: String,
    pub balance: Decimal,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable audit record of one ledger mutation.
///
/// `(reference_id, transaction_type)` is unique and serves as the
/// idempotency key for duplicate delivery of the same external event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub player_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Transaction submission request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub player_id: Uuid,
    pub wallet_type: WalletType,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub reference_id: String,
    pub currency: String,
}

/// Transaction outcome returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub balance: Decimal,
    pub status: TransactionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_classes() {
        assert!(TransactionType::Deposit.is_credit());
        assert!(TransactionType::Win.is_credit());
        assert!(TransactionType::Withdrawal.is_debit());
        assert!(TransactionType::Bet.is_debit());
        assert!(!TransactionType::Deposit.is_debit());
        assert!(!TransactionType::Bet.is_credit());
    }

    #[test]
    fn transaction_type_round_trips_through_display() {
        for ty in [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::Bet,
            TransactionType::Win,
        ] {
            assert_eq!(ty.to_string().parse::<TransactionType>().unwrap(), ty);
        }
        assert!("bonus".parse::<TransactionType>().is_err());
    }

    #[test]
    fn wallet_type_parsing() {
        assert_eq!("main".parse::<WalletType>().unwrap(), WalletType::Main);
        assert_eq!("bonus".parse::<WalletType>().unwrap(), WalletType::Bonus);
        assert!("escrow".parse::<WalletType>().is_err());
    }

    #[test]
    fn status_parsing() {
        assert_eq!(
            "completed".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Completed
        );
        assert!("done".parse::<TransactionStatus>().is_err());
    }
}
