//! Wallet transaction coordinator.
//!
//! Orchestrates one external transaction event end to end: idempotency
//! lookup, wallet resolution (with lazy creation for credit-class types),
//! credit-or-debit dispatch, and bounded retry on optimistic-lock
//! conflicts. Business-rule failures are never retried.

use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use super::errors::{WalletError, WalletResult};
use super::models::{TransactionRequest, TransactionResponse, Wallet, WalletType};
use super::repository::WalletRepository;
use crate::retry::RetryPolicy;

/// Wallet transaction coordinator
#[derive(Clone)]
pub struct WalletService {
    repo: Arc<dyn WalletRepository>,
    retry: RetryPolicy,
}

impl WalletService {
    /// Create a new service with the default conflict-retry policy
    /// (3 attempts, 10 ms apart).
    pub fn new(repo: Arc<dyn WalletRepository>) -> Self {
        Self {
            repo,
            retry: RetryPolicy::default(),
        }
    }

    /// Create a new service with an explicit conflict-retry policy.
    pub fn with_retry_policy(repo: Arc<dyn WalletRepository>, retry: RetryPolicy) -> Self {
        Self { repo, retry }
    }

    /// Get the wallet for a (player, kind, currency) triple.
    pub async fn get_balance(
        &self,
        player_id: Uuid,
        wallet_type: WalletType,
        currency: &str,
    ) -> WalletResult<Wallet> {
        self.repo.get_balance(player_id, wallet_type, currency).await
    }

    /// Process one transaction event with exactly-once financial effect.
    ///
    /// Replaying the same `(reference_id, transaction_type)` returns the
    /// recorded outcome without touching the balance, making the operation
    /// safe under at-least-once delivery.
    ///
    /// # Errors
    ///
    /// * `WalletError::InvalidAmount` - amount is zero or negative
    /// * `WalletError::InsufficientFunds` - debit exceeds the balance, or
    ///   the player has no wallet to debit
    /// * `WalletError::OptimisticLockConflict` - contention outlasted the
    ///   retry budget
    pub async fn process_transaction(
        &self,
        request: TransactionRequest,
    ) -> WalletResult<TransactionResponse> {
        if request.amount <= rust_decimal::Decimal::ZERO {
            return Err(WalletError::InvalidAmount(request.amount));
        }

        // Idempotent replay: return the recorded outcome verbatim.
        if let Some(existing) = self
            .repo
            .get_transaction_by_reference(&request.reference_id, request.transaction_type)
            .await?
        {
            info!(
                "Replayed transaction reference_id={} type={}",
                request.reference_id, request.transaction_type
            );
            return Ok(TransactionResponse {
                transaction_id: existing.transaction_id,
                balance: existing.balance_after,
                status: existing.status,
            });
        }

        let wallet = self.resolve_wallet(&request).await?;

        let transaction = self
            .retry
            .run(
                || {
                    let repo = Arc::clone(&self.repo);
                    let request = request.clone();
                    let wallet_id = wallet.wallet_id;
                    async move {
                        if request.transaction_type.is_credit() {
                            repo.credit(wallet_id, &request).await
                        } else if request.transaction_type.is_debit() {
                            repo.debit(wallet_id, &request).await
                        } else {
                            Err(WalletError::InvalidTransactionType(
                                request.transaction_type.to_string(),
                            ))
                        }
                    }
                },
                |err| {
                    let retryable = err.is_retryable();
                    if retryable {
                        warn!(
                            "Version conflict on wallet {}, retrying: reference_id={}",
                            wallet.wallet_id, request.reference_id
                        );
                    }
                    retryable
                },
            )
            .await?;

        info!(
            "Transaction applied: id={} type={} player={} balance={}",
            transaction.transaction_id,
            transaction.transaction_type,
            transaction.player_id,
            transaction.balance_after
        );

        Ok(TransactionResponse {
            transaction_id: transaction.transaction_id,
            balance: transaction.balance_after,
            status: transaction.status,
        })
    }

    /// Resolve the target wallet, creating it lazily for credit-class types.
    ///
    /// A wallet that has never received funds cannot cover a debit, so an
    /// absent wallet surfaces as `InsufficientFunds` for debit-class types.
    async fn resolve_wallet(&self, request: &TransactionRequest) -> WalletResult<Wallet> {
        match self
            .repo
            .get_balance(request.player_id, request.wallet_type, &request.currency)
            .await
        {
            Ok(wallet) => Ok(wallet),
            Err(WalletError::WalletNotFound(_)) => {
                if request.transaction_type.is_debit() {
                    return Err(WalletError::InsufficientFunds {
                        available: rust_decimal::Decimal::ZERO,
                        required: request.amount,
                    });
                }
                match self
                    .repo
                    .create_wallet(request.player_id, request.wallet_type, &request.currency)
                    .await
                {
                    Ok(wallet) => Ok(wallet),
                    // A concurrent creator won the uniqueness race; the row
                    // exists now, so re-read it.
                    Err(err) if is_unique_violation(&err) => {
                        self.repo
                            .get_balance(request.player_id, request.wallet_type, &request.currency)
                            .await
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }
}

fn is_unique_violation(err: &WalletError) -> bool {
    matches!(
        err,
        WalletError::Database(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}
