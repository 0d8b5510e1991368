//! Wallet repository: row-versioned ledger access over PostgreSQL.
//!
//! Credit and debit each run as a single database transaction using
//! optimistic concurrency control: the wallet row is read without a lock,
//! the new balance is computed, and the update is conditional on the row
//! still carrying the version that was read. Zero matched rows means
//! another writer committed first; the whole transaction rolls back and the
//! caller retries. The version predicate is the sole mechanism preventing
//! lost updates between concurrent writers on the same wallet.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction as PgTransaction};
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{WalletError, WalletResult};
use super::models::{
    Transaction, TransactionRequest, TransactionStatus, TransactionType, Wallet, WalletType,
};

/// Trait for wallet repository operations
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Look up a wallet by its owning (player, kind, currency) triple
    async fn get_balance(
        &self,
        player_id: Uuid,
        wallet_type: WalletType,
        currency: &str,
    ) -> WalletResult<Wallet>;

    /// Look up a recorded transaction by its idempotency key
    async fn get_transaction_by_reference(
        &self,
        reference_id: &str,
        transaction_type: TransactionType,
    ) -> WalletResult<Option<Transaction>>;

    /// Create a zero-balance, version-1 wallet
    ///
    /// A uniqueness violation on `(player_id, wallet_type, currency)` means
    /// a concurrent creator won; the caller must re-read.
    async fn create_wallet(
        &self,
        player_id: Uuid,
        wallet_type: WalletType,
        currency: &str,
    ) -> WalletResult<Wallet>;

    /// Apply a credit to the wallet and record the transaction
    async fn credit(&self, wallet_id: Uuid, request: &TransactionRequest)
    -> WalletResult<Transaction>;

    /// Apply a debit to the wallet and record the transaction
    async fn debit(&self, wallet_id: Uuid, request: &TransactionRequest)
    -> WalletResult<Transaction>;

    /// Get transaction history for a player, newest first
    async fn get_transactions(&self, player_id: Uuid, limit: i64)
    -> WalletResult<Vec<Transaction>>;
}

/// PostgreSQL implementation of [`WalletRepository`]
#[derive(Clone)]
pub struct PgWalletRepository {
    pool: Arc<PgPool>,
}

impl PgWalletRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn wallet_from_row(row: &PgRow) -> WalletResult<Wallet> {
        Ok(Wallet {
            wallet_id: row.get("wallet_id"),
            player_id: row.get("player_id"),
            wallet_type: row
                .get::<String, _>("wallet_type")
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            currency: row.get("currency"),
            balance: row.get("balance"),
            version: row.get("version"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    fn transaction_from_row(row: &PgRow) -> WalletResult<Transaction> {
        Ok(Transaction {
            transaction_id: row.get("transaction_id"),
            wallet_id: row.get("wallet_id"),
            player_id: row.get("player_id"),
            transaction_type: row
                .get::<String, _>("transaction_type")
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            amount: row.get("amount"),
            balance_before: row.get("balance_before"),
            balance_after: row.get("balance_after"),
            reference_id: row.get("reference_id"),
            status: row
                .get::<String, _>("status")
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            completed_at: row
                .get::<Option<chrono::NaiveDateTime>, _>("completed_at")
                .map(|dt| dt.and_utc()),
        })
    }

    /// Plain (unlocked) read of the wallet row inside the transaction
    async fn read_wallet(
        tx: &mut PgTransaction<'_, Postgres>,
        wallet_id: Uuid,
    ) -> WalletResult<Wallet> {
        let row = sqlx::query(
            r#"
            SELECT wallet_id, player_id, wallet_type, currency, balance, version, created_at, updated_at
            FROM wallets
            WHERE wallet_id = $1
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(WalletError::WalletNotFound(wallet_id))?;

        Self::wallet_from_row(&row)
    }

    /// Conditional version-guarded update of the wallet balance
    ///
    /// Returns `OptimisticLockConflict` when zero rows matched, i.e. a
    /// concurrent writer bumped the version after our read.
    async fn update_wallet_versioned(
        tx: &mut PgTransaction<'_, Postgres>,
        wallet_id: Uuid,
        expected_version: i32,
        new_balance: Decimal,
    ) -> WalletResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $1, version = version + 1, updated_at = NOW()
            WHERE wallet_id = $2 AND version = $3
            "#,
        )
        .bind(new_balance)
        .bind(wallet_id)
        .bind(expected_version)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WalletError::OptimisticLockConflict(wallet_id));
        }
        Ok(())
    }

    /// Insert the completed audit record for a just-applied mutation
    async fn insert_transaction(
        tx: &mut PgTransaction<'_, Postgres>,
        wallet: &Wallet,
        request: &TransactionRequest,
        new_balance: Decimal,
    ) -> WalletResult<Transaction> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions
                (transaction_id, wallet_id, player_id, transaction_type, amount,
                 balance_before, balance_after, reference_id, status, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            RETURNING transaction_id, wallet_id, player_id, transaction_type, amount,
                      balance_before, balance_after, reference_id, status, created_at, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(wallet.wallet_id)
        .bind(wallet.player_id)
        .bind(request.transaction_type.to_string())
        .bind(request.amount)
        .bind(wallet.balance)
        .bind(new_balance)
        .bind(&request.reference_id)
        .bind(TransactionStatus::Completed.to_string())
        .fetch_one(&mut **tx)
        .await?;

        Self::transaction_from_row(&row)
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn get_balance(
        &self,
        player_id: Uuid,
        wallet_type: WalletType,
        currency: &str,
    ) -> WalletResult<Wallet> {
        let row = sqlx::query(
            r#"
            SELECT wallet_id, player_id, wallet_type, currency, balance, version, created_at, updated_at
            FROM wallets
            WHERE player_id = $1 AND wallet_type = $2 AND currency = $3
            "#,
        )
        .bind(player_id)
        .bind(wallet_type.to_string())
        .bind(currency)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(WalletError::WalletNotFound(player_id))?;

        Self::wallet_from_row(&row)
    }

    async fn get_transaction_by_reference(
        &self,
        reference_id: &str,
        transaction_type: TransactionType,
    ) -> WalletResult<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT transaction_id, wallet_id, player_id, transaction_type, amount,
                   balance_before, balance_after, reference_id, status, created_at, completed_at
            FROM transactions
            WHERE reference_id = $1 AND transaction_type = $2
            "#,
        )
        .bind(reference_id)
        .bind(transaction_type.to_string())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(Self::transaction_from_row).transpose()
    }

    async fn create_wallet(
        &self,
        player_id: Uuid,
        wallet_type: WalletType,
        currency: &str,
    ) -> WalletResult<Wallet> {
        let row = sqlx::query(
            r#"
            INSERT INTO wallets (wallet_id, player_id, wallet_type, currency)
            VALUES ($1, $2, $3, $4)
            RETURNING wallet_id, player_id, wallet_type, currency, balance, version, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(player_id)
        .bind(wallet_type.to_string())
        .bind(currency)
        .fetch_one(self.pool.as_ref())
        .await?;

        Self::wallet_from_row(&row)
    }

    async fn credit(
        &self,
        wallet_id: Uuid,
        request: &TransactionRequest,
    ) -> WalletResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let wallet = Self::read_wallet(&mut tx, wallet_id).await?;
        let new_balance = wallet.balance + request.amount;

        Self::update_wallet_versioned(&mut tx, wallet_id, wallet.version, new_balance).await?;
        let transaction = Self::insert_transaction(&mut tx, &wallet, request, new_balance).await?;

        tx.commit().await?;
        Ok(transaction)
    }

    async fn debit(
        &self,
        wallet_id: Uuid,
        request: &TransactionRequest,
    ) -> WalletResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let wallet = Self::read_wallet(&mut tx, wallet_id).await?;
        if wallet.balance < request.amount {
            return Err(WalletError::InsufficientFunds {
                available: wallet.balance,
                required: request.amount,
            });
        }
        let new_balance = wallet.balance - request.amount;

        Self::update_wallet_versioned(&mut tx, wallet_id, wallet.version, new_balance).await?;
        let transaction = Self::insert_transaction(&mut tx, &wallet, request, new_balance).await?;

        tx.commit().await?;
        Ok(transaction)
    }

    async fn get_transactions(
        &self,
        player_id: Uuid,
        limit: i64,
    ) -> WalletResult<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, wallet_id, player_id, transaction_type, amount,
                   balance_before, balance_after, reference_id, status, created_at, completed_at
            FROM transactions
            WHERE player_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(player_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(Self::transaction_from_row).collect()
    }
}
