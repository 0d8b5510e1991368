//! Wallet module providing the money ledger with idempotent transactions.
//!
//! This module implements:
//! - One wallet per (player, kind, currency) triple, created lazily on the
//!   first credit-class event
//! - Optimistic concurrency control: version-guarded conditional updates,
//!   bounded retry on conflict
//! - Idempotency keyed on `(reference_id, transaction_type)` so duplicate
//!   delivery of the same external event replays the recorded outcome
//! - An immutable `transactions` audit trail with balance before/after
//!
//! ## Example
//!
//! ```no_run
//! use pam_wallet::db::Database;
//! use pam_wallet::wallet::{
//!     PgWalletRepository, TransactionRequest, TransactionType, WalletService, WalletType,
//! };
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let repo = Arc::new(PgWalletRepository::new(Arc::new(db.pool().clone())));
//!     let service = WalletService::new(repo);
//!
//!     let response = service
//!         .process_transaction(TransactionRequest {
//!             player_id: Uuid::new_v4(),
//!             wallet_type: WalletType::Main,
//!             transaction_type: TransactionType::Deposit,
//!             amount: Decimal::new(10000, 2),
//!             reference_id: "payment-12345".to_string(),
//!             currency: "USD".to_string(),
//!         })
//!         .await?;
//!     println!("Balance after deposit: {}", response.balance);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod models;
pub mod repository;
pub mod service;

pub use errors::{WalletError, WalletResult};
pub use models::{
    Transaction, TransactionRequest, TransactionResponse, TransactionStatus, TransactionType,
    Wallet, WalletType,
};
pub use repository::{PgWalletRepository, WalletRepository};
pub use service::WalletService;
