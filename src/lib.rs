//! # PAM Wallet
//!
//! Player account management core: a money wallet ledger and a bonus
//! wagering engine backed by PostgreSQL.
//!
//! The two subsystems share one hard problem — safe concurrent mutation of
//! a versioned financial record under a relational transaction boundary —
//! but solve it with deliberately different tools:
//!
//! - the **wallet ledger** uses optimistic concurrency control: every
//!   committed mutation bumps a version counter, writers re-read and retry
//!   on conflict, readers never block;
//! - the **bonus wagering engine** uses pessimistic row locks
//!   (`SELECT ... FOR UPDATE`): many bets hit the same bonus row in a short
//!   window, so blocking briefly beats retry storms.
//!
//! Both paths are idempotent under at-least-once delivery of external
//! events: transactions are keyed by `(reference_id, transaction_type)`,
//! wagering events by `bet_id`, and duplicates replay the recorded outcome
//! (or no-op) instead of re-applying any effect.
//!
//! ## Core Modules
//!
//! - [`db`]: connection pooling and configuration
//! - [`wallet`]: balances, transactions, credit/debit coordination
//! - [`bonus`]: wagering progress, completion, live progress notifications
//! - [`retry`]: bounded retry for transient version conflicts

/// Database connection pooling and configuration.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Wallet ledger: balances and idempotent credit/debit transactions.
pub mod wallet;

/// Bonus wagering engine: contribution accrual and progress notifications.
pub mod bonus;

/// Bounded retry policy for transient conflicts.
pub mod retry;
pub use retry::RetryPolicy;
