//! Bonus wagering module: contribution accrual, completion, notifications.
//!
//! This module implements:
//! - Wagering progress accumulation from bet events, weighted by per-game
//!   contribution ratios
//! - Pessimistic row locking (`SELECT ... FOR UPDATE`) around every
//!   progress mutation, with a mandatory status re-check under the lock
//! - Idempotent event recording keyed on `bet_id`, backstopped by a unique
//!   constraint
//! - Progress clamped at the requirement and an atomic completion
//!   transition
//! - Best-effort post-commit progress notifications via [`NotificationHub`]

pub mod errors;
pub mod models;
pub mod notify;
pub mod repository;
pub mod service;

pub use errors::{BonusError, BonusResult};
pub use models::{
    BetEvent, BonusStatus, Game, GameType, PlayerBonus, WageringEvent, WageringProgress,
    WageringUpdate,
};
pub use notify::{NotificationHub, SUBSCRIBER_QUEUE_CAPACITY, Subscription};
pub use repository::{BonusRepository, PgBonusRepository};
pub use service::BonusService;
