//! Bonus wagering repository over PostgreSQL.
//!
//! Unlike the wallet ledger, bonus rows are mutated under a pessimistic row
//! lock: many bets land on the same active bonus in a short window, the
//! update itself is cheap, and blocking briefly behind `SELECT ... FOR
//! UPDATE` is cheaper than a retry storm. The transactional methods take
//! the enclosing transaction explicitly; `update_wagering_progress` is
//! unconditional and its correctness relies on the caller already holding
//! the row lock from `get_bonus_for_update` within the same transaction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction as PgTransaction};
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{BonusError, BonusResult};
use super::models::{BonusStatus, Game, PlayerBonus, WageringEvent};

/// Trait for bonus wagering repository operations
#[async_trait]
pub trait BonusRepository: Send + Sync {
    /// Get the player's current active bonus
    async fn get_active_bonus(&self, player_id: Uuid) -> BonusResult<PlayerBonus>;

    /// Get a bonus by its id
    async fn get_bonus(&self, player_bonus_id: Uuid) -> BonusResult<PlayerBonus>;

    /// Get a game's reference data
    async fn get_game(&self, game_id: Uuid) -> BonusResult<Game>;

    /// Look up a wagering event by its idempotency key
    async fn get_event_by_bet_id(&self, bet_id: &str) -> BonusResult<WageringEvent>;

    /// Insert a new bonus grant
    async fn create_player_bonus(&self, bonus: &PlayerBonus) -> BonusResult<()>;

    /// Lock the bonus row for the duration of the enclosing transaction
    ///
    /// Concurrent lockers on the same bonus block until the holder's
    /// transaction ends, then proceed serially.
    async fn get_bonus_for_update(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        player_bonus_id: Uuid,
    ) -> BonusResult<PlayerBonus>;

    /// Unconditionally set the wagering progress; caller must hold the row lock
    async fn update_wagering_progress(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        player_bonus_id: Uuid,
        new_progress: Decimal,
    ) -> BonusResult<()>;

    /// Insert a wagering event; the `bet_id` unique constraint is the
    /// storage-layer backstop against duplicate recording
    async fn create_wagering_event(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        event: &WageringEvent,
    ) -> BonusResult<()>;

    /// Unconditionally set the bonus status
    async fn update_bonus_status(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        player_bonus_id: Uuid,
        status: BonusStatus,
    ) -> BonusResult<()>;
}

/// PostgreSQL implementation of [`BonusRepository`]
#[derive(Clone)]
pub struct PgBonusRepository {
    pool: Arc<PgPool>,
}

const BONUS_COLUMNS: &str = "player_bonus_id, player_id, bonus_id, status, bonus_amount, \
     wagering_required, wagering_completed, expires_at, created_at, updated_at";

impl PgBonusRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn bonus_from_row(row: &PgRow) -> BonusResult<PlayerBonus> {
        Ok(PlayerBonus {
            player_bonus_id: row.get("player_bonus_id"),
            player_id: row.get("player_id"),
            bonus_id: row.get("bonus_id"),
            status: row
                .get::<String, _>("status")
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            bonus_amount: row.get("bonus_amount"),
            wagering_required: row.get("wagering_required"),
            wagering_completed: row.get("wagering_completed"),
            expires_at: row.get::<chrono::NaiveDateTime, _>("expires_at").and_utc(),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    fn game_from_row(row: &PgRow) -> BonusResult<Game> {
        Ok(Game {
            game_id: row.get("game_id"),
            game_name: row.get("game_name"),
            game_type: row
                .get::<String, _>("game_type")
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            contribution: row.get("contribution"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    fn event_from_row(row: &PgRow) -> WageringEvent {
        WageringEvent {
            event_id: row.get("event_id"),
            player_bonus_id: row.get("player_bonus_id"),
            bet_id: row.get("bet_id"),
            game_id: row.get("game_id"),
            bet_amount: row.get("bet_amount"),
            contribution_percentage: row.get("contribution_percentage"),
            wagering_contribution: row.get("wagering_contribution"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        }
    }
}

#[async_trait]
impl BonusRepository for PgBonusRepository {
    async fn get_active_bonus(&self, player_id: Uuid) -> BonusResult<PlayerBonus> {
        // At most one active bonus per player is an engine assumption, not
        // a storage constraint; newest-first makes a racing second grant
        // resolve deterministically.
        let row = sqlx::query(&format!(
            "SELECT {BONUS_COLUMNS}
             FROM player_bonuses
             WHERE player_id = $1 AND status = $2
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(player_id)
        .bind(BonusStatus::Active.to_string())
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(BonusError::BonusNotFound)?;

        Self::bonus_from_row(&row)
    }

    async fn get_bonus(&self, player_bonus_id: Uuid) -> BonusResult<PlayerBonus> {
        let row = sqlx::query(&format!(
            "SELECT {BONUS_COLUMNS}
             FROM player_bonuses
             WHERE player_bonus_id = $1"
        ))
        .bind(player_bonus_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(BonusError::BonusNotFound)?;

        Self::bonus_from_row(&row)
    }

    async fn get_game(&self, game_id: Uuid) -> BonusResult<Game> {
        let row = sqlx::query(
            r#"
            SELECT game_id, game_name, game_type, contribution, created_at, updated_at
            FROM games
            WHERE game_id = $1
            "#,
        )
        .bind(game_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(BonusError::GameNotFound(game_id))?;

        Self::game_from_row(&row)
    }

    async fn get_event_by_bet_id(&self, bet_id: &str) -> BonusResult<WageringEvent> {
        let row = sqlx::query(
            r#"
            SELECT event_id, player_bonus_id, bet_id, game_id, bet_amount,
                   contribution_percentage, wagering_contribution, created_at
            FROM wagering_events
            WHERE bet_id = $1
            "#,
        )
        .bind(bet_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| BonusError::WageringEventNotFound(bet_id.to_string()))?;

        Ok(Self::event_from_row(&row))
    }

    async fn create_player_bonus(&self, bonus: &PlayerBonus) -> BonusResult<()> {
        sqlx::query(
            r#"
            INSERT INTO player_bonuses
                (player_bonus_id, player_id, bonus_id, status, bonus_amount,
                 wagering_required, wagering_completed, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(bonus.player_bonus_id)
        .bind(bonus.player_id)
        .bind(bonus.bonus_id)
        .bind(bonus.status.to_string())
        .bind(bonus.bonus_amount)
        .bind(bonus.wagering_required)
        .bind(bonus.wagering_completed)
        .bind(bonus.expires_at.naive_utc())
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn get_bonus_for_update(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        player_bonus_id: Uuid,
    ) -> BonusResult<PlayerBonus> {
        let row = sqlx::query(&format!(
            "SELECT {BONUS_COLUMNS}
             FROM player_bonuses
             WHERE player_bonus_id = $1
             FOR UPDATE"
        ))
        .bind(player_bonus_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(BonusError::BonusNotFound)?;

        Self::bonus_from_row(&row)
    }

    async fn update_wagering_progress(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        player_bonus_id: Uuid,
        new_progress: Decimal,
    ) -> BonusResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE player_bonuses
            SET wagering_completed = $1, updated_at = NOW()
            WHERE player_bonus_id = $2
            "#,
        )
        .bind(new_progress)
        .bind(player_bonus_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BonusError::BonusNotFound);
        }
        Ok(())
    }

    async fn create_wagering_event(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        event: &WageringEvent,
    ) -> BonusResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wagering_events
                (event_id, player_bonus_id, bet_id, game_id, bet_amount,
                 contribution_percentage, wagering_contribution)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.event_id)
        .bind(event.player_bonus_id)
        .bind(&event.bet_id)
        .bind(event.game_id)
        .bind(event.bet_amount)
        .bind(event.contribution_percentage)
        .bind(event.wagering_contribution)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn update_bonus_status(
        &self,
        tx: &mut PgTransaction<'_, Postgres>,
        player_bonus_id: Uuid,
        status: BonusStatus,
    ) -> BonusResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE player_bonuses
            SET status = $1, updated_at = NOW()
            WHERE player_bonus_id = $2
            "#,
        )
        .bind(status.to_string())
        .bind(player_bonus_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BonusError::BonusNotFound);
        }
        Ok(())
    }
}
