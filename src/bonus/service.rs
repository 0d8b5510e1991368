//! Bonus wagering engine.
//!
//! Accumulates wagering contribution from bet events against a bonus's
//! requirement. Each bet is applied inside one database transaction holding
//! a pessimistic lock on the bonus row: status is re-checked under the lock
//! (the earlier active-bonus read is stale), progress is clamped at the
//! requirement, the wagering event is recorded, and the completion
//! transition happens atomically with the progress write. Subscribers are
//! notified only after the transaction commits.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;
use uuid::Uuid;

use super::errors::{BonusError, BonusResult};
use super::models::{BetEvent, BonusStatus, PlayerBonus, WageringEvent, WageringProgress, WageringUpdate};
use super::notify::{NotificationHub, Subscription};
use super::repository::BonusRepository;

/// Add a bet's contribution to the current progress, clamped at the
/// requirement. Returns the new progress and whether it saturates the
/// requirement.
pub(crate) fn apply_contribution(
    current: Decimal,
    contribution: Decimal,
    required: Decimal,
) -> (Decimal, bool) {
    let new_progress = (current + contribution).min(required);
    (new_progress, new_progress >= required)
}

/// Bonus wagering engine
#[derive(Clone)]
pub struct BonusService {
    pool: Arc<PgPool>,
    repo: Arc<dyn BonusRepository>,
    hub: NotificationHub,
}

impl BonusService {
    pub fn new(pool: Arc<PgPool>, repo: Arc<dyn BonusRepository>) -> Self {
        Self {
            pool,
            repo,
            hub: NotificationHub::new(),
        }
    }

    /// Apply one bet event to the player's active bonus.
    ///
    /// Duplicate delivery of the same `bet_id` is a no-op, not an error. A
    /// player without an active bonus is also a no-op: the bet simply does
    /// not contribute anywhere.
    ///
    /// # Errors
    ///
    /// * `BonusError::BonusExpired` - the active bonus's expiry is in the
    ///   past; no state is mutated on this path
    /// * `BonusError::GameNotFound` - unknown game id
    /// * `BonusError::BonusNotActive` - the bonus left the active state
    ///   between the unlocked read and the locked re-check
    pub async fn process_bet_wagering(&self, bet: BetEvent) -> BonusResult<()> {
        match self.repo.get_event_by_bet_id(&bet.bet_id).await {
            Ok(_) => {
                info!("Wagering event already recorded for bet {}", bet.bet_id);
                return Ok(());
            }
            Err(BonusError::WageringEventNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        let active_bonus = match self.repo.get_active_bonus(bet.player_id).await {
            Ok(bonus) => bonus,
            Err(BonusError::BonusNotFound) => {
                info!("No active bonus for player {}, ignoring bet", bet.player_id);
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        if Utc::now() > active_bonus.expires_at {
            warn!(
                "Bonus expired: bonus_id={} player={}",
                active_bonus.player_bonus_id, bet.player_id
            );
            return Err(BonusError::BonusExpired(active_bonus.player_bonus_id));
        }

        let game = self.repo.get_game(bet.game_id).await?;
        let wagering_contribution = bet.bet_amount * game.contribution;

        let mut tx = self.pool.begin().await?;

        let bonus = self
            .repo
            .get_bonus_for_update(&mut tx, active_bonus.player_bonus_id)
            .await?;

        // Mandatory re-check: the unlocked read above is stale and the
        // bonus may have completed or been forfeited concurrently.
        if bonus.status != BonusStatus::Active {
            return Err(BonusError::BonusNotActive(bonus.player_bonus_id));
        }

        let (new_progress, completed) = apply_contribution(
            bonus.wagering_completed,
            wagering_contribution,
            bonus.wagering_required,
        );

        self.repo
            .update_wagering_progress(&mut tx, bonus.player_bonus_id, new_progress)
            .await?;

        let event = WageringEvent {
            event_id: Uuid::new_v4(),
            player_bonus_id: bonus.player_bonus_id,
            bet_id: bet.bet_id.clone(),
            game_id: bet.game_id,
            bet_amount: bet.bet_amount,
            contribution_percentage: game.contribution,
            wagering_contribution,
            created_at: Utc::now(),
        };
        if let Err(err) = self.repo.create_wagering_event(&mut tx, &event).await {
            // A concurrent delivery of the same bet id committed between
            // our idempotency check and this insert; the unique constraint
            // makes the duplicate harmless, so treat it as replayed.
            if is_unique_violation(&err) {
                info!("Concurrent duplicate of bet {}, skipping", bet.bet_id);
                return Ok(());
            }
            return Err(err);
        }

        if completed {
            self.repo
                .update_bonus_status(&mut tx, bonus.player_bonus_id, BonusStatus::Completed)
                .await?;
            info!(
                "Bonus wagering completed: bonus_id={} player={}",
                bonus.player_bonus_id, bet.player_id
            );
        }

        tx.commit().await?;

        // Best-effort push after commit; a lost notification loses nothing
        // financial, the progress remains queryable.
        self.send_wagering_update(bet.player_id, bonus.player_bonus_id, completed)
            .await;

        info!(
            "Wagering processed: bet_id={} player={} contribution={} completed={}",
            bet.bet_id, bet.player_id, wagering_contribution, completed
        );
        Ok(())
    }

    /// Progress snapshot for a specific bonus, or the player's active bonus
    /// when `bonus_id` is `None`.
    pub async fn get_wagering_progress(
        &self,
        player_id: Uuid,
        bonus_id: Option<Uuid>,
    ) -> BonusResult<WageringProgress> {
        let bonus = match bonus_id {
            Some(id) => self.repo.get_bonus(id).await?,
            None => self.repo.get_active_bonus(player_id).await?,
        };

        Ok(WageringProgress {
            player_bonus_id: bonus.player_bonus_id,
            wagering_required: bonus.wagering_required,
            wagering_completed: bonus.wagering_completed,
            percentage_complete: percentage_complete(
                bonus.wagering_completed,
                bonus.wagering_required,
            ),
            completed: bonus.status == BonusStatus::Completed,
        })
    }

    /// Grant a bonus: requirement = amount x multiplier, progress zero.
    pub async fn create_player_bonus(
        &self,
        player_id: Uuid,
        bonus_id: Uuid,
        bonus_amount: Decimal,
        wagering_multiplier: Decimal,
        expires_at: DateTime<Utc>,
    ) -> BonusResult<PlayerBonus> {
        let bonus = PlayerBonus {
            player_bonus_id: Uuid::new_v4(),
            player_id,
            bonus_id,
            status: BonusStatus::Active,
            bonus_amount,
            wagering_required: bonus_amount * wagering_multiplier,
            wagering_completed: Decimal::ZERO,
            expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.repo.create_player_bonus(&bonus).await?;

        info!(
            "Player bonus created: bonus_id={} player={} amount={} wagering_required={}",
            bonus.player_bonus_id, player_id, bonus_amount, bonus.wagering_required
        );
        Ok(bonus)
    }

    /// Subscribe to live wagering updates for a player.
    ///
    /// The returned handle unregisters its queue when dropped.
    pub fn subscribe_to_wagering_updates(&self, player_id: Uuid) -> Subscription {
        self.hub.subscribe(player_id)
    }

    async fn send_wagering_update(&self, player_id: Uuid, bonus_id: Uuid, completed: bool) {
        let progress = match self.get_wagering_progress(player_id, Some(bonus_id)).await {
            Ok(progress) => progress,
            Err(err) => {
                error!("Failed to get progress for notification: {err}");
                return;
            }
        };

        self.hub.notify(
            player_id,
            WageringUpdate {
                player_bonus_id: progress.player_bonus_id,
                player_id,
                wagering_completed: progress.wagering_completed,
                wagering_required: progress.wagering_required,
                percentage_complete: progress.percentage_complete,
                completed,
                timestamp: Utc::now(),
            },
        );
    }
}

fn percentage_complete(completed: Decimal, required: Decimal) -> f64 {
    if required.is_zero() {
        return 0.0;
    }
    (completed / required * Decimal::from(100))
        .to_f64()
        .unwrap_or(0.0)
}

fn is_unique_violation(err: &BonusError) -> bool {
    matches!(
        err,
        BonusError::Database(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn contribution_accumulates_below_requirement() {
        let (progress, completed) = apply_contribution(dec!(100), dec!(50), dec!(1000));
        assert_eq!(progress, dec!(150));
        assert!(!completed);
    }

    #[test]
    fn contribution_clamps_at_requirement() {
        let (progress, completed) = apply_contribution(dec!(980), dec!(50), dec!(1000));
        assert_eq!(progress, dec!(1000));
        assert!(completed);
    }

    #[test]
    fn exact_requirement_completes() {
        let (progress, completed) = apply_contribution(dec!(950), dec!(50), dec!(1000));
        assert_eq!(progress, dec!(1000));
        assert!(completed);
    }

    #[test]
    fn percentage_of_zero_requirement_is_zero() {
        assert_eq!(percentage_complete(dec!(0), dec!(0)), 0.0);
        assert_eq!(percentage_complete(dec!(500), dec!(1000)), 50.0);
    }

    proptest! {
        #[test]
        fn progress_never_exceeds_requirement(
            current in 0u64..1_000_000,
            contribution in 0u64..1_000_000,
            required in 1u64..1_000_000,
        ) {
            let current = Decimal::from(current.min(required));
            let (progress, completed) = apply_contribution(
                current,
                Decimal::from(contribution),
                Decimal::from(required),
            );
            prop_assert!(progress <= Decimal::from(required));
            prop_assert!(progress >= current);
            prop_assert_eq!(completed, progress == Decimal::from(required));
        }
    }
}
