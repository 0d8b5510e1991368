//! Bonus wagering data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Player bonus status. Transitions only move forward out of `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusStatus {
    Active,
    Completed,
    Forfeited,
    Expired,
}

impl std::fmt::Display for BonusStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BonusStatus::Active => write!(f, "active"),
            BonusStatus::Completed => write!(f, "completed"),
            BonusStatus::Forfeited => write!(f, "forfeited"),
            BonusStatus::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for BonusStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BonusStatus::Active),
            "completed" => Ok(BonusStatus::Completed),
            "forfeited" => Ok(BonusStatus::Forfeited),
            "expired" => Ok(BonusStatus::Expired),
            other => Err(format!("unknown bonus status: {other}")),
        }
    }
}

/// Game category, determining the default wagering contribution band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Slots,
    TableGames,
    LiveCasino,
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Slots => write!(f, "slots"),
            GameType::TableGames => write!(f, "table_games"),
            GameType::LiveCasino => write!(f, "live_casino"),
        }
    }
}

impl std::str::FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slots" => Ok(GameType::Slots),
            "table_games" => Ok(GameType::TableGames),
            "live_casino" => Ok(GameType::LiveCasino),
            other => Err(format!("unknown game type: {other}")),
        }
    }
}

/// One bonus grant for a player.
///
/// `wagering_completed` never exceeds `wagering_required`; once the status
/// leaves `Active` the row is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBonus {
    pub player_bonus_id: Uuid,
    pub player_id: Uuid,
    pub bonus_id: Uuid,
    pub status: BonusStatus,
    pub bonus_amount: Decimal,
    pub wagering_required: Decimal,
    pub wagering_completed: Decimal,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Static reference data mapping a game to its wagering contribution ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub game_id: Uuid,
    pub game_name: String,
    pub game_type: GameType,
    /// Fraction of a bet counting toward wagering, in [0, 1].
    pub contribution: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable record of one bet's contribution toward a bonus.
///
/// `bet_id` is unique and serves as the idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WageringEvent {
    pub event_id: Uuid,
    pub player_bonus_id: Uuid,
    pub bet_id: String,
    pub game_id: Uuid,
    pub bet_amount: Decimal,
    pub contribution_percentage: Decimal,
    pub wagering_contribution: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Incoming bet event from the game platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetEvent {
    pub bet_id: String,
    pub player_id: Uuid,
    pub game_id: Uuid,
    pub bet_amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Wagering progress snapshot for a bonus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WageringProgress {
    pub player_bonus_id: Uuid,
    pub wagering_required: Decimal,
    pub wagering_completed: Decimal,
    pub percentage_complete: f64,
    pub completed: bool,
}

/// Progress update pushed to live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WageringUpdate {
    pub player_bonus_id: Uuid,
    pub player_id: Uuid,
    pub wagering_completed: Decimal,
    pub wagering_required: Decimal,
    pub percentage_complete: f64,
    pub completed: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonus_status_round_trips_through_display() {
        for status in [
            BonusStatus::Active,
            BonusStatus::Completed,
            BonusStatus::Forfeited,
            BonusStatus::Expired,
        ] {
            assert_eq!(status.to_string().parse::<BonusStatus>().unwrap(), status);
        }
        assert!("pending".parse::<BonusStatus>().is_err());
    }

    #[test]
    fn game_type_parsing() {
        assert_eq!("slots".parse::<GameType>().unwrap(), GameType::Slots);
        assert_eq!(
            "table_games".parse::<GameType>().unwrap(),
            GameType::TableGames
        );
        assert_eq!(
            "live_casino".parse::<GameType>().unwrap(),
            GameType::LiveCasino
        );
        assert!("poker".parse::<GameType>().is_err());
    }
}
