use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::board::{Board, Symbol, MAX_PLAYERS};
use crate::error::ConfigError;
use crate::rules::{Cooldowns, Rules, Variation};

pub const MIN_PLAYERS: usize = 2;
pub const DEFAULT_WIN_LENGTH: usize = 4;

static SEAT_ORDER: [Symbol; MAX_PLAYERS] = Symbol::ALL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn max_depth(self) -> u32 {
        match self {
            Difficulty::Easy => 2,
            Difficulty::Medium => 4,
            Difficulty::Hard => 6,
            Difficulty::Expert => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Control {
    #[default]
    Human,
    Computer {
        #[serde(default)]
        difficulty: Difficulty,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub name: String,
    #[serde(default)]
    pub control: Control,
}

impl PlayerConfig {
    pub fn human(name: &str) -> Self {
        Self { name: name.to_string(), control: Control::Human }
    }

    pub fn computer(name: &str, difficulty: Difficulty) -> Self {
        Self { name: name.to_string(), control: Control::Computer { difficulty } }
    }
}

/// Everything a session needs at creation. Seats take symbols `X, O, D, T, S` in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub board_size: usize,
    pub win_length: usize,
    pub players: Vec<PlayerConfig>,
    #[serde(flatten)]
    pub cooldowns: Cooldowns,
    #[serde(default)]
    pub variation: Variation,
    /// Wall-clock allowance for each computer turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_ms: Option<u64>,
}

impl GameConfig {
    /// Hot-seat game for `count` humans on a `(4 + count)`-wide board.
    pub fn for_players(count: usize) -> Self {
        let players = (0..count)
            .map(|seat| PlayerConfig::human(&format!("Player {}", seat + 1)))
            .collect();
        Self {
            board_size: 4 + count,
            win_length: DEFAULT_WIN_LENGTH,
            players,
            cooldowns: Cooldowns::default(),
            variation: Variation::default(),
            time_budget_ms: None,
        }
    }

    /// Human `X` against a computer `O`.
    pub fn vs_computer(difficulty: Difficulty) -> Self {
        let mut config = Self::for_players(2);
        config.players = vec![PlayerConfig::human("Player"), PlayerConfig::computer("Computer", difficulty)];
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players.len()) {
            return Err(ConfigError::PlayerCount(self.players.len()));
        }
        Board::new(self.board_size, self.win_length).map(|_| ())
    }

    pub fn symbols(&self) -> &'static [Symbol] {
        &SEAT_ORDER[..self.players.len().min(MAX_PLAYERS)]
    }

    pub fn rules(&self) -> Rules {
        Rules::new(self.variation, self.cooldowns)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_grows_with_players() {
        for count in 2..=5 {
            let config = GameConfig::for_players(count);
            assert_eq!(config.board_size, 4 + count);
            assert_eq!(config.win_length, 4);
            assert_eq!(config.symbols().len(), count);
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_rejects_player_counts() {
        assert_eq!(GameConfig::for_players(1).validate(), Err(ConfigError::PlayerCount(1)));
        assert_eq!(GameConfig::for_players(6).validate(), Err(ConfigError::PlayerCount(6)));
    }

    #[test]
    fn test_rejects_board_smaller_than_line() {
        let mut config = GameConfig::for_players(2);
        config.board_size = 3;
        assert_eq!(config.validate(), Err(ConfigError::BoardTooSmall { size: 3, win_length: 4 }));
    }

    #[test]
    fn test_difficulty_depths() {
        let depths: Vec<u32> = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard, Difficulty::Expert]
            .into_iter()
            .map(Difficulty::max_depth)
            .collect();
        assert_eq!(depths, vec![2, 4, 6, 8]);
    }

    #[test]
    fn test_parses_minimal_json() {
        let config: GameConfig = serde_json::from_str(r#"{
            "boardSize": 7,
            "winLength": 4,
            "players": [
                {"name": "Ann"},
                {"name": "Bot", "control": {"kind": "computer", "difficulty": "hard"}},
                {"name": "Cy", "control": {"kind": "human"}}
            ],
            "deleteCooldown": 2
        }"#).unwrap();
        assert_eq!(config.players[1].control, Control::Computer { difficulty: Difficulty::Hard });
        assert_eq!(config.players[0].control, Control::Human);
        assert_eq!(config.cooldowns, Cooldowns { delete: 2, relocate: 3 });
        assert_eq!(config.variation, Variation::Full);
        assert_eq!(config.time_budget(), None);
        assert_eq!(config.symbols(), &[Symbol::X, Symbol::O, Symbol::D]);
    }

    #[test]
    fn test_variation_names() {
        let parsed: Vec<Variation> = serde_json::from_str(r#"["mark-only", "mark+delete", "mark+delete+relocate"]"#).unwrap();
        assert_eq!(parsed, vec![Variation::MarkOnly, Variation::MarkDelete, Variation::Full]);
    }
}
