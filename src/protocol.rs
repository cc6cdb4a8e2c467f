use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::board::{cells_serde, Board, Cell, Symbol};
use crate::config::Control;
use crate::engine::{SearchConfig, SearchOutcome};
use crate::error::{ConfigError, RuleViolation};
use crate::rules::{
    Action, CounterTable, Cooldowns, Move, MoveCounters, Rules, Variation,
    DEFAULT_DELETE_COOLDOWN, DEFAULT_MOVE_COOLDOWN,
};

fn default_delete_cooldown() -> u32 {
    DEFAULT_DELETE_COOLDOWN
}

fn default_move_cooldown() -> u32 {
    DEFAULT_MOVE_COOLDOWN
}

/// Stateless AI invocation: a full snapshot in, one move out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(with = "cells_serde")]
    pub board: Vec<Cell>,
    pub mover_symbol: Symbol,
    pub opponent_symbols: Vec<Symbol>,
    #[serde(default)]
    pub move_counters: HashMap<Symbol, MoveCounters>,
    pub max_depth: u32,
    pub board_size: usize,
    pub win_length: usize,
    #[serde(default = "default_delete_cooldown")]
    pub delete_cooldown: u32,
    #[serde(default = "default_move_cooldown")]
    pub move_cooldown: u32,
    #[serde(default)]
    pub variation: Variation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_ms: Option<u64>,
}

impl SearchRequest {
    pub fn into_config(self) -> Result<SearchConfig, ConfigError> {
        let board = Board::from_cells(self.board_size, self.win_length, self.board)?;
        let cooldowns = Cooldowns { delete: self.delete_cooldown, relocate: self.move_cooldown };
        let counters = CounterTable::from_map(&self.move_counters, &cooldowns);
        let rules = Rules::new(self.variation, cooldowns);
        let config = SearchConfig::new(board, self.mover_symbol, self.opponent_symbols, counters, rules, self.max_depth)?;
        Ok(config.with_time_budget(self.time_budget_ms.map(Duration::from_millis)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub best_move: Option<Move>,
    pub best_score: i64,
}

impl From<&SearchOutcome> for SearchResponse {
    fn from(outcome: &SearchOutcome) -> Self {
        Self { best_move: outcome.best_move, best_score: outcome.best_score }
    }
}

/// A move as a client names it. Relocations may leave the source implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub action: Action,
    pub index: usize,
    #[serde(default, alias = "sourceIndex", skip_serializing_if = "Option::is_none")]
    pub from_index: Option<usize>,
}

impl MoveRequest {
    pub fn mark(index: usize) -> Self {
        Self { action: Action::Mark, index, from_index: None }
    }

    pub fn delete(index: usize) -> Self {
        Self { action: Action::Delete, index, from_index: None }
    }

    pub fn relocate(index: usize) -> Self {
        Self { action: Action::Relocate, index, from_index: None }
    }

    /// Turns the request into a concrete move for `symbol`, taking the
    /// relocation source from the first adjacent own mark when none is given.
    pub fn resolve(&self, board: &Board, symbol: Symbol) -> Result<Move, RuleViolation> {
        match self.action {
            Action::Mark => Ok(Move::Mark { index: self.index }),
            Action::Delete => Ok(Move::Delete { index: self.index }),
            Action::Relocate => {
                if !board.contains(self.index) {
                    return Err(RuleViolation::OutOfBounds { index: self.index });
                }
                let from = match self.from_index {
                    Some(from) => from,
                    None => board.find_adjacent(self.index, symbol)
                        .ok_or(RuleViolation::NotAdjacent { index: self.index, symbol })?,
                };
                Ok(Move::Relocate { to: self.index, from })
            }
        }
    }
}

impl From<Move> for MoveRequest {
    fn from(mv: Move) -> Self {
        Self { action: mv.action(), index: mv.target(), from_index: mv.source() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub mover: Symbol,
    /// Absent when a computer seat had no legal move and the game was called a draw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_move: Option<Move>,
    pub game_over: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Symbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_line: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_mover_symbol: Option<Symbol>,
    pub move_counters: BTreeMap<Symbol, MoveCounters>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatState {
    pub symbol: Symbol,
    pub name: String,
    pub control: Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStatus {
    pub action: Action,
    pub available: bool,
    pub moves_remaining: u32,
}

/// Everything a client needs to redraw after any change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub board_size: usize,
    pub win_length: usize,
    #[serde(with = "cells_serde")]
    pub board: Vec<Cell>,
    pub players: Vec<SeatState>,
    pub current_mover: Symbol,
    pub game_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Symbol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_line: Option<Vec<usize>>,
    pub draw: bool,
    pub move_counters: BTreeMap<Symbol, MoveCounters>,
    pub delete_cooldown: u32,
    pub move_cooldown: u32,
    pub variation: Variation,
    pub actions: Vec<ActionStatus>,
    pub wins: BTreeMap<Symbol, u32>,
}
