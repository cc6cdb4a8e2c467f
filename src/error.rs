use thiserror::Error;
use crate::board::Symbol;
use crate::rules::Action;

/// An illegal move. The board and counters are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("cell {index} is outside the board")]
    OutOfBounds { index: usize },
    #[error("cell {index} is occupied")]
    CellOccupied { index: usize },
    #[error("cell {index} is empty")]
    CellEmpty { index: usize },
    #[error("cell {index} holds your own mark")]
    OwnMark { index: usize },
    #[error("no {symbol} mark is adjacent to cell {index}")]
    NotAdjacent { index: usize, symbol: Symbol },
    #[error("cell {given} is not the relocate source for this target")]
    SourceMismatch { given: usize, expected: usize },
    #[error("{action} is on cooldown for {remaining} more move(s)")]
    Cooldown { action: Action, remaining: u32 },
    #[error("{0} is disabled in this variation")]
    ActionDisabled(Action),
    #[error("it is not {0}'s turn")]
    NotYourTurn(Symbol),
    #[error("the game is over")]
    GameOver,
    #[error("{0} is not seated in this game")]
    UnknownPlayer(Symbol),
}

/// Invalid setup. Raised when a session or search is created, never mid-game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("expected 2 to 5 players, got {0}")]
    PlayerCount(usize),
    #[error("board size {size} is smaller than win length {win_length}")]
    BoardTooSmall { size: usize, win_length: usize },
    #[error("win length {0} is below the minimum of 3")]
    WinLengthTooShort(usize),
    #[error("expected {expected} cells, got {actual}")]
    CellCount { expected: usize, actual: usize },
    #[error("symbol {0} is listed more than once")]
    DuplicateSymbol(Symbol),
    #[error("mover {0} is also listed as an opponent")]
    MoverIsOpponent(Symbol),
    #[error("at least one opponent is required")]
    NoOpponents,
    #[error("search depth must be at least 1")]
    ZeroDepth,
}

/// Failures surfaced to websocket clients.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("unknown message: {0}")]
    UnknownMessage(String),
    #[error("no game has been started")]
    NoSession,
    #[error("session state is unavailable")]
    Poisoned,
    #[error(transparent)]
    Rule(#[from] RuleViolation),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("search task failed: {0}")]
    Task(String),
}
