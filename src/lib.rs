//! Rules and search for a multi-player grid game with mark, delete and
//! relocate moves.
//!
//! The core is synchronous and in-process: [`rules`] validates and applies
//! moves, [`engine`] picks moves for computer seats, and [`session`] keeps
//! one game's turn order. The websocket server in `main.rs` is a thin
//! adapter over [`session`] and [`protocol`].

pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod movegen;
pub mod protocol;
pub mod rules;
pub mod session;

pub use board::{scan_lines, Board, Cell, Line, Symbol};
pub use config::{Control, Difficulty, GameConfig, PlayerConfig};
pub use engine::{Engine, SearchConfig, SearchOutcome, FORCED_WIN, WIN_SCORE};
pub use error::{ConfigError, ProtocolError, RuleViolation};
pub use eval::evaluate;
pub use movegen::generate_moves;
pub use protocol::{MoveRequest, MoveResponse, SearchRequest, SearchResponse, SessionState};
pub use rules::{check_draw, check_win, Action, CounterTable, GameOutcome, Move, MoveCounters, Rules, Variation};
pub use session::Session;
