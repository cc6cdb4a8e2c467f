use std::fmt;
use std::time::Duration;
use log::{info, warn};
use crate::board::{Board, Symbol, MAX_PLAYERS};
use crate::config::{Control, GameConfig};
use crate::engine::{Engine, SearchConfig, SearchOutcome};
use crate::error::{ConfigError, ProtocolError, RuleViolation};
use crate::protocol::{ActionStatus, MoveRequest, MoveResponse, SeatState, SessionState};
use crate::rules::{outcome, Action, CounterTable, GameOutcome, Move, Rules};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub symbol: Symbol,
    pub name: String,
    pub control: Control,
}

/// One game in memory: seats in turn order, the board, and every player's counters.
#[derive(Debug, Clone)]
pub struct Session {
    config: GameConfig,
    rules: Rules,
    seats: Vec<Seat>,
    board: Board,
    counters: CounterTable,
    turn: usize,
    outcome: GameOutcome,
    wins: [u32; MAX_PLAYERS],
}

impl Session {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seats = config.players.iter().zip(config.symbols()).map(|(player, &symbol)| Seat {
            symbol,
            name: player.name.clone(),
            control: player.control,
        }).collect();
        let rules = config.rules();
        let board = Board::new(config.board_size, config.win_length)?;
        info!("new {}x{} game for {} players", config.board_size, config.board_size, config.players.len());
        Ok(Self {
            counters: CounterTable::fresh(&rules.cooldowns),
            config,
            rules,
            seats,
            board,
            turn: 0,
            outcome: GameOutcome::Ongoing,
            wins: [0; MAX_PLAYERS],
        })
    }

    /// Clears the board and counters and hands the turn back to the first seat.
    /// Win tallies survive.
    pub fn reset(&mut self) {
        for index in 0..self.board.cell_count() {
            self.board.set(index, None);
        }
        self.counters = CounterTable::fresh(&self.rules.cooldowns);
        self.turn = 0;
        self.outcome = GameOutcome::Ongoing;
        info!("game reset");
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn counters(&self) -> &CounterTable {
        &self.counters
    }

    pub fn outcome(&self) -> &GameOutcome {
        &self.outcome
    }

    pub fn is_active(&self) -> bool {
        !self.outcome.is_over()
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn current_player(&self) -> &Seat {
        &self.seats[self.turn]
    }

    pub fn wins(&self, symbol: Symbol) -> u32 {
        self.wins[symbol.index()]
    }

    fn symbols(&self) -> Vec<Symbol> {
        self.seats.iter().map(|seat| seat.symbol).collect()
    }

    pub fn action_availability(&self) -> Vec<ActionStatus> {
        let counters = self.counters.get(self.current_player().symbol);
        Action::ALL.into_iter().map(|action| ActionStatus {
            action,
            available: self.rules.is_action_available(action, &counters),
            moves_remaining: self.rules.moves_until_available(action, &counters),
        }).collect()
    }

    /// Applies a client request on behalf of `symbol`.
    pub fn apply(&mut self, symbol: Symbol, request: &MoveRequest) -> Result<MoveResponse, RuleViolation> {
        let mv = self.check_turn(symbol)
            .and_then(|()| request.resolve(&self.board, symbol))
            .map_err(|violation| rejected(format!("{} {}", request.action, request.index), symbol, violation))?;
        self.apply_move(symbol, mv)
    }

    pub fn apply_move(&mut self, symbol: Symbol, mv: Move) -> Result<MoveResponse, RuleViolation> {
        let applied = self.check_turn(symbol)
            .and_then(|()| self.rules.apply_move(&mut self.board, mv, symbol, self.counters.get_mut(symbol)))
            .map_err(|violation| rejected(mv, symbol, violation))?;
        self.outcome = outcome(&self.board, symbol);
        if let GameOutcome::Won { symbol, .. } = &self.outcome {
            self.wins[symbol.index()] += 1;
            info!("{} wins", symbol);
        } else if self.outcome == GameOutcome::Draw {
            info!("game drawn");
        } else {
            self.turn = (self.turn + 1) % self.seats.len();
        }
        Ok(self.response(symbol, Some(applied.mv)))
    }

    fn check_turn(&self, symbol: Symbol) -> Result<(), RuleViolation> {
        if !self.is_active() {
            return Err(RuleViolation::GameOver);
        }
        if !self.seats.iter().any(|seat| seat.symbol == symbol) {
            return Err(RuleViolation::UnknownPlayer(symbol));
        }
        if self.current_player().symbol != symbol {
            return Err(RuleViolation::NotYourTurn(symbol));
        }
        Ok(())
    }

    fn response(&self, mover: Symbol, applied_move: Option<Move>) -> MoveResponse {
        let (winner, winning_line, draw) = match &self.outcome {
            GameOutcome::Won { symbol, line } => (Some(*symbol), Some(line.clone()), None),
            GameOutcome::Draw => (None, None, Some(true)),
            GameOutcome::Ongoing => (None, None, None),
        };
        MoveResponse {
            mover,
            applied_move,
            game_over: self.outcome.is_over(),
            winner,
            winning_line,
            draw,
            next_mover_symbol: if self.is_active() { Some(self.current_player().symbol) } else { None },
            move_counters: self.counters.to_map(&self.symbols()),
        }
    }

    /// Snapshot for the current mover: every other seat is an opponent.
    pub fn search_config(&self, max_depth: u32) -> Result<SearchConfig, ConfigError> {
        let mover = self.current_player().symbol;
        let opponents = self.symbols().into_iter().filter(|&s| s != mover).collect();
        SearchConfig::new(self.board.clone(), mover, opponents, self.counters, self.rules, max_depth)
    }

    /// The search to run next, if the game is live and a computer seat is to move.
    pub fn pending_search(&self, default_budget: Option<Duration>) -> Result<Option<SearchConfig>, ConfigError> {
        if !self.is_active() {
            return Ok(None);
        }
        match self.current_player().control {
            Control::Human => Ok(None),
            Control::Computer { difficulty } => {
                let budget = self.config.time_budget().or(default_budget);
                Ok(Some(self.search_config(difficulty.max_depth())?.with_time_budget(budget)))
            }
        }
    }

    /// Plays the searched move for the current seat. A seat with no move ends the game drawn.
    pub fn apply_search_outcome(&mut self, searched: &SearchOutcome) -> Result<MoveResponse, RuleViolation> {
        let symbol = self.current_player().symbol;
        match searched.best_move {
            Some(mv) => self.apply_move(symbol, mv),
            None => {
                self.check_turn(symbol)?;
                self.outcome = GameOutcome::Draw;
                info!("{} has no move; game drawn", symbol);
                Ok(self.response(symbol, None))
            }
        }
    }

    /// Searches and plays one computer turn in place. `None` when a human is to move.
    pub fn play_computer_turn(&mut self, engine: &Engine) -> Result<Option<MoveResponse>, ProtocolError> {
        match self.pending_search(None)? {
            Some(config) => {
                let searched = engine.best_move(&config);
                Ok(Some(self.apply_search_outcome(&searched)?))
            }
            None => Ok(None),
        }
    }

    pub fn state(&self) -> SessionState {
        let (winner, winning_line) = match &self.outcome {
            GameOutcome::Won { symbol, line } => (Some(*symbol), Some(line.clone())),
            _ => (None, None),
        };
        let symbols = self.symbols();
        SessionState {
            board_size: self.board.size(),
            win_length: self.board.win_length(),
            board: self.board.cells().to_vec(),
            players: self.seats.iter().map(|seat| SeatState {
                symbol: seat.symbol,
                name: seat.name.clone(),
                control: seat.control,
            }).collect(),
            current_mover: self.current_player().symbol,
            game_active: self.is_active(),
            winner,
            winning_line,
            draw: self.outcome == GameOutcome::Draw,
            move_counters: self.counters.to_map(&symbols),
            delete_cooldown: self.rules.cooldowns.delete,
            move_cooldown: self.rules.cooldowns.relocate,
            variation: self.rules.variation,
            actions: self.action_availability(),
            wins: symbols.iter().map(|&s| (s, self.wins(s))).collect(),
        }
    }
}

fn rejected(what: impl fmt::Display, symbol: Symbol, violation: RuleViolation) -> RuleViolation {
    warn!("{} rejected for {}: {}", what, symbol, violation);
    violation
}
