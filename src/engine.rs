use std::time::{Duration, Instant};
use log::{debug, info};
use crate::board::{Board, Symbol};
use crate::error::ConfigError;
use crate::eval::evaluate;
use crate::movegen::generate_moves;
use crate::rules::{check_win, play, CounterTable, Move, MoveCounters, Rules};

/// Score of a won position, less the ply it was reached at.
pub const WIN_SCORE: i64 = 1000;
/// Scores above this end iterative deepening early. Heuristic leaves are
/// clamped to `-FORCED_WIN..=FORCED_WIN`, so only a found win gets past it.
pub const FORCED_WIN: i64 = 900;
const INF: i64 = i64::MAX;

/// Immutable input of one search. Each branch works on its own copies.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    board: Board,
    mover: Symbol,
    opponents: Vec<Symbol>,
    counters: CounterTable,
    rules: Rules,
    max_depth: u32,
    time_budget: Option<Duration>,
}

impl SearchConfig {
    pub fn new(
            board: Board,
            mover: Symbol,
            opponents: Vec<Symbol>,
            counters: CounterTable,
            rules: Rules,
            max_depth: u32,
    ) -> Result<Self, ConfigError> {
        if opponents.is_empty() {
            return Err(ConfigError::NoOpponents);
        }
        if opponents.contains(&mover) {
            return Err(ConfigError::MoverIsOpponent(mover));
        }
        for (i, symbol) in opponents.iter().enumerate() {
            if opponents[..i].contains(symbol) {
                return Err(ConfigError::DuplicateSymbol(*symbol));
            }
        }
        if max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(Self { board, mover, opponents, counters, rules, max_depth, time_budget: None })
    }

    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn mover(&self) -> Symbol {
        self.mover
    }

    pub fn opponents(&self) -> &[Symbol] {
        &self.opponents
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }

    pub fn root_moves(&self) -> Vec<Move> {
        generate_moves(&self.board, &self.rules, self.mover, &self.opponents, &self.counters.get(self.mover))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// `None` only when the mover has no legal move at all.
    pub best_move: Option<Move>,
    pub best_score: i64,
    /// Deepest fully completed pass.
    pub depth: u32,
    pub nodes: u64,
    pub elapsed: Duration,
    /// The time budget ran out before `max_depth` was completed.
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveClass {
    Winning,
    Blocking,
    Other,
}

/// How a root move relates to immediate threats on `board`.
pub fn classify(board: &Board, mv: Move, mover: Symbol, opponents: &[Symbol]) -> MoveClass {
    let mut after = board.clone();
    play(&mut after, mv, mover, &mut MoveCounters::default());
    if check_win(&after, mover).is_some() {
        return MoveClass::Winning;
    }
    let target = mv.target();
    if board.get(target).is_none() {
        let denies = opponents.iter().any(|&opponent| {
            let mut taken = board.clone();
            play(&mut taken, Move::Mark { index: target }, opponent, &mut MoveCounters::default());
            check_win(&taken, opponent).is_some()
        });
        if denies {
            return MoveClass::Blocking;
        }
    }
    MoveClass::Other
}

/// Winning moves first, then blocks, then the rest; stable within each class.
pub fn order_moves(board: &Board, mover: Symbol, opponents: &[Symbol], moves: Vec<Move>) -> Vec<Move> {
    let mut winning = Vec::new();
    let mut blocking = Vec::new();
    let mut other = Vec::new();
    for mv in moves {
        match classify(board, mv, mover, opponents) {
            MoveClass::Winning => winning.push(mv),
            MoveClass::Blocking => blocking.push(mv),
            MoveClass::Other => other.push(mv),
        }
    }
    winning.extend(blocking);
    winning.extend(other);
    winning
}

/// Minimax with alpha-beta pruning under an iterative-deepening driver.
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    pruning: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self { pruning: true }
    }

    /// Plain minimax with no cut-offs. Same scores, many more nodes.
    pub fn exhaustive() -> Self {
        Self { pruning: false }
    }

    /// Deepens from 1 to `max_depth`, keeping the best move of the deepest
    /// completed pass. Depth 1 always completes; deeper passes yield to the
    /// time budget and are discarded if interrupted.
    pub fn best_move(&self, config: &SearchConfig) -> SearchOutcome {
        let mut search = Search::new(config, self.pruning);
        let moves = order_moves(&config.board, config.mover, &config.opponents, config.root_moves());
        let mut outcome = SearchOutcome {
            best_move: None,
            best_score: 0,
            depth: 0,
            nodes: 0,
            elapsed: Duration::ZERO,
            timed_out: false,
        };

        if moves.is_empty() {
            info!("{} has no legal move", config.mover);
        } else {
            for depth in 1..=config.max_depth {
                if depth > 1 && search.out_of_time() {
                    outcome.timed_out = true;
                    break;
                }
                match search.root(&moves, depth) {
                    Some((mv, score)) => {
                        outcome.best_move = Some(mv);
                        outcome.best_score = score;
                        outcome.depth = depth;
                        debug!("depth {} complete: {} scores {} ({} nodes)", depth, mv, score, search.nodes);
                        if score > FORCED_WIN {
                            break;
                        }
                    }
                    None => {
                        outcome.timed_out = true;
                        break;
                    }
                }
            }
        }

        if outcome.timed_out {
            info!("search for {} stopped by time budget after depth {}", config.mover, outcome.depth);
        }
        outcome.nodes = search.nodes;
        outcome.elapsed = search.started.elapsed();
        outcome
    }

    /// One pass at a fixed depth with no time budget.
    pub fn search_depth(&self, config: &SearchConfig, depth: u32) -> SearchOutcome {
        let mut search = Search::new(config, self.pruning);
        search.deadline = None;
        let moves = order_moves(&config.board, config.mover, &config.opponents, config.root_moves());
        let best = search.root(&moves, depth);
        SearchOutcome {
            best_move: best.map(|(mv, _)| mv),
            best_score: best.map_or(0, |(_, score)| score),
            depth: if best.is_some() { depth } else { 0 },
            nodes: search.nodes,
            elapsed: search.started.elapsed(),
            timed_out: false,
        }
    }
}

struct Search<'a> {
    config: &'a SearchConfig,
    pruning: bool,
    // each opponent paired with everyone it plays against
    adversaries: Vec<(Symbol, Vec<Symbol>)>,
    started: Instant,
    deadline: Option<Instant>,
    nodes: u64,
}

impl<'a> Search<'a> {
    fn new(config: &'a SearchConfig, pruning: bool) -> Self {
        let adversaries = config.opponents.iter().map(|&opponent| {
            let mut others = vec![config.mover];
            others.extend(config.opponents.iter().copied().filter(|&o| o != opponent));
            (opponent, others)
        }).collect();
        let started = Instant::now();
        Self {
            config,
            pruning,
            adversaries,
            started,
            deadline: config.time_budget.map(|budget| started + budget),
            nodes: 0,
        }
    }

    fn out_of_time(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// Scores every root move at `limit`. `None` when the budget interrupts a pass beyond depth 1.
    fn root(&mut self, moves: &[Move], limit: u32) -> Option<(Move, i64)> {
        let mover = self.config.mover;
        let mut best: Option<(Move, i64)> = None;
        let mut alpha = -INF;
        for &mv in moves {
            if limit > 1 && self.out_of_time() {
                return None;
            }
            let mut board = self.config.board.clone();
            let mut counters = self.config.counters;
            play(&mut board, mv, mover, counters.get_mut(mover));
            let score = self.minimax(&board, &counters, 0, limit, alpha, INF, false);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((mv, score));
            }
            if self.pruning {
                alpha = alpha.max(score);
            }
        }
        best
    }

    fn minimax(
            &mut self,
            board: &Board,
            counters: &CounterTable,
            depth: u32,
            limit: u32,
            mut alpha: i64,
            mut beta: i64,
            maximizing: bool,
    ) -> i64 {
        self.nodes += 1;
        let config = self.config;
        let ply = i64::from(depth);

        if check_win(board, config.mover).is_some() {
            return WIN_SCORE - ply;
        }
        if config.opponents.iter().any(|&o| check_win(board, o).is_some()) {
            return -WIN_SCORE + ply;
        }
        if board.is_full() {
            return 0;
        }
        if depth >= limit {
            return self.leaf_score(board);
        }

        let (actor, moves) = if maximizing {
            (config.mover, generate_moves(board, &config.rules, config.mover, &config.opponents, &counters.get(config.mover)))
        } else {
            let (actor, others) = &self.adversaries[self.most_threatening(board)];
            (*actor, generate_moves(board, &config.rules, *actor, others, &counters.get(*actor)))
        };
        if moves.is_empty() {
            return self.leaf_score(board);
        }

        let mut best = if maximizing { -INF } else { INF };
        for mv in moves {
            let mut child = board.clone();
            let mut child_counters = *counters;
            play(&mut child, mv, actor, child_counters.get_mut(actor));
            let score = self.minimax(&child, &child_counters, depth + 1, limit, alpha, beta, !maximizing);
            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            if self.pruning && beta <= alpha {
                break;
            }
        }
        best
    }

    /// Heuristic value of a non-terminal leaf, kept below any win or loss score.
    fn leaf_score(&self, board: &Board) -> i64 {
        evaluate(board, self.config.mover, &self.config.opponents).clamp(-FORCED_WIN, FORCED_WIN)
    }

    /// The opponent whose own view of the board scores highest acts for the
    /// minimizing layer. Ties go to the earliest listed opponent.
    fn most_threatening(&self, board: &Board) -> usize {
        if self.adversaries.len() == 1 {
            return 0;
        }
        let mut choice = 0;
        let mut top = -INF;
        for (i, (opponent, others)) in self.adversaries.iter().enumerate() {
            let score = evaluate(board, *opponent, others);
            if score > top {
                top = score;
                choice = i;
            }
        }
        choice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Cooldowns, Variation};

    fn config(rows: &[&str], mover: Symbol, opponents: &[Symbol], rules: Rules, depth: u32) -> SearchConfig {
        let board = Board::from_rows(4, rows).unwrap();
        let counters = CounterTable::fresh(&rules.cooldowns);
        SearchConfig::new(board, mover, opponents.to_vec(), counters, rules, depth).unwrap()
    }

    fn mark_only() -> Rules {
        Rules::new(Variation::MarkOnly, Cooldowns::default())
    }

    #[test]
    fn test_rejects_bad_configs() {
        let board = Board::new(6, 4).unwrap();
        let counters = CounterTable::fresh(&Cooldowns::default());
        let rules = Rules::default();
        assert_eq!(
            SearchConfig::new(board.clone(), Symbol::X, vec![], counters, rules, 2).unwrap_err(),
            ConfigError::NoOpponents
        );
        assert_eq!(
            SearchConfig::new(board.clone(), Symbol::X, vec![Symbol::X], counters, rules, 2).unwrap_err(),
            ConfigError::MoverIsOpponent(Symbol::X)
        );
        assert_eq!(
            SearchConfig::new(board.clone(), Symbol::X, vec![Symbol::O, Symbol::O], counters, rules, 2).unwrap_err(),
            ConfigError::DuplicateSymbol(Symbol::O)
        );
        assert_eq!(
            SearchConfig::new(board, Symbol::X, vec![Symbol::O], counters, rules, 0).unwrap_err(),
            ConfigError::ZeroDepth
        );
    }

    #[test]
    fn test_takes_immediate_win() {
        let cfg = config(&[
            "XXX...",
            "OO....",
            "O.....",
            "......",
            "......",
            "......",
        ], Symbol::X, &[Symbol::O], mark_only(), 2);
        let outcome = Engine::new().best_move(&cfg);
        assert_eq!(outcome.best_move, Some(Move::Mark { index: 3 }));
        assert_eq!(outcome.best_score, WIN_SCORE);
        assert_eq!(outcome.depth, 1);
    }

    #[test]
    fn test_classifies_root_moves() {
        let board = Board::from_rows(4, &[
            "XXX...",
            "......",
            "OOO...",
            "......",
            "......",
            "......",
        ]).unwrap();
        let opponents = [Symbol::O];
        assert_eq!(classify(&board, Move::Mark { index: 3 }, Symbol::X, &opponents), MoveClass::Winning);
        assert_eq!(classify(&board, Move::Mark { index: 15 }, Symbol::X, &opponents), MoveClass::Blocking);
        assert_eq!(classify(&board, Move::Mark { index: 35 }, Symbol::X, &opponents), MoveClass::Other);
    }

    #[test]
    fn test_order_puts_wins_then_blocks_first() {
        let board = Board::from_rows(4, &[
            "XXX...",
            "......",
            "OOO...",
            "......",
            "......",
            "......",
        ]).unwrap();
        let rules = mark_only();
        let counters = MoveCounters::fresh(&rules.cooldowns);
        let moves = generate_moves(&board, &rules, Symbol::X, &[Symbol::O], &counters);
        let ordered = order_moves(&board, Symbol::X, &[Symbol::O], moves.clone());
        assert_eq!(ordered.len(), moves.len());
        assert_eq!(ordered[0], Move::Mark { index: 3 });
        assert_eq!(ordered[1], Move::Mark { index: 15 });
    }

    #[test]
    fn test_no_move_on_full_board() {
        let board = Board::from_rows(3, &["XOX", "XOO", "OXX"]).unwrap();
        let rules = mark_only();
        let cfg = SearchConfig::new(board, Symbol::X, vec![Symbol::O], CounterTable::fresh(&rules.cooldowns), rules, 3).unwrap();
        let outcome = Engine::new().best_move(&cfg);
        assert_eq!(outcome.best_move, None);
        assert_eq!(outcome.best_score, 0);
        assert_eq!(outcome.depth, 0);
    }

    #[test]
    fn test_zero_budget_still_completes_depth_one() {
        let cfg = config(&[
            "X.....",
            "......",
            "..O...",
            "......",
            "......",
            "......",
        ], Symbol::X, &[Symbol::O], Rules::default(), 6).with_time_budget(Some(Duration::ZERO));
        let outcome = Engine::new().best_move(&cfg);
        assert!(outcome.best_move.is_some());
        assert_eq!(outcome.depth, 1);
        assert!(outcome.timed_out);
    }

    #[test]
    fn test_pruning_visits_fewer_nodes_with_same_score() {
        let cfg = config(&[
            "X...",
            ".O..",
            "..X.",
            "....",
        ], Symbol::O, &[Symbol::X], mark_only(), 2);
        let pruned = Engine::new().search_depth(&cfg, 2);
        let full = Engine::exhaustive().search_depth(&cfg, 2);
        assert_eq!(pruned.best_score, full.best_score);
        assert_eq!(pruned.best_move, full.best_move);
        assert!(pruned.nodes < full.nodes);
    }

    #[test]
    fn test_win_outranks_strong_heuristic() {
        // X's open triples make the heuristic worth thousands; marking 3 wins outright
        for depth in 1..=2 {
            let cfg = config(&[
                "XXX.O.",
                "......",
                "..XX..",
                "..XX..",
                "......",
                "O....O",
            ], Symbol::X, &[Symbol::O], mark_only(), depth);
            let outcome = Engine::new().best_move(&cfg);
            assert_eq!(outcome.best_move, Some(Move::Mark { index: 3 }));
            assert_eq!(outcome.best_score, WIN_SCORE);
        }
    }

    #[test]
    fn test_opponent_win_outranks_heuristic_on_dense_board() {
        // O wins at 7, 15 or 16 next move; no heuristic leaf may look worse than that loss
        for depth in 1..=2 {
            let cfg = config(&[
                "X.....",
                "....O.",
                "OOO...",
                "...OO.",
                "...OO.",
                "X....X",
            ], Symbol::X, &[Symbol::O], mark_only(), depth);
            let outcome = Engine::new().best_move(&cfg);
            assert_eq!(outcome.best_score, -WIN_SCORE + 1);
            let mv = outcome.best_move.unwrap();
            assert_eq!(classify(cfg.board(), mv, Symbol::X, &[Symbol::O]), MoveClass::Blocking);
        }
    }

    #[test]
    fn test_leaf_scores_stay_inside_forced_win() {
        let cfg = config(&[
            "XXX.O.",
            "......",
            "..XX..",
            "..XX..",
            "......",
            "O....O",
        ], Symbol::X, &[Symbol::O], mark_only(), 1);
        let search = Search::new(&cfg, true);
        assert!(evaluate(cfg.board(), Symbol::X, &[Symbol::O]) > WIN_SCORE);
        assert_eq!(search.leaf_score(cfg.board()), FORCED_WIN);
    }

    #[test]
    fn test_most_threatening_opponent_acts() {
        // D has three in a column, O has a single mark; D should be modelled as the minimizer
        let cfg = config(&[
            "D....",
            "D....",
            "D...O",
            ".....",
            "X....",
        ], Symbol::X, &[Symbol::O, Symbol::D], mark_only(), 1);
        let search = Search::new(&cfg, true);
        let (actor, others) = &search.adversaries[search.most_threatening(cfg.board())];
        assert_eq!(*actor, Symbol::D);
        assert_eq!(others, &vec![Symbol::X, Symbol::O]);
    }
}
