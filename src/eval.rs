use crate::board::{Board, Line, Symbol, MAX_PLAYERS};

/// Line-local potential of `board` for `player` against `opponents`.
///
/// A line holding only the player's marks adds `10^n`; a line holding only
/// one opponent's marks subtracts `10^n`. Empty lines and lines shared by
/// more than one symbol are dead and score nothing. Marks of symbols outside
/// `player` and `opponents` are ignored.
pub fn evaluate(board: &Board, player: Symbol, opponents: &[Symbol]) -> i64 {
    board.lines().map(|line| score_line(board, line, player, opponents)).sum()
}

fn score_line(board: &Board, line: Line, player: Symbol, opponents: &[Symbol]) -> i64 {
    let mut own = 0u32;
    let mut theirs = [0u32; MAX_PLAYERS];
    for index in line.cells() {
        match board.get(index) {
            Some(symbol) if symbol == player => own += 1,
            Some(symbol) if opponents.contains(&symbol) => theirs[symbol.index()] += 1,
            _ => {}
        }
    }
    let mut present = theirs.iter().copied().filter(|&count| count > 0);
    match (own, present.next(), present.next()) {
        (n, None, _) if n > 0 => 10i64.pow(n),
        (0, Some(count), None) => -10i64.pow(count),
        _ => 0,
    }
}
