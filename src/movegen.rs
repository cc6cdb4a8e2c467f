use crate::board::{Board, Symbol};
use crate::rules::{Action, Move, MoveCounters, Rules};

/// Legal moves for `mover`: marks in board order, then deletes, then relocations.
///
/// Deletes target any cell held by one of `opponents`. Each relocation takes
/// its source from the first adjacent own mark in scan order.
pub fn generate_moves(
        board: &Board,
        rules: &Rules,
        mover: Symbol,
        opponents: &[Symbol],
        counters: &MoveCounters,
) -> Vec<Move> {
    let mut moves: Vec<Move> = board.empty_cells().map(|index| Move::Mark { index }).collect();

    if rules.is_action_available(Action::Delete, counters) {
        moves.extend(board.cells().iter().enumerate().filter_map(|(index, cell)| match cell {
            Some(owner) if opponents.contains(owner) => Some(Move::Delete { index }),
            _ => None,
        }));
    }

    if rules.is_action_available(Action::Relocate, counters) {
        moves.extend(board.empty_cells().filter_map(|to| {
            board.find_adjacent(to, mover).map(|from| Move::Relocate { to, from })
        }));
    }

    moves
}
