use std::collections::{BTreeMap, HashMap};
use std::fmt;
use serde::{Serialize, Deserialize};
use serde::ser::{Serializer, SerializeStruct};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use crate::board::{Board, Line, Symbol, MAX_PLAYERS};
use crate::error::RuleViolation;

pub const DEFAULT_DELETE_COOLDOWN: u32 = 5;
pub const DEFAULT_MOVE_COOLDOWN: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Mark,
    Delete,
    #[serde(alias = "move")]
    Relocate,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Mark, Action::Delete, Action::Relocate];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Mark => "mark",
            Action::Delete => "delete",
            Action::Relocate => "relocate",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "mark" => Some(Action::Mark),
            "delete" => Some(Action::Delete),
            "relocate" | "move" => Some(Action::Relocate),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Mark { index: usize },
    Delete { index: usize },
    Relocate { to: usize, from: usize },
}

impl Move {
    pub fn action(&self) -> Action {
        match self {
            Move::Mark { .. } => Action::Mark,
            Move::Delete { .. } => Action::Delete,
            Move::Relocate { .. } => Action::Relocate,
        }
    }

    /// The cell the move acts on.
    pub fn target(&self) -> usize {
        match *self {
            Move::Mark { index } | Move::Delete { index } => index,
            Move::Relocate { to, .. } => to,
        }
    }

    pub fn source(&self) -> Option<usize> {
        match *self {
            Move::Relocate { from, .. } => Some(from),
            _ => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Move::Relocate { to, from } => write!(f, "relocate {} -> {}", from, to),
            other => write!(f, "{} {}", other.action(), other.target()),
        }
    }
}

impl Serialize for Move {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        let source = self.source();
        let mut s = serializer.serialize_struct("Move", if source.is_some() { 3 } else { 2 })?;
        s.serialize_field("action", &self.action())?;
        s.serialize_field("index", &self.target())?;
        if let Some(from) = source {
            s.serialize_field("fromIndex", &from)?;
        } else {
            s.skip_field("fromIndex")?;
        }
        s.end()
    }
}

const MOVE_FIELDS: &[&str] = &["action", "index", "fromIndex", "sourceIndex"];

struct MoveVisitor;
impl<'de> Visitor<'de> for MoveVisitor {
    type Value = Move;
    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object for Move")
    }
    fn visit_map<V>(self, mut map: V) -> Result<Move, V::Error> where V: MapAccess<'de> {
        let mut action = None;
        let mut index = None;
        let mut from = None;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "action" => action = Some(map.next_value::<Action>()?),
                "index" => index = Some(map.next_value::<usize>()?),
                "fromIndex" | "sourceIndex" => from = map.next_value::<Option<usize>>()?,
                _ => { return Err(de::Error::unknown_field(&key, MOVE_FIELDS)); }
            }
        }
        let action = action.ok_or_else(|| de::Error::missing_field("action"))?;
        let index = index.ok_or_else(|| de::Error::missing_field("index"))?;
        match action {
            Action::Mark => Ok(Move::Mark { index }),
            Action::Delete => Ok(Move::Delete { index }),
            Action::Relocate => {
                let from = from.ok_or_else(|| de::Error::missing_field("fromIndex"))?;
                Ok(Move::Relocate { to: index, from })
            }
        }
    }
}

impl<'de> Deserialize<'de> for Move {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        deserializer.deserialize_map(MoveVisitor)
    }
}

/// Which actions beyond marking a game allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Variation {
    #[serde(rename = "mark-only")]
    MarkOnly,
    #[serde(rename = "mark+delete")]
    MarkDelete,
    #[default]
    #[serde(rename = "mark+delete+relocate")]
    Full,
}

impl Variation {
    pub fn allows(self, action: Action) -> bool {
        match action {
            Action::Mark => true,
            Action::Delete => self != Variation::MarkOnly,
            Action::Relocate => self == Variation::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cooldowns {
    #[serde(rename = "deleteCooldown")]
    pub delete: u32,
    #[serde(rename = "moveCooldown")]
    pub relocate: u32,
}

impl Default for Cooldowns {
    fn default() -> Self {
        Self { delete: DEFAULT_DELETE_COOLDOWN, relocate: DEFAULT_MOVE_COOLDOWN }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCounters {
    pub moves_since_delete: u32,
    pub moves_since_move: u32,
}

impl MoveCounters {
    /// Counters at game start: every action is immediately available.
    pub fn fresh(cooldowns: &Cooldowns) -> Self {
        Self { moves_since_delete: cooldowns.delete, moves_since_move: cooldowns.relocate }
    }

    pub fn record(&mut self, action: Action) {
        match action {
            Action::Mark => {
                self.moves_since_delete = self.moves_since_delete.saturating_add(1);
                self.moves_since_move = self.moves_since_move.saturating_add(1);
            }
            Action::Delete => {
                self.moves_since_delete = 0;
                self.moves_since_move = self.moves_since_move.saturating_add(1);
            }
            Action::Relocate => {
                self.moves_since_delete = self.moves_since_delete.saturating_add(1);
                self.moves_since_move = 0;
            }
        }
    }
}

/// Counters for every symbol, held by value so a search branch copies them for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterTable([MoveCounters; MAX_PLAYERS]);

impl CounterTable {
    pub fn fresh(cooldowns: &Cooldowns) -> Self {
        Self([MoveCounters::fresh(cooldowns); MAX_PLAYERS])
    }

    /// Symbols missing from `map` start fresh.
    pub fn from_map(map: &HashMap<Symbol, MoveCounters>, cooldowns: &Cooldowns) -> Self {
        let mut table = Self::fresh(cooldowns);
        for (symbol, counters) in map {
            table.0[symbol.index()] = *counters;
        }
        table
    }

    pub fn to_map(&self, symbols: &[Symbol]) -> BTreeMap<Symbol, MoveCounters> {
        symbols.iter().map(|&s| (s, self.get(s))).collect()
    }

    pub fn get(&self, symbol: Symbol) -> MoveCounters {
        self.0[symbol.index()]
    }

    pub fn get_mut(&mut self, symbol: Symbol) -> &mut MoveCounters {
        &mut self.0[symbol.index()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    Ongoing,
    Won { symbol: Symbol, line: Vec<usize> },
    Draw,
}

impl GameOutcome {
    pub fn is_over(&self) -> bool {
        !matches!(self, GameOutcome::Ongoing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedMove {
    pub mv: Move,
    pub symbol: Symbol,
}

/// The rule set of one game: enabled actions and their cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rules {
    pub variation: Variation,
    pub cooldowns: Cooldowns,
}

impl Rules {
    pub fn new(variation: Variation, cooldowns: Cooldowns) -> Self {
        Self { variation, cooldowns }
    }

    pub fn is_action_available(&self, action: Action, counters: &MoveCounters) -> bool {
        self.variation.allows(action) && self.moves_until_available(action, counters) == 0
    }

    /// Own moves still to play before `action` comes off cooldown; 0 when ready.
    pub fn moves_until_available(&self, action: Action, counters: &MoveCounters) -> u32 {
        match action {
            Action::Mark => 0,
            Action::Delete => self.cooldowns.delete.saturating_sub(counters.moves_since_delete),
            Action::Relocate => self.cooldowns.relocate.saturating_sub(counters.moves_since_move),
        }
    }

    fn check_available(&self, action: Action, counters: &MoveCounters) -> Result<(), RuleViolation> {
        if !self.variation.allows(action) {
            return Err(RuleViolation::ActionDisabled(action));
        }
        match self.moves_until_available(action, counters) {
            0 => Ok(()),
            remaining => Err(RuleViolation::Cooldown { action, remaining }),
        }
    }

    pub fn validate(&self, board: &Board, mv: Move, symbol: Symbol, counters: &MoveCounters) -> Result<(), RuleViolation> {
        self.check_available(mv.action(), counters)?;
        for index in std::iter::once(mv.target()).chain(mv.source()) {
            if !board.contains(index) {
                return Err(RuleViolation::OutOfBounds { index });
            }
        }
        match mv {
            Move::Mark { index } => match board.get(index) {
                None => Ok(()),
                Some(_) => Err(RuleViolation::CellOccupied { index }),
            },
            Move::Delete { index } => match board.get(index) {
                None => Err(RuleViolation::CellEmpty { index }),
                Some(owner) if owner == symbol => Err(RuleViolation::OwnMark { index }),
                Some(_) => Ok(()),
            },
            Move::Relocate { to, from } => {
                if board.get(to).is_some() {
                    return Err(RuleViolation::CellOccupied { index: to });
                }
                match board.find_adjacent(to, symbol) {
                    None => Err(RuleViolation::NotAdjacent { index: to, symbol }),
                    Some(expected) if expected != from => Err(RuleViolation::SourceMismatch { given: from, expected }),
                    Some(_) => Ok(()),
                }
            }
        }
    }

    pub fn apply_move(
            &self,
            board: &mut Board,
            mv: Move,
            symbol: Symbol,
            counters: &mut MoveCounters,
    ) -> Result<AppliedMove, RuleViolation> {
        self.validate(board, mv, symbol, counters)?;
        play(board, mv, symbol, counters);
        Ok(AppliedMove { mv, symbol })
    }
}

/// Applies a move already known to be legal.
pub(crate) fn play(board: &mut Board, mv: Move, symbol: Symbol, counters: &mut MoveCounters) {
    match mv {
        Move::Mark { index } => board.set(index, Some(symbol)),
        Move::Delete { index } => board.set(index, None),
        Move::Relocate { to, from } => {
            board.set(to, Some(symbol));
            board.set(from, None);
        }
    }
    counters.record(mv.action());
}

pub fn check_win(board: &Board, symbol: Symbol) -> Option<Line> {
    board.lines().find(|line| line.cells().all(|i| board.get(i) == Some(symbol)))
}

pub fn check_draw(board: &Board, mover: Symbol) -> bool {
    board.is_full() && check_win(board, mover).is_none()
}

/// Outcome after `mover` has played. Only the mover can have completed a line.
pub fn outcome(board: &Board, mover: Symbol) -> GameOutcome {
    if let Some(line) = check_win(board, mover) {
        GameOutcome::Won { symbol: mover, line: line.indices() }
    } else if board.is_full() {
        GameOutcome::Draw
    } else {
        GameOutcome::Ongoing
    }
}
