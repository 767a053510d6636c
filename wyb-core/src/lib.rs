//! Watch Your Back board state machine.
//!
//! # Coordinates
//!
//! ```text
//! Squares are (column, row), both 0-7. Row 0 is the top edge.
//!
//!     0 1 2 3 4 5 6 7   <- column
//!   0 X - - - - - - X
//!   1 - - - - - - - -
//!   ...
//!   7 X - - - - - - X
//!   ^ row
//! ```
//!
//! # Phases
//!
//! ```text
//! Placing  -> Moving   at turn 24 of placing (turn counter resets to 0)
//! Moving   -> Shrink1  at turn 128           (no reset)
//! Shrink1  -> Shrink2  at turn 192           (no reset)
//!
//! Shrink1 drops the outer ring, Shrink2 the next one. Corners move inward
//! with the ring: (r, r), (r, 7-r), (7-r, 7-r), (7-r, r) for ring r.
//! ```
//!
//! # Piece arena
//!
//! Pieces live in a fixed arena of 24 slots. A square stores a [`PieceId`]
//! tagged with the slot generation; freeing a slot bumps its generation so an
//! old handle never resolves to whichever piece reuses the slot later.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width and height of the unshrunk board.
pub const BOARD_SIZE: i8 = 8;
/// Arena capacity (12 placements per team).
pub const MAX_PIECES: usize = 24;
/// Placing turns before the moving phase starts.
pub const PLACING_TURNS: u32 = 24;
/// Moving-stage turn at which the first shrink happens.
pub const FIRST_SHRINK_TURN: u32 = 128;
/// Moving-stage turn at which the second shrink happens.
pub const SECOND_SHRINK_TURN: u32 = 192;

/// The four cardinal directions as (column, row) offsets.
pub const DIRECTIONS: [(i8, i8); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Team identifier. White moves first.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Team {
    White,
    Black,
}

impl Team {
    /// Get the opposing team.
    #[inline]
    pub fn opponent(self) -> Team {
        match self {
            Team::White => Team::Black,
            Team::Black => Team::White,
        }
    }

    /// Rows this team may place into during the placing phase.
    ///
    /// The zones overlap on rows 2-5.
    #[inline]
    pub fn placing_rows(self) -> RangeInclusive<i8> {
        match self {
            Team::White => 0..=5,
            Team::Black => 2..=7,
        }
    }

    /// Board symbol, as printed by the match referee.
    #[inline]
    pub fn symbol(self) -> char {
        match self {
            Team::White => 'O',
            Team::Black => '@',
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::White => write!(f, "white"),
            Team::Black => write!(f, "black"),
        }
    }
}

/// A square as (column, row).
///
/// Coordinates are signed so neighbour arithmetic may step off the board;
/// whether a square is usable is decided by [`Phase::in_bounds`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(from = "(i8, i8)", into = "(i8, i8)")]
pub struct Pos {
    pub col: i8,
    pub row: i8,
}

impl Pos {
    #[inline]
    pub const fn new(col: i8, row: i8) -> Pos {
        Pos { col, row }
    }

    /// The square `dc` columns and `dr` rows away.
    #[inline]
    pub fn offset(self, dc: i8, dr: i8) -> Pos {
        Pos::new(self.col.saturating_add(dc), self.row.saturating_add(dr))
    }

    /// Whether this square lies on the unshrunk 8x8 grid.
    #[inline]
    pub fn on_grid(self) -> bool {
        (0..BOARD_SIZE).contains(&self.col) && (0..BOARD_SIZE).contains(&self.row)
    }

    /// Manhattan distance between two squares.
    #[inline]
    pub fn manhattan(self, other: Pos) -> u32 {
        self.col.abs_diff(other.col) as u32 + self.row.abs_diff(other.row) as u32
    }

    /// Manhattan distance to the nearest of the middle four squares.
    #[inline]
    pub fn distance_to_centre(self) -> u32 {
        let axis = |v: i8| v.abs_diff(3).min(v.abs_diff(4)) as u32;
        axis(self.col) + axis(self.row)
    }

    /// The square reflected through the board centre.
    #[inline]
    pub fn mirrored(self) -> Pos {
        Pos::new(BOARD_SIZE - 1 - self.col, BOARD_SIZE - 1 - self.row)
    }

    /// Iterate over all 64 squares, column by column.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..BOARD_SIZE).flat_map(|col| (0..BOARD_SIZE).map(move |row| Pos::new(col, row)))
    }
}

impl From<(i8, i8)> for Pos {
    fn from((col, row): (i8, i8)) -> Pos {
        Pos::new(col, row)
    }
}

impl From<Pos> for (i8, i8) {
    fn from(pos: Pos) -> (i8, i8) {
        (pos.col, pos.row)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Game phase. Only ever moves forward.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Placing,
    Moving,
    Shrink1,
    Shrink2,
}

impl Phase {
    /// The phase that follows this one, if any.
    #[inline]
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Placing => Some(Phase::Moving),
            Phase::Moving => Some(Phase::Shrink1),
            Phase::Shrink1 => Some(Phase::Shrink2),
            Phase::Shrink2 => None,
        }
    }

    /// Position in the phase order (0-3).
    #[inline]
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Number of outer rings removed so far.
    #[inline]
    pub fn ring(self) -> i8 {
        match self {
            Phase::Placing | Phase::Moving => 0,
            Phase::Shrink1 => 1,
            Phase::Shrink2 => 2,
        }
    }

    /// Turn count at which this phase hands over to the next one.
    #[inline]
    pub fn advances_at(self) -> Option<u32> {
        match self {
            Phase::Placing => Some(PLACING_TURNS),
            Phase::Moving => Some(FIRST_SHRINK_TURN),
            Phase::Shrink1 => Some(SECOND_SHRINK_TURN),
            Phase::Shrink2 => None,
        }
    }

    /// Corner squares in the order top-left, bottom-left, bottom-right, top-right.
    #[inline]
    pub fn corners(self) -> [Pos; 4] {
        let lo = self.ring();
        let hi = BOARD_SIZE - 1 - lo;
        [Pos::new(lo, lo), Pos::new(lo, hi), Pos::new(hi, hi), Pos::new(hi, lo)]
    }

    #[inline]
    pub fn is_corner(self, pos: Pos) -> bool {
        self.corners().contains(&pos)
    }

    /// Whether `pos` is inside the playable area of this phase.
    #[inline]
    pub fn in_bounds(self, pos: Pos) -> bool {
        let usable = self.ring()..BOARD_SIZE - self.ring();
        usable.contains(&pos.col) && usable.contains(&pos.row)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Placing => "placing",
            Phase::Moving => "moving",
            Phase::Shrink1 => "first shrink",
            Phase::Shrink2 => "second shrink",
        };
        f.write_str(name)
    }
}

/// Wire form of a non-pass action: `[c, r]` or `[[a, b], [c, d]]`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireAction {
    Place(Pos),
    Move(Pos, Pos),
}

/// An action taken on one turn.
///
/// Serialises as `[c, r]` for a placement, `[[a, b], [c, d]]` for a move and
/// `null` for a pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(from = "Option<WireAction>", into = "Option<WireAction>")]
pub enum Action {
    /// Add a new piece (placing phase only).
    Place(Pos),
    /// Step or jump a piece (after the placing phase).
    Move(Pos, Pos),
    /// Forfeit the turn. The turn counter still advances.
    Pass,
}

impl Action {
    /// The square a piece enters, if any.
    #[inline]
    pub fn destination(&self) -> Option<Pos> {
        match *self {
            Action::Place(to) | Action::Move(_, to) => Some(to),
            Action::Pass => None,
        }
    }
}

impl From<Option<WireAction>> for Action {
    fn from(wire: Option<WireAction>) -> Action {
        match wire {
            None => Action::Pass,
            Some(WireAction::Place(pos)) => Action::Place(pos),
            Some(WireAction::Move(from, to)) => Action::Move(from, to),
        }
    }
}

impl From<Action> for Option<WireAction> {
    fn from(action: Action) -> Option<WireAction> {
        match action {
            Action::Place(pos) => Some(WireAction::Place(pos)),
            Action::Move(from, to) => Some(WireAction::Move(from, to)),
            Action::Pass => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Place(pos) => write!(f, "place {}", pos),
            Action::Move(from, to) => write!(f, "{} -> {}", from, to),
            Action::Pass => write!(f, "pass"),
        }
    }
}

/// An action that breaks placement, movement or phase rules.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum RuleViolation {
    #[error("{action} is not allowed in the {phase} phase")]
    WrongPhase { action: Action, phase: Phase },
    #[error("square {0} is outside the board")]
    OutOfBounds(Pos),
    #[error("square {0} is a corner")]
    OnCorner(Pos),
    #[error("square {0} is already occupied")]
    Occupied(Pos),
    #[error("{team} cannot place at {pos}: outside its starting zone")]
    OutsideZone { pos: Pos, team: Team },
    #[error("{team} has no piece at {pos} to move")]
    NoPieceToMove { pos: Pos, team: Team },
    #[error("{to} is neither a step nor a jump away from {from}")]
    Unreachable { from: Pos, to: Pos },
    #[error("no free piece slot")]
    ArenaFull,
    #[error("two pieces given for square {0}")]
    DuplicatePiece(Pos),
}

/// Final result of a game.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Outcome {
    Winner(Team),
    Draw,
}

/// Stable handle to a piece: arena slot plus the generation it was issued in.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct PieceId {
    slot: u8,
    generation: u16,
}

impl PieceId {
    #[inline]
    pub fn slot(self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub fn generation(self) -> u16 {
        self.generation
    }
}

/// A live piece.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Piece {
    pub pos: Pos,
    pub team: Team,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Slot {
    generation: u16,
    piece: Option<Piece>,
}

impl Slot {
    const EMPTY: Slot = Slot { generation: 0, piece: None };
}

/// One board change recorded during `apply`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Edit {
    Placed { pos: Pos, id: PieceId },
    Moved { from: Pos, to: Pos },
    Removed { pos: Pos, id: PieceId, team: Team },
}

/// Undo information for backtracking during search.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Undo {
    action: Action,
    edits: Vec<Edit>,
    phase: Phase,
    turn_count: u32,
}

impl Undo {
    /// The action that was applied.
    #[inline]
    pub fn action(&self) -> Action {
        self.action
    }

    /// Pieces removed by the action, by capture or by shrinking.
    pub fn removed(&self) -> impl Iterator<Item = (Pos, Team)> + '_ {
        self.edits.iter().filter_map(|edit| match *edit {
            Edit::Removed { pos, team, .. } => Some((pos, team)),
            _ => None,
        })
    }

    /// Whether the action triggered a phase change.
    #[inline]
    pub fn advanced_phase(&self, board_after: &Board) -> bool {
        board_after.phase != self.phase
    }
}

/// Authoritative board state.
///
/// `grid` is indexed `[column][row]`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Board {
    grid: [[Option<PieceId>; BOARD_SIZE as usize]; BOARD_SIZE as usize],
    slots: [Slot; MAX_PIECES],
    phase: Phase,
    turn_count: u32,
}

/// Inward neighbours of each corner, matching the order of [`Phase::corners`].
const CORNER_NEIGHBOURS: [[(i8, i8); 2]; 4] = [
    [(1, 0), (0, 1)],   // top-left
    [(1, 0), (0, -1)],  // bottom-left
    [(-1, 0), (0, -1)], // bottom-right
    [(-1, 0), (0, 1)],  // top-right
];

impl Board {
    /// Create an empty board at the start of the placing phase.
    pub fn new() -> Board {
        Board {
            grid: [[None; BOARD_SIZE as usize]; BOARD_SIZE as usize],
            slots: [Slot::EMPTY; MAX_PIECES],
            phase: Phase::Placing,
            turn_count: 0,
        }
    }

    /// Build a position from a list of pieces, without resolving captures.
    ///
    /// The turn counter starts at 0 for the given phase.
    pub fn from_layout(phase: Phase, pieces: &[(Pos, Team)]) -> Result<Board, RuleViolation> {
        let mut board = Board { phase, ..Board::new() };
        let mut journal = Vec::new();
        for &(pos, team) in pieces {
            if !board.in_bounds(pos) {
                return Err(RuleViolation::OutOfBounds(pos));
            }
            if board.is_corner(pos) {
                return Err(RuleViolation::OnCorner(pos));
            }
            if board.piece_id_at(pos).is_some() {
                return Err(RuleViolation::DuplicatePiece(pos));
            }
            board.insert(pos, team, &mut journal)?;
        }
        Ok(board)
    }

    // ========== Queries ==========

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Turns since the start of the current stage (placing, or moving onwards).
    #[inline]
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    #[inline]
    pub fn corners(&self) -> [Pos; 4] {
        self.phase.corners()
    }

    #[inline]
    pub fn is_corner(&self, pos: Pos) -> bool {
        self.phase.is_corner(pos)
    }

    #[inline]
    pub fn in_bounds(&self, pos: Pos) -> bool {
        self.phase.in_bounds(pos)
    }

    /// Handle of the piece at `pos`, or None if empty or out of bounds.
    #[inline]
    pub fn piece_id_at(&self, pos: Pos) -> Option<PieceId> {
        if self.in_bounds(pos) {
            self.grid[pos.col as usize][pos.row as usize]
        } else {
            None
        }
    }

    /// Resolve a handle. Returns None once the piece has been removed.
    #[inline]
    pub fn piece(&self, id: PieceId) -> Option<Piece> {
        let slot = self.slots.get(id.slot())?;
        if slot.generation == id.generation {
            slot.piece
        } else {
            None
        }
    }

    /// Team of the piece at `pos`, or None if empty or out of bounds.
    #[inline]
    pub fn piece_at(&self, pos: Pos) -> Option<Team> {
        self.piece_id_at(pos)
            .and_then(|id| self.piece(id))
            .map(|piece| piece.team)
    }

    #[inline]
    pub fn has_team_at(&self, pos: Pos, team: Team) -> bool {
        self.piece_at(pos) == Some(team)
    }

    /// Whether a piece could enter `pos`: in bounds, empty and not a corner.
    #[inline]
    pub fn is_free(&self, pos: Pos) -> bool {
        self.in_bounds(pos) && self.piece_id_at(pos).is_none() && !self.is_corner(pos)
    }

    /// Whether `team` could place at `pos` if it were the placing phase.
    #[inline]
    pub fn can_place(&self, pos: Pos, team: Team) -> bool {
        self.is_free(pos) && team.placing_rows().contains(&pos.row)
    }

    /// Whether `pos` counts as hostile to a piece of `team` (enemy or corner).
    #[inline]
    fn hostile_to(&self, pos: Pos, team: Team) -> bool {
        self.has_team_at(pos, team.opponent()) || self.is_corner(pos)
    }

    /// Iterate over live pieces in slot order.
    pub fn pieces(&self) -> impl Iterator<Item = Piece> + '_ {
        self.slots.iter().filter_map(|slot| slot.piece)
    }

    pub fn piece_count(&self, team: Team) -> usize {
        self.pieces().filter(|piece| piece.team == team).count()
    }

    /// Manhattan distance from `pos` to the nearest piece of `team`.
    pub fn distance_to_nearest(&self, pos: Pos, team: Team) -> Option<u32> {
        self.pieces()
            .filter(|piece| piece.team == team)
            .map(|piece| pos.manhattan(piece.pos))
            .min()
    }

    /// Square of the piece of `team` nearest to `pos`. Ties go to the lowest slot.
    pub fn nearest_piece(&self, pos: Pos, team: Team) -> Option<Pos> {
        self.pieces()
            .filter(|piece| piece.team == team)
            .min_by_key(|piece| pos.manhattan(piece.pos))
            .map(|piece| piece.pos)
    }

    /// Game result once the placing phase is over.
    ///
    /// A team with fewer than two pieces loses; both at once is a draw.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.phase == Phase::Placing {
            return None;
        }
        let white_out = self.piece_count(Team::White) < 2;
        let black_out = self.piece_count(Team::Black) < 2;
        match (white_out, black_out) {
            (true, true) => Some(Outcome::Draw),
            (true, false) => Some(Outcome::Winner(Team::Black)),
            (false, true) => Some(Outcome::Winner(Team::White)),
            (false, false) => None,
        }
    }

    // ========== Piece Operations ==========

    /// Put a new piece in the lowest free slot. Does NOT validate the square.
    fn insert(&mut self, pos: Pos, team: Team, journal: &mut Vec<Edit>) -> Result<(), RuleViolation> {
        let slot_idx = self
            .slots
            .iter()
            .position(|slot| slot.piece.is_none())
            .ok_or(RuleViolation::ArenaFull)?;
        let slot = &mut self.slots[slot_idx];
        let id = PieceId { slot: slot_idx as u8, generation: slot.generation };
        slot.piece = Some(Piece { pos, team });
        self.grid[pos.col as usize][pos.row as usize] = Some(id);
        journal.push(Edit::Placed { pos, id });
        Ok(())
    }

    /// Move the piece at `from` to `to`. Does NOT validate the move.
    fn relocate(&mut self, from: Pos, to: Pos, journal: &mut Vec<Edit>) {
        let Some(id) = self.grid[from.col as usize][from.row as usize].take() else {
            return;
        };
        self.grid[to.col as usize][to.row as usize] = Some(id);
        if let Some(piece) = self.slots[id.slot()].piece.as_mut() {
            piece.pos = to;
        }
        journal.push(Edit::Moved { from, to });
    }

    /// Take the piece at `pos` off the board, freeing its slot.
    fn remove(&mut self, pos: Pos, journal: &mut Vec<Edit>) -> Option<Team> {
        let id = self.grid[pos.col as usize][pos.row as usize].take()?;
        let slot = &mut self.slots[id.slot()];
        let piece = slot.piece.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        journal.push(Edit::Removed { pos, id, team: piece.team });
        Some(piece.team)
    }

    // ========== Elimination ==========

    /// Resolve custodian captures around `pos` and return the squares emptied.
    ///
    /// With `aggressive`, the piece at `pos` is treated as having just arrived
    /// and first captures flanked enemy neighbours. In both modes it is then
    /// removed itself if flanked vertically or horizontally.
    pub fn resolve_captures(&mut self, pos: Pos, aggressive: bool) -> Vec<Pos> {
        let mut journal = Vec::new();
        self.resolve_into(pos, aggressive, &mut journal);
        journal
            .into_iter()
            .filter_map(|edit| match edit {
                Edit::Removed { pos, .. } => Some(pos),
                _ => None,
            })
            .collect()
    }

    fn resolve_into(&mut self, pos: Pos, aggressive: bool, journal: &mut Vec<Edit>) {
        let Some(team) = self.piece_at(pos) else {
            return;
        };
        let enemy = team.opponent();

        if aggressive {
            for (dc, dr) in DIRECTIONS {
                let adjacent = pos.offset(dc, dr);
                if !self.has_team_at(adjacent, enemy) {
                    continue;
                }
                let beyond = adjacent.offset(dc, dr);
                if self.has_team_at(beyond, team) || self.is_corner(beyond) {
                    self.remove(adjacent, journal);
                }
            }
        }

        let vertical = self.hostile_to(pos.offset(0, -1), team) && self.hostile_to(pos.offset(0, 1), team);
        let horizontal = self.hostile_to(pos.offset(-1, 0), team) && self.hostile_to(pos.offset(1, 0), team);
        if vertical || horizontal {
            self.remove(pos, journal);
        }
    }

    // ========== Action Generation ==========

    /// Generate all legal actions for `team`.
    ///
    /// An empty list means the team has to pass.
    pub fn legal_actions(&self, team: Team) -> Vec<Action> {
        let mut actions = Vec::with_capacity(48);

        if self.phase == Phase::Placing {
            for pos in Pos::all() {
                if self.can_place(pos, team) {
                    actions.push(Action::Place(pos));
                }
            }
            return actions;
        }

        for piece in self.pieces().filter(|piece| piece.team == team) {
            self.push_piece_moves(piece.pos, &mut actions);
        }
        actions
    }

    /// Number of legal actions for `team`.
    #[inline]
    pub fn legal_action_count(&self, team: Team) -> usize {
        self.legal_actions(team).len()
    }

    fn push_piece_moves(&self, from: Pos, actions: &mut Vec<Action>) {
        for (dc, dr) in DIRECTIONS {
            let adjacent = from.offset(dc, dr);
            if !self.in_bounds(adjacent) {
                continue;
            }
            if self.piece_id_at(adjacent).is_some() {
                // Occupied: try to jump over it
                let beyond = adjacent.offset(dc, dr);
                if self.is_free(beyond) {
                    actions.push(Action::Move(from, beyond));
                }
            } else if !self.is_corner(adjacent) {
                actions.push(Action::Move(from, adjacent));
            }
        }
    }

    // ========== Apply & Undo ==========

    /// Check that `team` may take `action` on this board.
    pub fn validate(&self, action: Action, team: Team) -> Result<(), RuleViolation> {
        match action {
            Action::Place(pos) => {
                if self.phase != Phase::Placing {
                    return Err(RuleViolation::WrongPhase { action, phase: self.phase });
                }
                if !self.in_bounds(pos) {
                    return Err(RuleViolation::OutOfBounds(pos));
                }
                if self.is_corner(pos) {
                    return Err(RuleViolation::OnCorner(pos));
                }
                if self.piece_id_at(pos).is_some() {
                    return Err(RuleViolation::Occupied(pos));
                }
                if !team.placing_rows().contains(&pos.row) {
                    return Err(RuleViolation::OutsideZone { pos, team });
                }
                Ok(())
            }
            Action::Move(from, to) => {
                if self.phase == Phase::Placing {
                    return Err(RuleViolation::WrongPhase { action, phase: self.phase });
                }
                for pos in [from, to] {
                    if !self.in_bounds(pos) {
                        return Err(RuleViolation::OutOfBounds(pos));
                    }
                }
                if !self.has_team_at(from, team) {
                    return Err(RuleViolation::NoPieceToMove { pos: from, team });
                }
                if self.is_corner(to) {
                    return Err(RuleViolation::OnCorner(to));
                }
                if self.piece_id_at(to).is_some() {
                    return Err(RuleViolation::Occupied(to));
                }
                let (dc, dr) = (to.col - from.col, to.row - from.row);
                match (dc.abs(), dr.abs()) {
                    (1, 0) | (0, 1) => Ok(()),
                    (2, 0) | (0, 2) if self.piece_id_at(from.offset(dc / 2, dr / 2)).is_some() => Ok(()),
                    _ => Err(RuleViolation::Unreachable { from, to }),
                }
            }
            Action::Pass => Ok(()),
        }
    }

    /// Apply an action for `team`, returning undo information.
    ///
    /// Resolves captures around the entered square, bumps the turn counter
    /// and advances the phase when its turn threshold is reached. On error the
    /// board is left untouched.
    pub fn apply(&mut self, action: Action, team: Team) -> Result<Undo, RuleViolation> {
        self.validate(action, team)?;

        let mut edits = Vec::with_capacity(4);
        let (phase, turn_count) = (self.phase, self.turn_count);

        match action {
            Action::Place(pos) => {
                self.insert(pos, team, &mut edits)?;
                self.resolve_into(pos, true, &mut edits);
            }
            Action::Move(from, to) => {
                self.relocate(from, to, &mut edits);
                self.resolve_into(to, true, &mut edits);
            }
            Action::Pass => {}
        }

        self.turn_count += 1;
        if self.phase.advances_at() == Some(self.turn_count) {
            self.advance_phase(&mut edits);
        }

        Ok(Undo { action, edits, phase, turn_count })
    }

    /// Undo an action, restoring the board to its previous state.
    ///
    /// This is the inverse of `apply()`. Undos must be replayed in reverse order.
    pub fn undo(&mut self, undo: Undo) {
        for edit in undo.edits.iter().rev() {
            match *edit {
                Edit::Placed { pos, id } => {
                    self.grid[pos.col as usize][pos.row as usize] = None;
                    self.slots[id.slot()].piece = None;
                }
                Edit::Moved { from, to } => {
                    let id = self.grid[to.col as usize][to.row as usize].take();
                    self.grid[from.col as usize][from.row as usize] = id;
                    if let Some(piece) = id.and_then(|id| self.slots[id.slot()].piece.as_mut()) {
                        piece.pos = from;
                    }
                }
                Edit::Removed { pos, id, team } => {
                    let slot = &mut self.slots[id.slot()];
                    slot.generation = id.generation;
                    slot.piece = Some(Piece { pos, team });
                    self.grid[pos.col as usize][pos.row as usize] = Some(id);
                }
            }
        }
        self.phase = undo.phase;
        self.turn_count = undo.turn_count;
    }

    /// Step into the next phase and shrink the board.
    fn advance_phase(&mut self, journal: &mut Vec<Edit>) {
        let Some(next) = self.phase.next() else {
            return;
        };
        if self.phase == Phase::Placing {
            self.turn_count = 0;
        }
        self.phase = next;

        let doomed: Vec<Pos> = self
            .pieces()
            .map(|piece| piece.pos)
            .filter(|&pos| !next.in_bounds(pos) || next.is_corner(pos))
            .collect();
        for pos in doomed {
            self.remove(pos, journal);
        }

        // Corners close in one at a time; an already emptied square is a no-op
        for (corner, neighbours) in next.corners().into_iter().zip(CORNER_NEIGHBOURS) {
            for (dc, dr) in neighbours {
                self.resolve_into(corner.offset(dc, dr), false, journal);
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} phase, turn {} ===", self.phase, self.turn_count)?;
        writeln!(f, "  0 1 2 3 4 5 6 7")?;
        for row in 0..BOARD_SIZE {
            write!(f, "{}", row)?;
            for col in 0..BOARD_SIZE {
                let pos = Pos::new(col, row);
                let symbol = match self.piece_at(pos) {
                    Some(team) => team.symbol(),
                    None if self.is_corner(pos) => 'X',
                    None if self.in_bounds(pos) => '-',
                    None => ' ',
                };
                write!(f, " {}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
