//! Board evaluation strategies.
//!
//! An evaluator scores a state from one team's point of view: higher is
//! better for that team. The search only ever sees the [`Evaluator`] trait, so
//! strategies can be swapped per agent.

use serde::{Deserialize, Serialize};
use wyb_core::{Board, Phase, Pos, Team, DIRECTIONS};

/// Static evaluation of a game state.
pub trait Evaluator<S: ?Sized> {
    fn value(&self, state: &S, team: Team) -> i32;
}

impl<S: ?Sized, E: Evaluator<S> + ?Sized> Evaluator<S> for Box<E> {
    fn value(&self, state: &S, team: Team) -> i32 {
        (**self).value(state, team)
    }
}

impl<S: ?Sized, E: Evaluator<S> + ?Sized> Evaluator<S> for &E {
    fn value(&self, state: &S, team: Team) -> i32 {
        (**self).value(state, team)
    }
}

// ========== Centre control ==========

/// Rewards pieces close to the middle of the board.
///
/// Each piece is worth `piece_value - distance_to_centre`. With
/// `placing_threats` on, placing-phase positions are adjusted for pieces the
/// other side could capture with a single placement: an own threatened piece
/// counts for nothing, a threatened enemy piece loses a `1 / threat_divisor`
/// share of its worth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentreEvaluator {
    pub piece_value: i32,
    pub placing_threats: bool,
    pub threat_divisor: i32,
}

impl CentreEvaluator {
    /// Centre control with placing-phase threat detection.
    pub const fn threat() -> Self {
        Self {
            piece_value: 30,
            placing_threats: true,
            threat_divisor: 3,
        }
    }

    /// Plain centre control.
    pub const fn centre() -> Self {
        Self {
            piece_value: 20,
            placing_threats: false,
            threat_divisor: 3,
        }
    }

    /// Worth of a piece standing on `pos`, before threat adjustments.
    pub fn piece_worth(&self, pos: Pos) -> i32 {
        self.piece_value - pos.distance_to_centre() as i32
    }
}

impl Default for CentreEvaluator {
    fn default() -> Self {
        Self::threat()
    }
}

impl Evaluator<Board> for CentreEvaluator {
    fn value(&self, board: &Board, team: Team) -> i32 {
        let threats = self.placing_threats && board.phase() == Phase::Placing;
        let divisor = self.threat_divisor.max(1);

        let mut total = 0;
        for piece in board.pieces() {
            let worth = self.piece_worth(piece.pos);
            let threatened = threats && placing_threatened(board, piece.pos, piece.team.opponent());
            total += match (piece.team == team, threatened) {
                (true, false) => worth,
                (true, true) => 0,
                (false, false) => -worth,
                (false, true) => -(worth - worth / divisor),
            };
        }
        total
    }
}

/// Whether `enemy` could capture the piece on `pos` with its next placement.
///
/// True when, along some axis, one neighbour is an enemy piece or a corner and
/// the opposite neighbour is a square `enemy` may place on.
pub fn placing_threatened(board: &Board, pos: Pos, enemy: Team) -> bool {
    DIRECTIONS.iter().any(|&(dc, dr)| {
        let behind = pos.offset(-dc, -dr);
        let ahead = pos.offset(dc, dr);
        (board.has_team_at(behind, enemy) || board.is_corner(behind)) && board.can_place(ahead, enemy)
    })
}

// ========== Material ==========

/// Own piece count minus enemy piece count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaterialEvaluator;

impl Evaluator<Board> for MaterialEvaluator {
    fn value(&self, board: &Board, team: Team) -> i32 {
        board.piece_count(team) as i32 - board.piece_count(team.opponent()) as i32
    }
}

// ========== Selection ==========

/// Named evaluator presets, selectable from configuration and the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    /// Centre control with placing-phase threat detection
    #[default]
    Threat,
    /// Centre control only
    Centre,
    /// Piece count difference
    Material,
}

impl EvaluatorKind {
    pub fn build(self) -> Box<dyn Evaluator<Board> + Send> {
        match self {
            EvaluatorKind::Threat => Box::new(CentreEvaluator::threat()),
            EvaluatorKind::Centre => Box::new(CentreEvaluator::centre()),
            EvaluatorKind::Material => Box::new(MaterialEvaluator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(pieces: &[((i8, i8), Team)]) -> Board {
        let pieces: Vec<(Pos, Team)> = pieces.iter().map(|&(p, t)| (Pos::from(p), t)).collect();
        Board::from_layout(Phase::Placing, &pieces).unwrap()
    }

    #[test]
    fn test_empty_board_is_even() {
        let board = Board::new();
        assert_eq!(CentreEvaluator::threat().value(&board, Team::White), 0);
        assert_eq!(CentreEvaluator::centre().value(&board, Team::Black), 0);
        assert_eq!(MaterialEvaluator.value(&board, Team::White), 0);
    }

    #[test]
    fn test_centre_piece_worth() {
        let eval = CentreEvaluator::threat();
        assert_eq!(eval.piece_worth(Pos::new(3, 3)), 30);
        assert_eq!(eval.piece_worth(Pos::new(4, 4)), 30);
        assert_eq!(eval.piece_worth(Pos::new(1, 1)), 26);
        assert_eq!(eval.piece_worth(Pos::new(0, 4)), 27);
    }

    #[test]
    fn test_values_are_antisymmetric_without_threats() {
        let board = layout(&[((3, 3), Team::White), ((1, 5), Team::White), ((5, 2), Team::Black)]);
        for kind in [EvaluatorKind::Threat, EvaluatorKind::Centre, EvaluatorKind::Material] {
            let eval = kind.build();
            assert_eq!(eval.value(&board, Team::White), -eval.value(&board, Team::Black), "{:?}", kind);
        }
    }

    #[test]
    fn test_threat_next_to_corner() {
        // (1,0) sits beside the top-left corner, but row 0 is outside Black's
        // placing zone.
        let board = layout(&[((1, 0), Team::White)]);
        assert!(!placing_threatened(&board, Pos::new(1, 0), Team::Black));

        // (1,7) beside the bottom-left corner with (2,7) open to Black.
        let board = layout(&[((1, 7), Team::White)]);
        assert!(placing_threatened(&board, Pos::new(1, 7), Team::Black));
    }

    #[test]
    fn test_threat_from_enemy_piece() {
        let board = layout(&[((3, 3), Team::White), ((2, 3), Team::Black)]);
        assert!(placing_threatened(&board, Pos::new(3, 3), Team::Black));
        // Blocked once the far side is occupied.
        let board = layout(&[((3, 3), Team::White), ((2, 3), Team::Black), ((4, 3), Team::White)]);
        assert!(!placing_threatened(&board, Pos::new(3, 3), Team::Black));
    }

    #[test]
    fn test_threat_adjustments() {
        // White (3,3) is threatened by Black (2,3); Black (2,3) is threatened
        // too, since White may place on (1,3).
        let board = layout(&[((3, 3), Team::White), ((2, 3), Team::Black)]);
        let eval = CentreEvaluator::threat();
        // White: own (3,3) counts 0, enemy (2,3) worth 29 loses a third: -20.
        assert_eq!(eval.value(&board, Team::White), -20);
        // Black: own (2,3) counts 0, enemy (3,3) worth 30 loses a third: -20.
        assert_eq!(eval.value(&board, Team::Black), -20);

        // Without threats it is plain centre control.
        let plain = CentreEvaluator {
            placing_threats: false,
            ..CentreEvaluator::threat()
        };
        assert_eq!(plain.value(&board, Team::White), 30 - 29);
    }

    #[test]
    fn test_threats_ignored_after_placing() {
        let pieces = [(Pos::new(3, 3), Team::White), (Pos::new(2, 3), Team::Black)];
        let board = Board::from_layout(Phase::Moving, &pieces).unwrap();
        assert_eq!(CentreEvaluator::threat().value(&board, Team::White), 1);
    }

    #[test]
    fn test_material() {
        let board = layout(&[((3, 3), Team::White), ((1, 5), Team::White), ((5, 2), Team::Black)]);
        assert_eq!(MaterialEvaluator.value(&board, Team::White), 1);
        assert_eq!(MaterialEvaluator.value(&board, Team::Black), -1);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(serde_json::to_string(&EvaluatorKind::Threat).unwrap(), "\"threat\"");
        let kind: EvaluatorKind = serde_json::from_str("\"material\"").unwrap();
        assert_eq!(kind, EvaluatorKind::Material);
    }
}
