//! Match orchestration on an authoritative board.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wyb_core::{Action, Board, Outcome, Phase, RuleViolation, Team};

use crate::agent::{AgentError, Player};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchLimits {
    /// Declare a draw once the post-placing turn counter reaches this.
    pub max_moving_turns: u32,
}

impl Default for MatchLimits {
    fn default() -> Self {
        Self { max_moving_turns: 256 }
    }
}

/// How a match ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    /// `None` only when the match was interrupted.
    pub outcome: Option<Outcome>,
    pub interrupted: bool,
    pub final_phase: Phase,
    pub white_pieces: usize,
    pub black_pieces: usize,
    /// Every action in play order, White first.
    pub history: Vec<Action>,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{team} agent failed")]
    Agent {
        team: Team,
        #[source]
        source: AgentError,
    },
    #[error("{team} played illegal action {action}")]
    IllegalAction {
        team: Team,
        action: Action,
        #[source]
        source: RuleViolation,
    },
    #[error("{0} passed with legal actions available")]
    IllegalPass(Team),
}

/// Runs one match and keeps the board both agents are checked against.
pub struct Referee {
    board: Board,
    limits: MatchLimits,
}

impl Referee {
    pub fn new(limits: MatchLimits) -> Self {
        Self {
            board: Board::new(),
            limits,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Play White against Black until the game is decided, the turn cap is
    /// hit, or `running` is cleared.
    pub fn play(
        &mut self,
        white: &mut dyn Player,
        black: &mut dyn Player,
        running: &AtomicBool,
    ) -> Result<MatchReport, MatchError> {
        let mut history = Vec::new();
        let mut team = Team::White;

        loop {
            if !running.load(Ordering::SeqCst) {
                info!("Match interrupted after {} actions", history.len());
                return Ok(self.report(None, history));
            }

            let (player, opponent): (&mut dyn Player, &mut dyn Player) = match team {
                Team::White => (&mut *white, &mut *black),
                Team::Black => (&mut *black, &mut *white),
            };

            let action = player
                .action(self.board.turn_count())
                .map_err(|source| MatchError::Agent { team, source })?;

            if action == Action::Pass && self.board.legal_action_count(team) > 0 {
                return Err(MatchError::IllegalPass(team));
            }
            let undo = self
                .board
                .apply(action, team)
                .map_err(|source| MatchError::IllegalAction { team, action, source })?;
            for (pos, lost) in undo.removed() {
                debug!("{} piece on {} eliminated", lost, pos);
            }
            if undo.advanced_phase(&self.board) {
                info!("Entering {} phase", self.board.phase());
            }
            history.push(action);

            opponent.update(action).map_err(|source| MatchError::Agent {
                team: team.opponent(),
                source,
            })?;

            if let Some(outcome) = self.board.outcome() {
                return Ok(self.report(Some(outcome), history));
            }
            if self.board.phase() != Phase::Placing && self.board.turn_count() >= self.limits.max_moving_turns {
                info!("Turn limit {} reached", self.limits.max_moving_turns);
                return Ok(self.report(Some(Outcome::Draw), history));
            }

            team = team.opponent();
        }
    }

    fn report(&self, outcome: Option<Outcome>, history: Vec<Action>) -> MatchReport {
        MatchReport {
            outcome,
            interrupted: outcome.is_none(),
            final_phase: self.board.phase(),
            white_pieces: self.board.piece_count(Team::White),
            black_pieces: self.board.piece_count(Team::Black),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wyb_core::Pos;

    /// Replays a fixed list of actions, then passes.
    struct Scripted {
        actions: Vec<Action>,
        next: usize,
        heard: Vec<Action>,
    }

    impl Scripted {
        fn new(actions: Vec<Action>) -> Self {
            Self {
                actions,
                next: 0,
                heard: Vec::new(),
            }
        }
    }

    impl Player for Scripted {
        fn action(&mut self, _turns: u32) -> Result<Action, AgentError> {
            let action = self.actions.get(self.next).copied().unwrap_or(Action::Pass);
            self.next += 1;
            Ok(action)
        }

        fn update(&mut self, action: Action) -> Result<(), AgentError> {
            self.heard.push(action);
            Ok(())
        }
    }

    fn place(col: i8, row: i8) -> Action {
        Action::Place(Pos::new(col, row))
    }

    #[test]
    fn test_illegal_pass_in_placing() {
        let mut white = Scripted::new(vec![]);
        let mut black = Scripted::new(vec![]);
        let running = AtomicBool::new(true);
        let err = Referee::new(MatchLimits::default())
            .play(&mut white, &mut black, &running)
            .unwrap_err();
        assert!(matches!(err, MatchError::IllegalPass(Team::White)));
    }

    #[test]
    fn test_illegal_action_reported() {
        let mut white = Scripted::new(vec![place(3, 3)]);
        let mut black = Scripted::new(vec![place(3, 3)]);
        let running = AtomicBool::new(true);
        let mut referee = Referee::new(MatchLimits::default());
        let err = referee.play(&mut white, &mut black, &running).unwrap_err();
        match err {
            MatchError::IllegalAction { team, action, source } => {
                assert_eq!(team, Team::Black);
                assert_eq!(action, place(3, 3));
                assert_eq!(source, RuleViolation::Occupied(Pos::new(3, 3)));
            }
            other => panic!("unexpected error {:?}", other),
        }
        // The rejected action never reached the board.
        assert_eq!(referee.board().turn_count(), 1);
    }

    #[test]
    fn test_actions_forwarded() {
        let mut white = Scripted::new(vec![place(3, 3), place(4, 4)]);
        let mut black = Scripted::new(vec![place(3, 5)]);
        let running = AtomicBool::new(true);
        let _ = Referee::new(MatchLimits::default()).play(&mut white, &mut black, &running);
        assert_eq!(black.heard, vec![place(3, 3), place(4, 4)]);
        assert_eq!(white.heard, vec![place(3, 5)]);
    }

    #[test]
    fn test_interrupted_before_first_turn() {
        let mut white = Scripted::new(vec![place(3, 3)]);
        let mut black = Scripted::new(vec![]);
        let running = AtomicBool::new(false);
        let report = Referee::new(MatchLimits::default())
            .play(&mut white, &mut black, &running)
            .unwrap();
        assert!(report.interrupted);
        assert_eq!(report.outcome, None);
        assert!(report.history.is_empty());
        assert_eq!(report.final_phase, Phase::Placing);
    }

    #[test]
    fn test_agent_error_wrapped() {
        struct Broken;
        impl Player for Broken {
            fn action(&mut self, turns: u32) -> Result<Action, AgentError> {
                Err(AgentError::OutOfSync { reported: turns, local: turns + 1 })
            }
            fn update(&mut self, _action: Action) -> Result<(), AgentError> {
                Ok(())
            }
        }
        let running = AtomicBool::new(true);
        let err = Referee::new(MatchLimits::default())
            .play(&mut Broken, &mut Broken, &running)
            .unwrap_err();
        assert!(matches!(
            err,
            MatchError::Agent {
                team: Team::White,
                source: AgentError::OutOfSync { reported: 0, local: 1 }
            }
        ));
    }
}
