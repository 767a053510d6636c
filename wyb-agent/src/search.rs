//! Depth-limited minimax with alpha-beta pruning.
//!
//! Depth counts the plies still to search. An odd remaining depth belongs to
//! the side that will make the last ply and maximises; an even one belongs to
//! its opponent and minimises. Leaves are scored for the side that made the
//! last ply, so the value of a search is always from that side's view: the
//! searching team itself when the requested depth is odd.
//!
//! The searcher is generic over [`SearchState`] so it runs on the real
//! [`Board`] as well as on hand-built game trees.

use std::fmt;

use wyb_core::{Action, Board, Phase, Pos, RuleViolation, Team, Undo};

use crate::eval::Evaluator;
use crate::stats::SearchStats;

/// A game state the searcher can walk with apply/undo.
pub trait SearchState: Clone {
    type Action: Copy + PartialEq + fmt::Debug;
    type Undo;
    type Error;

    /// Legal actions for `team`, empty when it has none.
    fn actions(&self, team: Team) -> Vec<Self::Action>;

    /// The action searched when a side has nothing legal to do.
    fn pass() -> Self::Action;

    fn play(&mut self, action: Self::Action, team: Team) -> Result<Self::Undo, Self::Error>;

    fn unplay(&mut self, undo: Self::Undo);

    /// Reorder candidates before they are searched. Must be stable.
    fn order_actions(&self, _actions: &mut [Self::Action]) {}
}

impl SearchState for Board {
    type Action = Action;
    type Undo = Undo;
    type Error = RuleViolation;

    fn actions(&self, team: Team) -> Vec<Action> {
        self.legal_actions(team)
    }

    fn pass() -> Action {
        Action::Pass
    }

    fn play(&mut self, action: Action, team: Team) -> Result<Undo, RuleViolation> {
        self.apply(action, team)
    }

    fn unplay(&mut self, undo: Undo) {
        self.undo(undo)
    }

    /// Placements closest to the centre first.
    fn order_actions(&self, actions: &mut [Action]) {
        if self.phase() == Phase::Placing {
            actions.sort_by_key(|action| action.destination().map_or(u32::MAX, Pos::distance_to_centre));
        }
    }
}

/// Best root actions and their shared value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResult<A> {
    /// Every evaluated root action whose value equals `value`, in search order.
    pub actions: Vec<A>,
    pub value: i32,
}

/// Minimax searcher over a fixed evaluator.
pub struct Searcher<E> {
    evaluator: E,
    pub stats: SearchStats,
}

impl<E> Searcher<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            stats: SearchStats::new(),
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Search `depth` plies from `state` with `team` to move, full window.
    pub fn best_actions<S>(&mut self, state: &S, team: Team, depth: u32) -> Result<SearchResult<S::Action>, S::Error>
    where
        S: SearchState,
        E: Evaluator<S>,
    {
        self.best_actions_in_window(state, team, depth, i32::MIN, i32::MAX)
    }

    /// Search with an explicit `(alpha, beta)` window.
    ///
    /// The caller's state is cloned once; the search walks the clone and
    /// leaves `state` untouched. A depth of 0 searches one ply.
    pub fn best_actions_in_window<S>(
        &mut self,
        state: &S,
        team: Team,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
    ) -> Result<SearchResult<S::Action>, S::Error>
    where
        S: SearchState,
        E: Evaluator<S>,
    {
        let depth = depth.max(1);
        let maximising = depth % 2 == 1;
        self.stats.searches += 1;

        let mut scratch = state.clone();
        let actions = self.candidates(&scratch, team);

        let mut best = if maximising { i32::MIN } else { i32::MAX };
        let mut tied = Vec::new();

        for (i, &action) in actions.iter().enumerate() {
            // On error the scratch state is dropped half-walked.
            let undo = scratch.play(action, team)?;
            let value = self.value_of(&mut scratch, team.opponent(), depth - 1, alpha, beta)?;
            scratch.unplay(undo);

            let improves = if maximising { value > best } else { value < best };
            if improves {
                best = value;
                tied.clear();
                tied.push(action);
            } else if value == best {
                tied.push(action);
            }

            if maximising {
                alpha = alpha.max(best);
            } else {
                beta = beta.min(best);
            }
            if beta < alpha {
                self.stats.record_cutoff(actions.len() - i - 1);
                break;
            }
        }

        Ok(SearchResult { actions: tied, value: best })
    }

    /// Minimax value of `state` with `team` to move and `depth` plies left.
    fn value_of<S>(&mut self, state: &mut S, team: Team, depth: u32, mut alpha: i32, mut beta: i32) -> Result<i32, S::Error>
    where
        S: SearchState,
        E: Evaluator<S>,
    {
        self.stats.nodes += 1;
        if depth == 0 {
            self.stats.leaves += 1;
            return Ok(self.evaluator.value(state, team.opponent()));
        }

        let maximising = depth % 2 == 1;
        let actions = self.candidates(state, team);
        let mut best = if maximising { i32::MIN } else { i32::MAX };

        for (i, &action) in actions.iter().enumerate() {
            let undo = state.play(action, team)?;
            let value = self.value_of(state, team.opponent(), depth - 1, alpha, beta)?;
            state.unplay(undo);

            if maximising {
                best = best.max(value);
                alpha = alpha.max(best);
            } else {
                best = best.min(value);
                beta = beta.min(best);
            }
            if beta < alpha {
                self.stats.record_cutoff(actions.len() - i - 1);
                break;
            }
        }

        Ok(best)
    }

    /// Ordered actions for `team`, or a lone pass when it has none.
    fn candidates<S: SearchState>(&mut self, state: &S, team: Team) -> Vec<S::Action> {
        let mut actions = state.actions(team);
        if actions.is_empty() {
            self.stats.passes += 1;
            return vec![S::pass()];
        }
        state.order_actions(&mut actions);
        actions
    }
}
