//! Game-playing agent.
//!
//! An [`Agent`] keeps its own copy of the board and talks to whatever drives
//! the match through two calls: [`Player::action`] to pick and play its own
//! move, and [`Player::update`] to hear about the opponent's.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wyb_core::{Action, Board, Phase, Pos, RuleViolation, Team};

use crate::eval::{Evaluator, EvaluatorKind};
use crate::search::Searcher;
use crate::stats::SearchStats;

/// First placements for White on board turn 0.
const WHITE_BOOK: [Pos; 2] = [Pos::new(3, 4), Pos::new(4, 4)];
/// First placements for Black on board turn 1.
const BLACK_BOOK: [Pos; 2] = [Pos::new(3, 3), Pos::new(4, 3)];

/// Placing-phase depth while mirroring.
const MIRROR_DEPTH: u32 = 3;
/// Mirroring continues only while the search value stays below this.
const MIRROR_VALUE_LIMIT: i32 = 2;

// ========== Configuration ==========

/// How many plies to search in each phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthPolicy {
    /// `base` in Placing and Moving, one more ply for each shrink.
    Adaptive { base: u32 },
    Fixed(u32),
}

impl DepthPolicy {
    pub fn depth_for(self, phase: Phase) -> u32 {
        let depth = match self {
            DepthPolicy::Adaptive { base } => base + phase.index().saturating_sub(1),
            DepthPolicy::Fixed(depth) => depth,
        };
        depth.max(1)
    }
}

impl Default for DepthPolicy {
    fn default() -> Self {
        DepthPolicy::Adaptive { base: 2 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub evaluator: EvaluatorKind,
    pub depth: DepthPolicy,
    /// Open with a centre placement without searching.
    pub opening_book: bool,
    /// As Black, answer White's placements with their mirror image.
    pub mirror_placements: bool,
    /// Tie-break seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorKind::default(),
            depth: DepthPolicy::default(),
            opening_book: true,
            mirror_placements: false,
            seed: None,
        }
    }
}

// ========== Driver boundary ==========

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Rule(#[from] RuleViolation),
    #[error("turn counter out of sync: driver reports {reported}, local board is at {local}")]
    OutOfSync { reported: u32, local: u32 },
}

/// Something that can take part in a match.
pub trait Player {
    /// Choose, play locally and return this side's action.
    ///
    /// `turns` is the driver's turn counter for the current phase.
    fn action(&mut self, turns: u32) -> Result<Action, AgentError>;

    /// Record the opponent's action.
    fn update(&mut self, action: Action) -> Result<(), AgentError>;
}

// ========== Agent ==========

/// Minimax agent with a private board.
pub struct Agent {
    team: Team,
    board: Board,
    config: AgentConfig,
    searcher: Searcher<Box<dyn Evaluator<Board> + Send>>,
    rng: StdRng,
    mirroring: bool,
    last_enemy_action: Option<Action>,
}

impl Agent {
    pub fn new(team: Team, config: AgentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            team,
            board: Board::new(),
            searcher: Searcher::new(config.evaluator.build()),
            rng,
            mirroring: config.mirror_placements && team == Team::Black,
            last_enemy_action: None,
            config,
        }
    }

    pub fn team(&self) -> Team {
        self.team
    }

    /// The agent's view of the game.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn stats(&self) -> &SearchStats {
        &self.searcher.stats
    }

    /// Pick an action for the current board without playing it.
    fn choose(&mut self) -> Result<Action, AgentError> {
        if let Some(action) = self.book_action() {
            debug!("{} opens from book: {}", self.team, action);
            return Ok(action);
        }

        let phase = self.board.phase();
        let depth = if self.mirroring && phase == Phase::Placing {
            MIRROR_DEPTH
        } else {
            self.config.depth.depth_for(phase)
        };

        let result = self.searcher.best_actions(&self.board, self.team, depth)?;
        debug!(
            "{} searched {} plies in {} phase: value {}, {} tied",
            self.team,
            depth,
            phase,
            result.value,
            result.actions.len(),
        );

        if let Some(action) = self.mirror_action(result.value) {
            debug!("{} mirrors with {}", self.team, action);
            return Ok(action);
        }

        Ok(result.actions.choose(&mut self.rng).copied().unwrap_or(Action::Pass))
    }

    /// A centre placement on this side's first placing turn.
    fn book_action(&mut self) -> Option<Action> {
        if !self.config.opening_book || self.mirroring || self.board.phase() != Phase::Placing {
            return None;
        }
        let book = match (self.team, self.board.turn_count()) {
            (Team::White, 0) => &WHITE_BOOK,
            (Team::Black, 1) => &BLACK_BOOK,
            _ => return None,
        };
        let open: Vec<Pos> = book
            .iter()
            .copied()
            .filter(|&pos| self.board.can_place(pos, self.team))
            .collect();
        open.choose(&mut self.rng).map(|&pos| Action::Place(pos))
    }

    /// The mirror image of White's last placement, while mirroring holds up.
    fn mirror_action(&mut self, value: i32) -> Option<Action> {
        if !self.mirroring {
            return None;
        }
        if self.board.phase() != Phase::Placing || value >= MIRROR_VALUE_LIMIT {
            debug!("{} stops mirroring (value {})", self.team, value);
            self.mirroring = false;
            return None;
        }
        let target = match self.last_enemy_action {
            Some(Action::Place(pos)) => pos.mirrored(),
            _ => {
                self.mirroring = false;
                return None;
            }
        };
        if self.board.can_place(target, self.team) {
            Some(Action::Place(target))
        } else {
            warn!("{} cannot mirror onto {}, falling back to search", self.team, target);
            self.mirroring = false;
            None
        }
    }
}

impl Player for Agent {
    fn action(&mut self, turns: u32) -> Result<Action, AgentError> {
        let local = self.board.turn_count();
        if turns != local {
            return Err(AgentError::OutOfSync { reported: turns, local });
        }
        let action = self.choose()?;
        self.board.apply(action, self.team)?;
        Ok(action)
    }

    fn update(&mut self, action: Action) -> Result<(), AgentError> {
        self.board.apply(action, self.team.opponent())?;
        self.last_enemy_action = Some(action);
        Ok(())
    }
}
