//! Minimax agent for Watch Your Back.
//!
//! - [`eval`]: evaluator strategies
//! - [`search`]: alpha-beta minimax over any [`search::SearchState`]
//! - [`agent`]: the `action` / `update` player used by a match driver
//! - [`referee`]: runs a match between two players

pub mod agent;
pub mod eval;
pub mod referee;
pub mod search;
pub mod stats;

pub use agent::{Agent, AgentConfig, AgentError, DepthPolicy, Player};
pub use eval::{CentreEvaluator, Evaluator, EvaluatorKind, MaterialEvaluator};
pub use referee::{MatchError, MatchLimits, MatchReport, Referee};
pub use search::{SearchResult, SearchState, Searcher};
pub use stats::SearchStats;
