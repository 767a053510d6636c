//! Full matches between agents on a referee board.

use std::sync::atomic::AtomicBool;

use wyb_agent::{Agent, AgentConfig, DepthPolicy, EvaluatorKind, MatchLimits, Player, Referee};
use wyb_core::{Action, Board, Outcome, Phase, Team, PLACING_TURNS};

fn agent(team: Team, evaluator: EvaluatorKind, depth: u32, seed: u64) -> Agent {
    Agent::new(
        team,
        AgentConfig {
            evaluator,
            depth: DepthPolicy::Fixed(depth),
            seed: Some(seed),
            ..AgentConfig::default()
        },
    )
}

/// Replay a history from an empty board, returning the final position.
fn replay(history: &[Action]) -> Board {
    let mut board = Board::new();
    let mut team = Team::White;
    for &action in history {
        board.apply(action, team).unwrap();
        team = team.opponent();
    }
    board
}

#[test]
fn test_one_ply_match_completes() {
    let mut white = agent(Team::White, EvaluatorKind::Threat, 1, 1);
    let mut black = agent(Team::Black, EvaluatorKind::Centre, 1, 2);
    let running = AtomicBool::new(true);
    let mut referee = Referee::new(MatchLimits { max_moving_turns: 200 });

    let report = referee.play(&mut white, &mut black, &running).unwrap();

    assert!(!report.interrupted);
    assert!(report.outcome.is_some());
    assert!(report.history.len() > PLACING_TURNS as usize);
    assert_ne!(report.final_phase, Phase::Placing);

    // Both agents followed the referee's board exactly.
    assert_eq!(white.board(), referee.board());
    assert_eq!(black.board(), referee.board());
    assert_eq!(&replay(&report.history), referee.board());

    assert_eq!(report.white_pieces, referee.board().piece_count(Team::White));
    assert_eq!(report.black_pieces, referee.board().piece_count(Team::Black));
    if let Some(Outcome::Winner(team)) = report.outcome {
        assert!(referee.board().piece_count(team.opponent()) < 2);
    }
}

#[test]
fn test_turn_cap_draws() {
    let mut white = agent(Team::White, EvaluatorKind::Material, 1, 3);
    let mut black = agent(Team::Black, EvaluatorKind::Material, 1, 4);
    let running = AtomicBool::new(true);
    let mut referee = Referee::new(MatchLimits { max_moving_turns: 1 });

    let report = referee.play(&mut white, &mut black, &running).unwrap();

    // Placing never ends the game, so the first moving turn hits the cap
    // unless that very move decided it.
    assert_eq!(report.history.len(), PLACING_TURNS as usize + 1);
    assert_eq!(report.final_phase, Phase::Moving);
    if referee.board().outcome().is_none() {
        assert_eq!(report.outcome, Some(Outcome::Draw));
    }
}

#[test]
fn test_two_ply_match_is_reproducible() {
    let play = || {
        let mut white = agent(Team::White, EvaluatorKind::Threat, 2, 21);
        let mut black = agent(Team::Black, EvaluatorKind::Threat, 2, 22);
        let running = AtomicBool::new(true);
        let mut referee = Referee::new(MatchLimits { max_moving_turns: 20 });
        let report = referee.play(&mut white, &mut black, &running).unwrap();
        assert!(white.stats().searches > 0);
        assert!(white.stats().cutoffs > 0);
        report
    };
    assert_eq!(play(), play());
}

#[test]
fn test_mirror_match_stays_in_sync() {
    let config = AgentConfig {
        depth: DepthPolicy::Fixed(1),
        mirror_placements: true,
        seed: Some(8),
        ..AgentConfig::default()
    };
    let mut white = Agent::new(Team::White, config.clone());
    let mut black = Agent::new(Team::Black, config);
    let running = AtomicBool::new(true);
    let mut referee = Referee::new(MatchLimits { max_moving_turns: 10 });

    let report = referee.play(&mut white, &mut black, &running).unwrap();
    assert_eq!(black.board(), referee.board());
    assert_eq!(&replay(&report.history), referee.board());
}

#[test]
fn test_driver_turn_counter_checked() {
    let mut white = agent(Team::White, EvaluatorKind::Threat, 1, 5);
    let first = white.action(0).unwrap();
    assert!(matches!(first, Action::Place(_)));
    // Asking again for the same turn means the driver missed an action.
    assert!(white.action(0).is_err());
}
