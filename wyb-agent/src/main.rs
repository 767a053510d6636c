//! Watch Your Back self-play
//!
//! Runs matches between two minimax agents and reports the results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::{Builder, Env, Target};
use log::{info, warn};
use wyb_core::{Outcome, Team};

use wyb_agent::{Agent, AgentConfig, DepthPolicy, EvaluatorKind, MatchLimits, Referee};

#[derive(Parser, Debug)]
#[command(author, version, about = "Watch Your Back self-play (agent vs agent)")]
struct Cli {
    /// Number of games to play
    #[arg(long, default_value_t = 1)]
    games: u32,

    /// Evaluator for White
    #[arg(long, value_enum, default_value_t = EvaluatorKind::Threat)]
    white: EvaluatorKind,

    /// Evaluator for Black
    #[arg(long, value_enum, default_value_t = EvaluatorKind::Threat)]
    black: EvaluatorKind,

    /// Fixed search depth (default: adaptive, deeper as the board shrinks)
    #[arg(long)]
    depth: Option<u32>,

    /// Base seed for tie-breaking; each agent of each game gets its own offset
    #[arg(long)]
    seed: Option<u64>,

    /// Call a draw once the post-placing turn counter reaches this
    #[arg(long, default_value_t = MatchLimits::default().max_moving_turns)]
    max_moving_turns: u32,

    /// Black mirrors White's placements while it holds up
    #[arg(long)]
    mirror: bool,

    /// Search the first placement instead of using the opening book
    #[arg(long)]
    no_book: bool,

    /// Print the final board of each game
    #[arg(long)]
    show_board: bool,
}

impl Cli {
    fn agent_config(&self, team: Team, game: u32) -> AgentConfig {
        let (evaluator, offset) = match team {
            Team::White => (self.white, 0),
            Team::Black => (self.black, 1),
        };
        AgentConfig {
            evaluator,
            depth: self.depth.map_or_else(DepthPolicy::default, DepthPolicy::Fixed),
            opening_book: !self.no_book,
            mirror_placements: self.mirror,
            seed: self.seed.map(|seed| seed.wrapping_add(2 * game as u64 + offset)),
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    white: u32,
    black: u32,
    draws: u32,
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.games == 0 {
        bail!("--games must be at least 1");
    }

    // Finish the current turn on Ctrl-C, then stop
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after this turn...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl-C handler")?;

    let limits = MatchLimits {
        max_moving_turns: cli.max_moving_turns,
    };
    let mut tally = Tally::default();
    let start = Instant::now();

    for game in 0..cli.games {
        let mut white = Agent::new(Team::White, cli.agent_config(Team::White, game));
        let mut black = Agent::new(Team::Black, cli.agent_config(Team::Black, game));
        let mut referee = Referee::new(limits);

        let game_start = Instant::now();
        let report = referee
            .play(&mut white, &mut black, &running)
            .with_context(|| format!("game {} aborted", game + 1))?;

        if cli.show_board {
            println!("{}", referee.board());
        }
        white.stats().log_summary("white");
        black.stats().log_summary("black");

        let result = match report.outcome {
            Some(Outcome::Winner(Team::White)) => {
                tally.white += 1;
                "white wins"
            }
            Some(Outcome::Winner(Team::Black)) => {
                tally.black += 1;
                "black wins"
            }
            Some(Outcome::Draw) => {
                tally.draws += 1;
                "draw"
            }
            None => {
                info!("Game {} interrupted after {} actions", game + 1, report.history.len());
                break;
            }
        };
        info!(
            "Game {}: {} in {} phase after {} actions ({} vs {} pieces) in {:.2}s",
            game + 1,
            result,
            report.final_phase,
            report.history.len(),
            report.white_pieces,
            report.black_pieces,
            game_start.elapsed().as_secs_f64(),
        );
    }

    println!("==========================");
    println!("White ({:?}): {} wins", cli.white, tally.white);
    println!("Black ({:?}): {} wins", cli.black, tally.black);
    println!("Draws: {}", tally.draws);
    println!("Time: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
