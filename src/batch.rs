//! Batch mode for simulating many independent games in parallel
//!
//! Each game runs on one rayon worker with its own seeded state; results are
//! folded into shared statistics behind a mutex.

use crate::config::ConfigFile;
use crate::game::RoundEndReason;
use crate::sim::{RoundSimulation, SimulationConfig, SimulationResult};
use crate::{Result, ZmError};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Per-mode tallies
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModeStats {
    pub rounds: usize,
    pub humans_wins: usize,
    pub zombies_wins: usize,
    pub infections: u64,
    pub kills: u64,
}

/// Aggregated batch outcome
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub games: usize,
    pub rounds: usize,
    pub humans_wins: usize,
    pub zombies_wins: usize,
    pub draws: usize,
    /// Rounds cut off by the frame limit
    pub unresolved: usize,
    pub failed_games: usize,
    pub simulated_seconds: f64,
    pub modes: FxHashMap<String, ModeStats>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BatchReport {
    fn record(&mut self, result: &SimulationResult) {
        self.rounds += 1;
        self.simulated_seconds += result.duration;
        match result.reason {
            Some(RoundEndReason::HumansWin) => self.humans_wins += 1,
            Some(RoundEndReason::ZombiesWin) => self.zombies_wins += 1,
            Some(RoundEndReason::Draw) => self.draws += 1,
            None => self.unresolved += 1,
        }

        let name = result.mode.clone().unwrap_or_else(|| "<none>".to_string());
        let mode = self.modes.entry(name).or_default();
        mode.rounds += 1;
        mode.infections += result.infections as u64;
        mode.kills += result.kills as u64;
        match result.reason {
            Some(RoundEndReason::HumansWin) => mode.humans_wins += 1,
            Some(RoundEndReason::ZombiesWin) => mode.zombies_wins += 1,
            _ => {}
        }
    }

    pub fn print(&self) {
        println!("=== Batch Results ===\n");
        println!("Games: {} ({} failed)", self.games, self.failed_games);
        println!("Rounds: {}", self.rounds);
        if self.rounds > 0 {
            let pct = |n: usize| n as f64 * 100.0 / self.rounds as f64;
            println!("  Humans win:  {} ({:.1}%)", self.humans_wins, pct(self.humans_wins));
            println!("  Zombies win: {} ({:.1}%)", self.zombies_wins, pct(self.zombies_wins));
            if self.draws > 0 {
                println!("  Draws:       {}", self.draws);
            }
            if self.unresolved > 0 {
                println!("  Unresolved:  {}", self.unresolved);
            }
        }

        println!("\nModes:");
        let mut modes: Vec<_> = self.modes.iter().collect();
        modes.sort_by(|a, b| b.1.rounds.cmp(&a.1.rounds).then(a.0.cmp(b.0)));
        for (name, stats) in modes {
            println!(
                "  {:<12} {:>6} rounds  H {:>5}  Z {:>5}  infections {:>7}  kills {:>7}",
                name, stats.rounds, stats.humans_wins, stats.zombies_wins, stats.infections, stats.kills
            );
        }

        let secs = self.elapsed.as_secs_f64();
        println!(
            "\nSimulated {:.0}s of play in {:.2}s wall time ({:.1} rounds/sec)",
            self.simulated_seconds,
            secs,
            if secs > 0.0 { self.rounds as f64 / secs } else { 0.0 }
        );
    }
}

/// Options for a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub games: Option<usize>,
    pub seconds: Option<u64>,
    pub rounds_per_game: usize,
    pub simulation: SimulationConfig,
}

/// Run games in parallel until the game count or the deadline is reached
pub fn run_batch(file: &ConfigFile, options: &BatchOptions) -> Result<BatchReport> {
    if options.games.is_none() && options.seconds.is_none() {
        return Err(ZmError::InvalidAction(
            "Must specify either --games or --seconds".to_string(),
        ));
    }
    if options.rounds_per_game == 0 {
        return Err(ZmError::InvalidAction(
            "rounds per game must be at least 1".to_string(),
        ));
    }

    // With only a deadline, queue far more games than can finish in time
    let total_games = options.games.unwrap_or(1_000_000);
    let start = Instant::now();
    let deadline = options.seconds.map(|s| start + Duration::from_secs(s));

    let report = Arc::new(Mutex::new(BatchReport::default()));
    let base_seed = options.simulation.seed;

    (0..total_games).into_par_iter().for_each(|game_idx| {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return;
            }
        }

        let config = SimulationConfig {
            seed: base_seed.wrapping_add((game_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            ..options.simulation.clone()
        };
        let outcome = RoundSimulation::new(file, config)
            .and_then(|mut sim| sim.run_rounds(options.rounds_per_game));

        let mut report = report.lock().unwrap_or_else(|e| e.into_inner());
        report.games += 1;
        match outcome {
            Ok(results) => {
                for result in &results {
                    report.record(result);
                }
            }
            Err(e) => {
                report.failed_games += 1;
                eprintln!("game {} failed: {}", game_idx, e);
            }
        }
    });

    let mut report = report.lock().unwrap_or_else(|e| e.into_inner()).clone();
    report.elapsed = start.elapsed();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(games: usize) -> BatchOptions {
        BatchOptions {
            games: Some(games),
            seconds: None,
            rounds_per_game: 2,
            simulation: SimulationConfig {
                players: 8,
                ..SimulationConfig::default()
            },
        }
    }

    #[test]
    fn test_batch_counts_every_round() {
        let report = run_batch(&ConfigFile::builtin(), &options(4)).unwrap();
        assert_eq!(report.games, 4);
        assert_eq!(report.rounds, 8);
        assert_eq!(
            report.humans_wins + report.zombies_wins + report.draws + report.unresolved,
            8
        );
        assert_eq!(report.modes.values().map(|m| m.rounds).sum::<usize>(), 8);
    }

    #[test]
    fn test_batch_requires_a_limit() {
        let mut opts = options(1);
        opts.games = None;
        assert!(run_batch(&ConfigFile::builtin(), &opts).is_err());
    }
}
