//! Zombie mod core - simulation binary
//!
//! Runs the round/infection core against in-process fakes: a single
//! round (optionally paced in real time), a parallel batch, or config checks.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use zombiemod_core::{
    batch::{run_batch, BatchOptions},
    config::{load_or_builtin, ConfigFile, StaticConfig},
    game::{OutputFormat, OutputMode, VerbosityLevel},
    services::ConfigStore,
    sim::{build_game, RoundSimulation, SimulationConfig},
    core::ClassKind,
};

/// Verbosity level for game output (accepts names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

impl From<VerbosityArg> for VerbosityLevel {
    fn from(arg: VerbosityArg) -> Self {
        arg.0
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "zmod")]
#[command(about = "Zombie mod round/infection core simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate rounds on one server with random combat
    Run {
        /// JSON config with tunables, classes and modes (built-in set if omitted)
        #[arg(long, short = 'c', value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Number of connected players
        #[arg(long, short = 'p', default_value_t = 16)]
        players: usize,

        /// Number of consecutive rounds
        #[arg(long, short = 'r', default_value_t = 1)]
        rounds: usize,

        /// Set random seed for deterministic runs
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Verbosity level for game output (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,

        /// Log line format
        #[arg(long, value_enum, default_value = "text")]
        log_format: LogFormat,

        /// Pace frames on the wall clock instead of running flat out
        #[arg(long)]
        realtime: bool,

        /// Frame length in milliseconds
        #[arg(long, default_value_t = 100)]
        frame_ms: u64,
    },

    /// Run many independent games in parallel and print statistics
    Batch {
        #[arg(long, short = 'c', value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Number of games to run
        #[arg(long, short = 'g')]
        games: Option<usize>,

        /// Run for this many seconds instead of a fixed game count
        #[arg(long, short = 's')]
        seconds: Option<u64>,

        /// Rounds played per game
        #[arg(long, short = 'r', default_value_t = 5)]
        rounds: usize,

        #[arg(long, short = 'p', default_value_t = 16)]
        players: usize,

        /// Base seed; each game derives its own from it
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a config file, register its modes and classes, and list them
    CheckConfig {
        #[arg(value_name = "CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the built-in config as JSON
    DumpConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            players,
            rounds,
            seed,
            verbosity,
            log_format,
            realtime,
            frame_ms,
        } => {
            run_rounds(
                config, players, rounds, seed, verbosity, log_format, realtime, frame_ms,
            )
            .await?
        }
        Commands::Batch {
            config,
            games,
            seconds,
            rounds,
            players,
            seed,
            json,
        } => run_batch_cmd(config, games, seconds, rounds, players, seed, json)?,
        Commands::CheckConfig { config } => check_config(config)?,
        Commands::DumpConfig => {
            let json = ConfigFile::builtin()
                .to_json_string()
                .context("serializing built-in config")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ConfigFile> {
    load_or_builtin(path.map(PathBuf::as_path)).with_context(|| match path {
        Some(p) => format!("loading config {}", p.display()),
        None => "loading built-in config".to_string(),
    })
}

#[allow(clippy::too_many_arguments)]
async fn run_rounds(
    config_path: Option<PathBuf>,
    players: usize,
    rounds: usize,
    seed: u64,
    verbosity: VerbosityArg,
    log_format: LogFormat,
    realtime: bool,
    frame_ms: u64,
) -> anyhow::Result<()> {
    if players < 2 {
        bail!("at least 2 players are needed for a round to start");
    }
    let file = load_config(config_path.as_ref())?;
    let config = SimulationConfig {
        players,
        seed,
        frame_time: frame_ms as f64 / 1000.0,
        ..SimulationConfig::default()
    };
    let mut sim = RoundSimulation::new(&file, config).context("building simulated game")?;

    let logger = &mut sim.sim.game.logger;
    logger.set_verbosity(verbosity.into());
    logger.set_output_mode(OutputMode::Stdout);
    logger.set_output_format(match log_format {
        LogFormat::Text => OutputFormat::Text,
        LogFormat::Json => OutputFormat::Json,
    });

    println!("=== Zombie Mod - {} players, seed {} ===\n", players, seed);

    for _ in 0..rounds {
        let mut result = sim.begin().context("starting round")?;
        if realtime {
            let mut interval = tokio::time::interval(Duration::from_millis(frame_ms.max(1)));
            loop {
                interval.tick().await;
                if !sim.step(&mut result)? {
                    break;
                }
            }
        } else {
            while sim.step(&mut result)? {}
        }
        sim.finish(&mut result);

        println!(
            "\nRound {}: {} -> {} after {:.1}s ({} infections, {} kills, {} absorbed)",
            result.round,
            result.mode.as_deref().unwrap_or("<no mode>"),
            result
                .reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unresolved".to_string()),
            result.duration,
            result.infections,
            result.kills,
            result.absorbed
        );
    }

    let scores = sim.sim.game.round.scores;
    println!("\nScore: humans {} - zombies {}", scores.humans, scores.zombies);
    Ok(())
}

fn run_batch_cmd(
    config_path: Option<PathBuf>,
    games: Option<usize>,
    seconds: Option<u64>,
    rounds: usize,
    players: usize,
    seed: u64,
    json: bool,
) -> anyhow::Result<()> {
    let file = load_config(config_path.as_ref())?;
    let options = BatchOptions {
        games,
        seconds,
        rounds_per_game: rounds,
        simulation: SimulationConfig {
            players,
            seed,
            ..SimulationConfig::default()
        },
    };

    if !json {
        println!("=== Zombie Mod - Batch Mode ===\n");
        match (games, seconds) {
            (Some(g), _) => println!("Running {g} games of {rounds} rounds with {players} players"),
            (None, Some(s)) => println!("Running for {s} seconds with {players} players"),
            (None, None) => {}
        }
        println!();
    }

    let report = run_batch(&file, &options).context("batch run failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}

fn check_config(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let file = load_config(config_path.as_ref())?;
    let config = StaticConfig::from_file(&file).context("registering classes")?;

    println!("Classes:");
    for kind in [ClassKind::Human, ClassKind::Zombie] {
        for id in config.classes(kind) {
            let Some(class) = config.class(id) else {
                continue;
            };
            println!(
                "  [{}] {:<10} {:?} hp={} speed={} gravity={} level>={}{}",
                id,
                class.name,
                kind,
                class.health,
                class.speed,
                class.gravity,
                class.level,
                class
                    .group
                    .as_deref()
                    .map(|g| format!(" group={g}"))
                    .unwrap_or_default()
            );
        }
    }

    let sim = build_game(&file, 0).context("building game")?;
    let game = &sim.game;
    println!("\nModes:");
    for mode in game.modes.iter() {
        println!(
            "  [{}] {:<12} chance=1/{} min>{} ratio={:.2} flags={:?}{}",
            mode.id,
            mode.def.name,
            mode.chance(),
            mode.min_players(),
            mode.ratio(),
            mode.def.flags,
            if mode.is_fallback() { " (fallback)" } else { "" }
        );
    }

    let rejected = file.modes.len() - game.modes.len();
    if rejected > 0 {
        println!("\n{rejected} mode(s) rejected");
    }
    if game.modes.fallback().is_none() {
        bail!("no fallback mode (chance 0) registered; rounds cannot start");
    }
    println!("\nConfig OK");
    Ok(())
}
