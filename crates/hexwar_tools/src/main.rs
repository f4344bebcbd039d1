//! Hexwar - Development Tools

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hexwar_core::error::GameError;
use hexwar_core::math::Fixed;
use hexwar_core::rules::RulesEngine;
use hexwar_service::attack::{simulate_attack, SimulateAttackRequest};
use hexwar_service::config::{ServiceConfig, DEFAULT_SIMULATIONS};
use hexwar_service::service::GamesService;
use hexwar_service::storage::FileStorage;
use hexwar_tools::{inspect, validate, Result, ToolError};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hexwar-tools")]
#[command(about = "Development tools for Hexwar rule sets and saved games")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate rules files
    Validate {
        /// Rules file or directory of `.ron` files
        #[arg(default_value = "assets/rules")]
        path: PathBuf,
    },
    /// Damage distributions for one attack and its counter
    SimulateAttack {
        /// Rules file
        #[arg(long)]
        rules: PathBuf,
        /// Attacking unit type id
        #[arg(long)]
        attacker: u32,
        /// Terrain id under the attacker
        #[arg(long)]
        attacker_terrain: u32,
        /// Attacker health
        #[arg(long, default_value_t = 10)]
        attacker_health: u32,
        /// Defending unit type id
        #[arg(long)]
        defender: u32,
        /// Terrain id under the defender
        #[arg(long)]
        defender_terrain: u32,
        /// Defender health
        #[arg(long, default_value_t = 10)]
        defender_health: u32,
        /// Wound bonus for the attack
        #[arg(long, default_value_t = 0)]
        wound_bonus: i32,
        /// Monte-Carlo runs
        #[arg(long, default_value_t = DEFAULT_SIMULATIONS)]
        simulations: u32,
    },
    /// Hexes a unit can reach on a saved world
    Reachable {
        /// Rules file
        #[arg(long)]
        rules: PathBuf,
        /// World snapshot (JSON)
        #[arg(long)]
        world: PathBuf,
        /// Unit position: `q,r` or a shortcut such as `A1`
        #[arg(long)]
        from: String,
        /// Destination; prints the route instead of every hex
        #[arg(long)]
        to: Option<String>,
        /// Movement budget; defaults to the unit's full allowance
        #[arg(long)]
        budget: Option<f64>,
    },
    /// Options at a position in a stored game
    Options {
        /// Rules file
        #[arg(long)]
        rules: PathBuf,
        /// Game storage directory
        #[arg(long, default_value = "games")]
        storage: PathBuf,
        /// Game id
        #[arg(long)]
        game: String,
        /// Position: `q,r` or a unit shortcut
        #[arg(long)]
        at: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| ToolError::Json {
        context: "output".into(),
        source,
    })?;
    println!("{text}");
    Ok(())
}

fn load_rules(path: &Path) -> Result<Arc<RulesEngine>> {
    Ok(Arc::new(RulesEngine::load_ron_file(path)?))
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating rules in: {}", path.display());
            let report = validate::validate_data_directory(&path)?;
            for file in &report.files {
                for error in &file.errors {
                    tracing::error!("{}: {error}", file.path.display());
                }
            }
            let report = report.into_result()?;
            tracing::info!("Validation passed ({} files)", report.files.len());
            Ok(())
        }
        Commands::SimulateAttack {
            rules,
            attacker,
            attacker_terrain,
            attacker_health,
            defender,
            defender_terrain,
            defender_health,
            wound_bonus,
            simulations,
        } => {
            let rules = load_rules(&rules)?;
            let request = SimulateAttackRequest {
                attacker_unit_type: attacker,
                attacker_terrain,
                attacker_health,
                defender_unit_type: defender,
                defender_terrain,
                defender_health,
                wound_bonus,
                num_simulations: simulations,
            };
            let response = simulate_attack(&rules, &request, DEFAULT_SIMULATIONS)?;
            print_json(&response)
        }
        Commands::Reachable {
            rules,
            world,
            from,
            to,
            budget,
        } => {
            let rules = load_rules(&rules)?;
            let world = inspect::load_world(&world)?;
            let from = world.resolve_position(&from, None)?;
            let budget = budget
                .map(|b| {
                    Fixed::checked_from_num(b)
                        .ok_or_else(|| GameError::Validation(format!("budget {b} is out of range")))
                })
                .transpose()?;
            match to {
                Some(to) => {
                    let to = world.resolve_position(&to, Some(from))?;
                    print_json(&inspect::route(&rules, &world, from, to, budget)?)
                }
                None => print_json(&inspect::reachable(&rules, &world, from, budget)?),
            }
        }
        Commands::Options {
            rules,
            storage,
            game,
            at,
        } => {
            let rules = load_rules(&rules)?;
            let storage = Arc::new(FileStorage::new(&storage)?);
            let service = GamesService::new(storage, rules, ServiceConfig::default());
            let (loaded, _) = service.load_game(&game)?;
            let pos = loaded.world().resolve_position(&at, None)?;
            print_json(&service.get_options_at(&game, pos)?)
        }
    }
}

fn main() {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
