//! Doodad Engine headless runner.
//!
//! Loads a JSON scene manifest (see [`doodadengine::scene`]), runs it for a
//! number of ticks and logs every command the level sends to its host.
//! There is no window: this is for exercising doodad scripts.
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=debug cargo run -- demos/scene.json --ticks 600 --config demos/doodads.ini
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use doodadengine::level::Level;
use doodadengine::resources::input::Buttons;
use doodadengine::resources::simconfig::SimConfig;
use doodadengine::scene::Scene;

/// Doodad Engine
#[derive(Parser)]
#[command(version, about = "Runs a doodad scene headlessly and logs host commands.")]
struct Cli {
    /// Scene manifest (JSON).
    scene: PathBuf,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// INI file with simulation settings.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured tick rate.
    #[arg(long, value_name = "N")]
    tick_rate: Option<u32>,

    /// Hold "use" down on this tick, released on the next one.
    #[arg(long, value_name = "TICK")]
    use_at: Vec<u64>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::with_path(path),
        None => SimConfig::new(),
    };
    if cli.config.is_some()
        && let Err(e) = config.load_from_file()
    {
        warn!("{}; using defaults", e);
    }
    if let Some(rate) = cli.tick_rate {
        config.tick_rate = rate.max(1);
    }

    let scene = match Scene::load_from_file(&cli.scene) {
        Ok(scene) => scene,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut level = Level::new(config);
    let actors = scene.populate(&mut level);
    info!(
        "loaded {} actors from {}",
        actors.len(),
        cli.scene.display()
    );

    level.start();
    log_commands(&level);
    for _ in 0..cli.ticks {
        let next = level.tick() + 1;
        level.set_input(Buttons {
            use_action: cli.use_at.contains(&next),
            ..Buttons::default()
        });
        level.step();
        log_commands(&level);
        if level.level_state().is_over() {
            info!(
                "level over at tick {}: {:?}",
                level.tick(),
                level.level_state().outcome
            );
            break;
        }
    }
    info!("stopped after {} ticks ({:.0} ms)", level.tick(), level.now_ms());
    ExitCode::SUCCESS
}

fn log_commands(level: &Level) {
    for cmd in level.drain_host_commands() {
        info!("[tick {}] {:?}", level.tick(), cmd);
    }
}
