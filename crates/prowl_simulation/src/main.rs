//! Headless симуляция Prowl
//!
//! Запускает Bevy App без рендера: уровень из JSON (или демо), N тиков.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use prowl_simulation::{
    create_headless_app, log_error, log_info, set_log_level, spawn_level, AgentBrain, AgentState,
    LevelData, LifeLedger, LogLevel, PhysicsMode, SimulationSettings,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PhysicsArg {
    Headless,
    Rapier,
}

impl From<PhysicsArg> for PhysicsMode {
    fn from(arg: PhysicsArg) -> Self {
        match arg {
            PhysicsArg::Headless => PhysicsMode::Headless,
            PhysicsArg::Rapier => PhysicsMode::Rapier,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "prowl_simulation", about = "Headless NPC agent simulation")]
struct Args {
    /// Seed детерминистичного RNG
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Сколько тиков (60Hz) прогнать
    #[arg(long, default_value_t = 1000)]
    ticks: u32,

    /// Уровень (JSON). Без флага, встроенный демо-уровень
    #[arg(long)]
    level: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = PhysicsArg::Headless)]
    physics: PhysicsArg,

    /// debug | info | warning | error
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let settings = SimulationSettings {
        seed: args.seed,
        physics: args.physics.into(),
    };
    let mut app = create_headless_app(settings);
    set_log_level(LogLevel::parse(&args.log_level).unwrap_or(LogLevel::Info));

    let level = match &args.level {
        Some(path) => match LevelData::load(path) {
            Ok(level) => level,
            Err(error) => {
                log_error(&format!("{}", error));
                return ExitCode::FAILURE;
            }
        },
        None => LevelData::demo(),
    };

    log_info(&format!(
        "Starting Prowl headless simulation (seed: {}, physics: {:?}, level: '{}')",
        settings.seed, settings.physics, level.name
    ));

    {
        let world = app.world_mut();
        spawn_level(&mut world.commands(), &level, settings.physics);
        world.flush();
    }
    app.finish();
    app.cleanup();

    for tick in 0..args.ticks {
        app.update();

        if tick % 100 == 0 {
            let world = app.world_mut();
            let mut brains = world.query::<&AgentBrain>();
            let chasing = brains
                .iter(world)
                .filter(|brain| brain.state == AgentState::Chase)
                .count();
            let mut ledgers = world.query::<&LifeLedger>();
            let lives: Vec<u32> = ledgers.iter(world).map(|ledger| ledger.lives).collect();

            log_info(&format!("Tick {}: {} agents chasing, target lives {:?}", tick, chasing, lives));
        }
    }

    log_info("Simulation complete!");
    ExitCode::SUCCESS
}
