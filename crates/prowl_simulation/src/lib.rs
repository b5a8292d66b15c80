//! Prowl Simulation Core
//!
//! NPC agent core на Bevy 0.16: perception → state machine → movement resolver.
//!
//! Порядок тика (FixedUpdate, 60Hz):
//! 1. EvaluateState: perception + переходы FSM (hysteresis)
//! 2. ExecuteBehavior: provider cursor + MoveToward → LocomotionIntent
//! 3. Locomotion: headless интегратор или rapier bridge
//! 4. Contact: агенты рядом с target → ContactDamage
//! 5. Target: иммунитет, knockback, жизни

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Публичные модули
pub mod ai;
pub mod level;
pub mod logger;
pub mod physics;
pub mod providers;
pub mod target;

// Re-export базовых типов для удобства
pub use ai::{
    spawn_agent, AIPlugin, AgentBrain, AgentConfig, AgentSpawn, AgentState, AgentStateChanged,
    Behavior, ChaseSpeed, ContactDamage, PatrolBehavior, PatrolSource, WanderBehavior,
};
pub use level::{spawn_level, LevelData, LevelError};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, log_with_level, set_log_level, set_logger,
    set_logger_if_needed, LogLevel, LogPrinter,
};
pub use physics::{
    CollisionMask, GeometryBox, LevelGeometry, Locomotion, LocomotionPlugin, PhysicsMode, RayCaster,
};
pub use providers::{AreaRef, LocationMap, PatrolArea, ProviderError, WanderCircle, WaypointRoute};
pub use target::{
    LifeLedger, TargetDefeated, TargetLifeLost, TargetPlugin, TrackedTarget, Vulnerability,
};

/// Фазы одного тика симуляции (строго последовательно)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Perception + переходы состояний
    EvaluateState,
    /// Движение к destination активного состояния
    ExecuteBehavior,
    /// Применение команд locomotion к миру
    Locomotion,
    /// Контакт агентов с target
    Contact,
    /// Реакции target (урон, иммунитет, knockback)
    Target,
}

/// Шаг фиксированного тика (60Hz)
pub fn fixed_timestep() -> Duration {
    Duration::from_secs_f64(1.0 / 60.0)
}

/// Настройки запуска
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub seed: u64,
    pub physics: PhysicsMode,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            physics: PhysicsMode::Headless,
        }
    }
}

/// Главный plugin симуляции (объединяет все подсистемы)
#[derive(Default)]
pub struct SimulationPlugin {
    pub settings: SimulationSettings,
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings)
            .insert_resource(Time::<Fixed>::from_duration(fixed_timestep()))
            .insert_resource(DeterministicRng::new(self.settings.seed))
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::EvaluateState,
                    SimulationSet::ExecuteBehavior,
                    SimulationSet::Locomotion,
                    SimulationSet::Contact,
                    SimulationSet::Target,
                )
                    .chain(), // Последовательно: решение этого тика исполняется в этом же тике
            )
            .add_plugins((
                LocomotionPlugin {
                    mode: self.settings.physics,
                },
                AIPlugin,
                TargetPlugin,
            ));
    }
}

/// Единственный источник случайности мира
///
/// Из него берутся точки внутри patrol areas и wander circle, а также
/// интервалы Wanderer. Агенты тянут числа в порядке query, поэтому при
/// одинаковом seed и одинаковом порядке spawn последовательность совпадает.
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт Bevy App для headless симуляции
///
/// Время ручное: каждый `app.update()` сдвигает часы ровно на один
/// фиксированный тик (первый update, нулевой delta, как у любого Bevy App).
pub fn create_headless_app(settings: SimulationSettings) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(bevy::time::TimeUpdateStrategy::ManualDuration(fixed_timestep()))
        .add_plugins(SimulationPlugin { settings });

    app
}

/// Прогоняет ровно `ticks` фиксированных тиков, минуя wall-clock
///
/// Для тестов: каждый тик = FixedUpdate с delta = timestep.
pub fn run_fixed_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        let world = app.world_mut();
        let timestep = world.resource::<Time<Fixed>>().timestep();
        world.resource_mut::<Time<Fixed>>().advance_by(timestep);
        world.run_schedule(FixedUpdate);
    }
}

/// Отпечаток всех агентов: pose + состояние мозга, по возрастанию Entity index
///
/// Translation и rotation пишутся битами f32, `AgentBrain` через Debug.
/// Два прогона с одним seed дают равные байты.
pub fn agent_snapshot(world: &mut World) -> Vec<u8> {
    let mut query = world.query::<(Entity, &Transform, &AgentBrain)>();
    let mut agents: Vec<_> = query.iter(world).collect();
    agents.sort_by_key(|(entity, _, _)| entity.index());

    let mut snapshot = Vec::new();
    for (entity, transform, brain) in agents {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());

        let pose = transform.translation.to_array().into_iter().chain(transform.rotation.to_array());
        for value in pose {
            snapshot.extend_from_slice(&value.to_bits().to_le_bytes());
        }

        snapshot.extend_from_slice(format!("{:?}", brain).as_bytes());
    }

    snapshot
}
