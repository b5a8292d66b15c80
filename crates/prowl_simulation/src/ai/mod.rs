//! AI decision-making module
//!
//! Finite-state агент: perception → переходы (hysteresis) → поведение варианта
//! → MoveToward. Варианты (Chaser / Patroller / Wanderer): один enum `Behavior`.

use bevy::prelude::*;

pub mod components;
pub mod events;
pub mod perception;
pub mod systems;

// Re-export основных типов
pub use components::{
    AgentBrain, AgentConfig, AgentState, AgentTarget, AreaPhase, Behavior, ChaseSpeed,
    PatrolBehavior, PatrolSource, ProviderRefs, Sight, Transition, WanderBehavior,
};
pub use events::{AgentStateChanged, ContactDamage};
pub use perception::{agent_can_see, can_see_target, perceive};

use crate::physics::{insert_locomotion, Locomotion};
use crate::SimulationSet;

/// AI Plugin
///
/// Системы в FixedUpdate, каждая в своей фазе `SimulationSet`:
/// 1. evaluate_agent_states: perception + переходы
/// 2. execute_agent_behaviors: destination → LocomotionIntent
/// 3. detect_target_contact: ContactDamage
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AgentStateChanged>()
            .add_event::<ContactDamage>()
            .register_type::<AgentConfig>()
            .register_type::<AgentBrain>()
            .register_type::<AgentTarget>()
            .register_type::<Behavior>()
            .add_systems(
                FixedUpdate,
                (
                    systems::evaluate_agent_states.in_set(SimulationSet::EvaluateState),
                    systems::execute_agent_behaviors.in_set(SimulationSet::ExecuteBehavior),
                    systems::detect_target_contact.in_set(SimulationSet::Contact),
                ),
            );
    }
}

/// Всё, что нужно для спавна агента (handles инжектятся явно)
#[derive(Debug, Clone)]
pub struct AgentSpawn {
    pub position: Vec3,
    pub config: AgentConfig,
    pub behavior: Behavior,
    pub locomotion: Locomotion,
    pub target: Option<Entity>,
}

impl AgentSpawn {
    pub fn new(position: Vec3, behavior: Behavior) -> Self {
        Self {
            position,
            config: AgentConfig::default(),
            behavior,
            locomotion: Locomotion::default(),
            target: None,
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_locomotion(mut self, locomotion: Locomotion) -> Self {
        self.locomotion = locomotion;
        self
    }

    pub fn with_target(mut self, target: Entity) -> Self {
        self.target = Some(target);
        self
    }
}

/// Спавн агента: config (sanitized) + brain + behavior + locomotion backend
pub fn spawn_agent(commands: &mut Commands, spawn: AgentSpawn) -> Entity {
    let (config, repaired) = spawn.config.sanitized();
    if repaired {
        crate::log_warning(&format!(
            "AI: hysteresis band collapsed at {:?}, lose_interest_radius widened to {}",
            spawn.position, config.lose_interest_radius
        ));
    }

    let mut entity = commands.spawn((
        Transform::from_translation(spawn.position),
        AgentBrain::new(&config),
        AgentTarget(spawn.target),
        spawn.behavior,
    ));
    insert_locomotion(&mut entity, spawn.locomotion, config.motor_settings());
    entity.insert(config);

    let id = entity.id();
    crate::log(&format!("AI: spawned agent {:?} at {:?} ({:?})", id, spawn.position, spawn.locomotion));
    id
}
