//! Behavior execution: destination активного состояния → MoveToward.

use bevy::prelude::*;
use bevy_rapier3d::prelude::ReadRapierContext;

use crate::ai::components::{AgentBrain, AgentConfig, AgentTarget, Behavior, ProviderRefs};
use crate::physics::{
    move_toward, LevelGeometry, Locomotion, LocomotionCommand, LocomotionIntent, Motor, MotorSettings,
    PhysicsMode, WorldRays,
};
use crate::providers::{LocationMap, WaypointRoute};
use crate::DeterministicRng;

/// Система: исполнение поведения (фаза 2 тика)
///
/// Переход, решённый в EvaluateState, исполняется в этом же тике.
/// Нет destination (Idle / дефект provider'а) → `LocomotionCommand::Hold`.
#[allow(clippy::type_complexity, clippy::too_many_arguments)]
pub fn execute_agent_behaviors(
    mut agents: Query<(
        Entity,
        &AgentConfig,
        &AgentTarget,
        &Locomotion,
        &MotorSettings,
        &mut AgentBrain,
        &mut Behavior,
        &mut Motor,
        &mut Transform,
        &mut LocomotionIntent,
    )>,
    targets: Query<&Transform, Without<AgentBrain>>,
    routes: Query<&WaypointRoute>,
    maps: Query<&LocationMap>,
    geometry: Option<Res<LevelGeometry>>,
    mode: Res<PhysicsMode>,
    rapier: ReadRapierContext,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let fallback = LevelGeometry::default();
    let rays = WorldRays::select(*mode, geometry.as_deref().unwrap_or(&fallback), &rapier);

    for (
        entity,
        config,
        target,
        backend,
        settings,
        mut brain,
        mut behavior,
        mut motor,
        mut transform,
        mut intent,
    ) in agents.iter_mut()
    {
        let target_position = target
            .0
            .and_then(|t| targets.get(t).ok())
            .map(|t| t.translation);

        let (route, map) = behavior.provider_handles();
        let providers = ProviderRefs {
            route: route.and_then(|e| routes.get(e).ok()),
            map: map.and_then(|e| maps.get(e).ok()),
        };

        let destination = behavior.evaluate_behavior(
            entity,
            transform.translation,
            &mut brain,
            config,
            target_position,
            &providers,
            &mut rng.rng,
            &rays,
            delta,
        );

        intent.command = match destination {
            Some(destination) => move_toward(
                *backend,
                settings,
                &mut motor,
                &mut transform,
                destination,
                brain.move_speed,
                delta,
                &rays,
            ),
            None => LocomotionCommand::Hold,
        };
    }
}
