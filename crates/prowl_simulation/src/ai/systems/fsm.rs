//! FSM AI system (perception + state transitions).

use bevy::prelude::*;
use bevy_rapier3d::prelude::ReadRapierContext;

use crate::ai::components::{AgentBrain, AgentConfig, AgentTarget, Behavior, ProviderRefs};
use crate::ai::events::AgentStateChanged;
use crate::ai::perception::perceive;
use crate::physics::{LevelGeometry, PhysicsMode, WorldRays};
use crate::providers::{LocationMap, WaypointRoute};
use crate::target::TrackedTarget;

/// Система: perception + переходы FSM
///
/// Каждый агент независим: читает только свой brain и позицию target.
/// Target без Transform (despawned) → "не видим" → Chase завершается.
/// Line-of-sight идёт через `WorldRays`: в Rapier режиме это rapier query pipeline.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_agent_states(
    mut agents: Query<(
        Entity,
        &AgentConfig,
        &AgentTarget,
        &Transform,
        &mut AgentBrain,
        &mut Behavior,
    )>,
    targets: Query<(&Transform, Option<&TrackedTarget>), Without<AgentBrain>>,
    routes: Query<&WaypointRoute>,
    maps: Query<&LocationMap>,
    geometry: Option<Res<LevelGeometry>>,
    mode: Res<PhysicsMode>,
    rapier: ReadRapierContext,
    mut state_events: EventWriter<AgentStateChanged>,
) {
    let fallback = LevelGeometry::default();
    let rays = WorldRays::select(*mode, geometry.as_deref().unwrap_or(&fallback), &rapier);

    for (entity, config, target, transform, mut brain, mut behavior) in agents.iter_mut() {
        let tracked = target.0.and_then(|t| targets.get(t).ok());
        let target_position = tracked.map(|(t, _)| t.translation);
        let target_speed = tracked.and_then(|(_, tracked)| tracked.map(|t| t.move_speed));

        let sight = perceive(config, transform.translation, target_position, target_speed, &rays);

        let (route, map) = behavior.provider_handles();
        let providers = ProviderRefs {
            route: route.and_then(|e| routes.get(e).ok()),
            map: map.and_then(|e| maps.get(e).ok()),
        };

        let Some(transition) = behavior.evaluate_state(entity, &mut brain, config, &sight, &providers) else {
            continue;
        };

        crate::log(&format!(
            "AI: {:?} {:?} → {:?} (distance {:?})",
            entity, transition.from, transition.to, sight.distance
        ));
        state_events.write(AgentStateChanged {
            agent: entity,
            from: transition.from,
            to: transition.to,
        });
    }
}
