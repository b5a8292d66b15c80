//! Contact: агент рядом с target → ContactDamage.

use bevy::prelude::*;

use crate::ai::components::{AgentConfig, AgentTarget};
use crate::ai::events::ContactDamage;
use crate::target::{TrackedTarget, Vulnerability};

/// Система: детекция контакта с target
///
/// Иммунный target урон не получает (не спамим событиями каждый тик
/// непрерывного контакта).
pub fn detect_target_contact(
    agents: Query<(Entity, &AgentConfig, &AgentTarget, &Transform)>,
    targets: Query<(&Transform, &TrackedTarget, Option<&Vulnerability>), Without<AgentConfig>>,
    mut contact_events: EventWriter<ContactDamage>,
) {
    for (entity, config, target, transform) in agents.iter() {
        let Some(target_entity) = target.0 else {
            continue;
        };
        let Ok((target_transform, tracked, vulnerability)) = targets.get(target_entity) else {
            continue;
        };

        if vulnerability.is_some_and(|v| v.is_immune()) {
            continue;
        }

        let distance = transform.translation.distance(target_transform.translation);
        if distance <= config.contact_radius + tracked.contact_radius {
            contact_events.write(ContactDamage {
                agent: entity,
                target: target_entity,
                source_position: transform.translation,
            });
        }
    }
}
