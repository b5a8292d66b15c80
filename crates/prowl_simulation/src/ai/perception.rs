//! Perception: range + line-of-sight
//!
//! Вызывается каждый тик заново: occlusion меняется непрерывно, кэша нет.

use bevy::prelude::*;

use crate::ai::components::{AgentConfig, Sight};
use crate::physics::{CollisionMask, RayCaster};

/// Видит ли агент target в пределах `range`
///
/// 1. target отсутствует → false
/// 2. distance > range → false (дешёвый reject, без луча)
/// 3. луч от глаз агента к глазам target длиной distance: любое препятствие
///    на `obstacle_mask` раньше target → false
pub fn can_see_target(
    agent: Vec3,
    target: Option<Vec3>,
    range: f32,
    eye_height: f32,
    obstacle_mask: CollisionMask,
    rays: &impl RayCaster,
) -> bool {
    let Some(target) = target else {
        return false;
    };

    let distance = agent.distance(target);
    if distance > range {
        return false;
    }

    let eye = agent + Vec3::Y * eye_height;
    let target_eye = target + Vec3::Y * eye_height;
    let to_target = target_eye - eye;

    // Target в той же точке, смотреть не через что
    if to_target.length_squared() <= f32::EPSILON {
        return true;
    }

    rays.cast_ray(eye, to_target, to_target.length(), obstacle_mask)
        .is_none()
}

/// Perception с радиусом детекции агента
pub fn agent_can_see(config: &AgentConfig, agent: Vec3, target: Option<Vec3>, rays: &impl RayCaster) -> bool {
    can_see_target(
        agent,
        target,
        config.detection_radius,
        config.eye_height,
        config.obstacle_mask,
        rays,
    )
}

/// Полная оценка perception за тик (entry и keep дальности)
pub fn perceive(
    config: &AgentConfig,
    agent: Vec3,
    target: Option<Vec3>,
    target_speed: Option<f32>,
    rays: &impl RayCaster,
) -> Sight {
    let see = |range: f32| {
        can_see_target(agent, target, range, config.eye_height, config.obstacle_mask, rays)
    };

    Sight {
        distance: target.map(|t| agent.distance(t)),
        visible_for_entry: see(config.entry_sight_range()),
        visible_for_keep: see(config.keep_sight_range()),
        target_speed,
        target_position: target,
    }
}
