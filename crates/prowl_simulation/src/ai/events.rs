//! AI events: переходы состояний и контакт с target

use bevy::prelude::*;

use super::components::AgentState;

/// Агент сменил состояние (пишется в EvaluateState)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentStateChanged {
    pub agent: Entity,
    pub from: AgentState,
    pub to: AgentState,
}

/// Агент коснулся target (гейтится иммунитетом target)
///
/// `source_position`, позиция агента, от неё считается направление knockback.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ContactDamage {
    pub agent: Entity,
    pub target: Entity,
    pub source_position: Vec3,
}
