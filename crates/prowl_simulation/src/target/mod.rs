//! Tracked target (внешний коллаборатор агентов)
//!
//! Минимальная реализация на границе интерфейса: позиция, скорость для
//! fraction chase speed, иммунитет с миганием, knockback и счётчик жизней.
//! Game-over логика дальше событий `TargetDefeated` не идёт.

use bevy::prelude::*;

pub mod components;
pub mod systems;

pub use components::{
    receive_contact, ContactOutcome, Knockback, LifeLedger, TrackedTarget, Vulnerability,
};

use crate::SimulationSet;

/// Target потерял жизнь (remaining = 0 при поражении)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLifeLost {
    pub target: Entity,
    pub remaining: u32,
}

/// Жизни закончились
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDefeated {
    pub target: Entity,
}

/// Target Plugin
///
/// Системы в `SimulationSet::Target` (после Contact), последовательно:
/// 1. apply_contact_damage
/// 2. tick_vulnerability
/// 3. apply_knockback
pub struct TargetPlugin;

impl Plugin for TargetPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<TargetLifeLost>()
            .add_event::<TargetDefeated>()
            .register_type::<TrackedTarget>()
            .register_type::<Vulnerability>()
            .register_type::<Knockback>()
            .register_type::<LifeLedger>()
            .add_systems(
                FixedUpdate,
                (
                    systems::apply_contact_damage,
                    systems::tick_vulnerability,
                    systems::apply_knockback,
                )
                    .chain()
                    .in_set(SimulationSet::Target),
            );
    }
}

/// Спавн target со всеми компонентами реакции на урон
pub fn spawn_target(commands: &mut Commands, position: Vec3, tracked: TrackedTarget) -> Entity {
    let id = commands
        .spawn((
            Name::new("Target"),
            Transform::from_translation(position),
            tracked,
            Vulnerability::default(),
            Knockback::default(),
            LifeLedger::default(),
        ))
        .id();

    crate::log(&format!("Target: spawned {:?} at {:?}", id, position));
    id
}
