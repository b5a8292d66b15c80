//! Physics layer: ray queries, collision layers, locomotion backends
//!
//! Два режима (`PhysicsMode`):
//! - Headless: наш интегратор поверх `LevelGeometry` (тесты, headless runner)
//! - Rapier: `RapierPhysicsPlugin`, resolver пишет в character controller / velocity

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::SimulationSet;

pub mod geometry;
pub mod layers;
pub mod locomotion;
pub mod queries;

#[cfg(test)]
mod locomotion_tests;

pub use geometry::{EmptySpace, GeometryBox, LevelGeometry, RayCaster, RayHit};
pub use layers::CollisionMask;
pub use locomotion::{
    insert_locomotion, move_toward, Locomotion, LocomotionCommand, LocomotionIntent, Motor,
    MotorSettings,
};
pub use queries::{RapierRays, WorldRays};

/// Кто применяет команды locomotion к миру
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicsMode {
    #[default]
    Headless,
    Rapier,
}

/// Plugin locomotion
///
/// Системы в `SimulationSet::Locomotion` (после ExecuteBehavior):
/// - Headless: integrate_headless_locomotion
/// - Rapier: read_rapier_controller_output → write_rapier_locomotion → шаг rapier
///   (`PhysicsSet`) → Contact
pub struct LocomotionPlugin {
    pub mode: PhysicsMode,
}

impl Plugin for LocomotionPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.mode)
            .init_resource::<LevelGeometry>()
            .register_type::<Locomotion>()
            .register_type::<Motor>()
            .register_type::<MotorSettings>()
            .register_type::<LocomotionIntent>();

        match self.mode {
            PhysicsMode::Headless => {
                app.add_systems(
                    FixedUpdate,
                    locomotion::integrate_headless_locomotion.in_set(SimulationSet::Locomotion),
                );
            }
            PhysicsMode::Rapier => {
                if !app.is_plugin_added::<bevy::transform::TransformPlugin>() {
                    app.add_plugins(bevy::transform::TransformPlugin);
                }
                // Шаг rapier = фиксированный тик (до плагина: он проверяет режим в build)
                app.insert_resource(TimestepMode::Fixed {
                    dt: crate::fixed_timestep().as_secs_f32(),
                    substeps: 1,
                })
                    .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
                    // Поворот и команды resolver'а должны попасть в rapier в этом же тике,
                    // иначе writeback перезапишет Transform. Контакт смотрит на позиции после шага.
                    .configure_sets(
                        FixedUpdate,
                        (
                            SimulationSet::Locomotion.before(PhysicsSet::SyncBackend),
                            SimulationSet::Contact.after(PhysicsSet::Writeback),
                        ),
                    )
                    // grounded от контроллера (прошлый шаг) нужен resolver'у ДО оценки поведения
                    .add_systems(
                        FixedUpdate,
                        locomotion::read_rapier_controller_output.before(SimulationSet::EvaluateState),
                    )
                    .add_systems(
                        FixedUpdate,
                        locomotion::write_rapier_locomotion.in_set(SimulationSet::Locomotion),
                    );
            }
        }
    }
}
