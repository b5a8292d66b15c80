//! Target providers: откуда patrol/wander берут destination
//!
//! Три источника (выбираются при конфигурации, не смешиваются):
//! - `WaypointRoute`: упорядоченные точки (loop или clamp)
//! - `LocationMap`: именованные круглые зоны + random point внутри
//! - `WanderCircle`: круг вокруг точки спавна агента
//!
//! Provider'ы read-only для агента: курсор живёт в `Behavior` агента.

use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

pub mod location_map;
pub mod waypoints;
pub mod wander;


pub use location_map::{AreaRef, LocationMap, PatrolArea};
pub use waypoints::WaypointRoute;
pub use wander::WanderCircle;

/// Ошибки конфигурации provider'ов
///
/// Ни одна не фатальна: state machine логирует и деградирует.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("waypoint route is empty")]
    EmptyRoute,

    #[error("waypoint index {index} out of range (route has {count} points)")]
    WaypointOutOfRange { index: usize, count: usize },

    #[error("area index {index} out of range (map has {count} areas)")]
    AreaOutOfRange { index: usize, count: usize },

    #[error("unknown area '{0}'")]
    UnknownArea(String),

    #[error("target provider {0:?} is missing")]
    MissingProvider(Option<Entity>),
}

/// Равномерная точка внутри горизонтального диска (без проекции на землю)
///
/// r = R * sqrt(u): плотность точек одинакова по всей площади диска.
pub fn sample_in_disk<R: Rng + ?Sized>(rng: &mut R, center: Vec3, radius: f32) -> Vec3 {
    let radius = radius.max(0.0);
    let r = radius * rng.gen::<f32>().sqrt();
    let theta = rng.gen::<f32>() * TAU;

    center + Vec3::new(r * theta.cos(), 0.0, r * theta.sin())
}
