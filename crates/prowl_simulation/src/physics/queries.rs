//! Ray queries в живом мире
//!
//! В Rapier режиме коллайдеры уровня уже живут в rapier мире, поэтому
//! perception, ground projection и ground probe спрашивают его query pipeline.
//! Headless режим (и Rapier до создания контекста) читает `LevelGeometry`.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{QueryFilter, RapierContext, ReadRapierContext};

use super::geometry::{LevelGeometry, RayCaster, RayHit};
use super::layers::{query_groups, CollisionMask};
use super::PhysicsMode;

/// RayCaster поверх rapier query pipeline
pub struct RapierRays<'a> {
    context: RapierContext<'a>,
}

impl<'a> RapierRays<'a> {
    pub fn new(context: RapierContext<'a>) -> Self {
        Self { context }
    }
}

impl RayCaster for RapierRays<'_> {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        let filter = QueryFilter::new().groups(query_groups(mask));

        // solid: origin внутри коллайдера → hit на 0 (как у LevelGeometry)
        self.context
            .cast_ray_and_get_normal(origin, direction, max_distance, true, filter)
            .map(|(_, hit)| RayHit {
                point: hit.point,
                distance: hit.time_of_impact,
                normal: hit.normal,
            })
    }
}

/// Мир, который спрашивают AI системы за этот тик
pub enum WorldRays<'a> {
    Level(&'a LevelGeometry),
    Rapier(RapierRays<'a>),
}

impl<'a> WorldRays<'a> {
    pub fn select(mode: PhysicsMode, geometry: &'a LevelGeometry, rapier: &'a ReadRapierContext) -> Self {
        if mode != PhysicsMode::Rapier {
            return WorldRays::Level(geometry);
        }

        match rapier.single() {
            Ok(context) => WorldRays::Rapier(RapierRays::new(context)),
            // Контекст создаётся в PreStartup; до этого есть только геометрия уровня
            Err(_) => WorldRays::Level(geometry),
        }
    }
}

impl RayCaster for WorldRays<'_> {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit> {
        match self {
            WorldRays::Level(geometry) => geometry.cast_ray(origin, direction, max_distance, mask),
            WorldRays::Rapier(rays) => rays.cast_ray(origin, direction, max_distance, mask),
        }
    }
}
