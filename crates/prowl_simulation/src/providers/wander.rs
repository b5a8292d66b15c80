//! Self-centered wander circle (без внешних данных)

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::sample_in_disk;
use crate::physics::{CollisionMask, RayCaster};

/// Радиус по умолчанию, когда location map не сконфигурирована
pub const DEFAULT_WANDER_RADIUS: f32 = 10.0;

/// Круг блуждания вокруг точки спавна
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct WanderCircle {
    pub center: Vec3,
    pub radius: f32,
}

impl WanderCircle {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn random_point<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        rays: &impl RayCaster,
        ground_mask: CollisionMask,
    ) -> Vec3 {
        let point = sample_in_disk(rng, self.center, self.radius);
        rays.probe_ground(point, ground_mask).unwrap_or(point)
    }
}

impl Default for WanderCircle {
    fn default() -> Self {
        Self::new(Vec3::ZERO, DEFAULT_WANDER_RADIUS)
    }
}
