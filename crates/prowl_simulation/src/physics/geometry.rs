//! Ray query service для статической геометрии уровня
//!
//! Единый примитив "cast ray → nearest hit на маске" используется:
//! - perception (line-of-sight: есть ли препятствие между агентом и target)
//! - target providers (проекция случайной точки на землю)
//! - dynamic body backend (ground probe от ног)
//!
//! Реализации:
//! - `LevelGeometry`: AABB боксы (slab test), headless режим и unit тесты
//! - `RapierRays` (см. `physics::queries`): query pipeline живого rapier мира

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::layers::CollisionMask;

/// С какой высоты над точкой начинается ground probe
pub const GROUND_PROBE_HEIGHT: f32 = 10.0;

/// Максимальная длина ground probe (вниз от стартовой точки)
pub const GROUND_PROBE_DISTANCE: f32 = 20.0;

const PARALLEL_EPSILON: f32 = 1e-6;

/// Результат ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    /// Расстояние от origin вдоль нормализованного direction
    pub distance: f32,
    pub normal: Vec3,
}

/// Сервис ray queries
///
/// Всё, что агент знает о мире (кроме transform'ов), идёт через этот trait,
/// поэтому perception и providers тестируются без живого physics world.
pub trait RayCaster {
    /// Ближайшее пересечение луча с геометрией на `mask`
    ///
    /// `direction` не обязан быть нормализован; нулевой direction → `None`.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit>;

    /// Проекция точки на землю под ней (или `None`, если земли нет в пределах probe)
    fn probe_ground(&self, point: Vec3, mask: CollisionMask) -> Option<Vec3> {
        self.cast_ray(
            point + Vec3::Y * GROUND_PROBE_HEIGHT,
            Vec3::NEG_Y,
            GROUND_PROBE_DISTANCE,
            mask,
        )
        .map(|hit| hit.point)
    }
}

/// Axis-aligned бокс статической геометрии
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Reflect)]
pub struct GeometryBox {
    pub min: Vec3,
    pub max: Vec3,
    #[serde(default)]
    pub layer: CollisionMask,
}

impl GeometryBox {
    pub fn new(min: Vec3, max: Vec3, layer: CollisionMask) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            layer,
        }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3, layer: CollisionMask) -> Self {
        let half = half_extents.abs();
        Self::new(center - half, center + half, layer)
    }

    /// Плита пола: верхняя грань на `top_y`, толщина 1м
    pub fn ground_slab(center_xz: Vec2, half_xz: Vec2, top_y: f32) -> Self {
        Self::new(
            Vec3::new(center_xz.x - half_xz.x, top_y - 1.0, center_xz.y - half_xz.y),
            Vec3::new(center_xz.x + half_xz.x, top_y, center_xz.y + half_xz.y),
            CollisionMask::GROUND,
        )
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Slab test. `direction`, нормализованный.
    ///
    /// Origin внутри бокса → hit на расстоянии 0 (луч заблокирован сразу).
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        if self.contains(origin) {
            return Some(RayHit {
                point: origin,
                distance: 0.0,
                normal: -direction,
            });
        }

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < PARALLEL_EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let (mut t_near, mut t_far) = ((lo - o) / d, (hi - o) / d);
            let mut normal = Vec3::ZERO;
            normal[axis] = -d.signum();
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }

            if t_near > t_enter {
                t_enter = t_near;
                enter_normal = normal;
            }
            t_exit = t_exit.min(t_far);

            if t_enter > t_exit {
                return None;
            }
        }

        if t_enter < 0.0 || t_enter > max_distance {
            return None;
        }

        Some(RayHit {
            point: origin + direction * t_enter,
            distance: t_enter,
            normal: enter_normal,
        })
    }
}

/// Статическая геометрия уровня (resource)
///
/// Заполняется при загрузке уровня и дальше только читается агентами.
#[derive(Resource, Debug, Clone, Default)]
pub struct LevelGeometry {
    pub boxes: Vec<GeometryBox>,
}

impl LevelGeometry {
    pub fn new(boxes: Vec<GeometryBox>) -> Self {
        Self { boxes }
    }

    /// Бесконечный (практически) плоский пол на высоте `y`
    pub fn flat_ground(y: f32) -> Self {
        Self::new(vec![GeometryBox::ground_slab(
            Vec2::ZERO,
            Vec2::splat(10_000.0),
            y,
        )])
    }

    pub fn with_box(mut self, geometry_box: GeometryBox) -> Self {
        self.boxes.push(geometry_box);
        self
    }

    pub fn push(&mut self, geometry_box: GeometryBox) {
        self.boxes.push(geometry_box);
    }
}

impl RayCaster for LevelGeometry {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;

        self.boxes
            .iter()
            .filter(|b| b.layer.intersects(mask))
            .filter_map(|b| b.intersect_ray(origin, direction, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Пустой мир: луч никогда ни во что не попадает
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySpace;

impl RayCaster for EmptySpace {
    fn cast_ray(&self, _: Vec3, _: Vec3, _: f32, _: CollisionMask) -> Option<RayHit> {
        None
    }
}
