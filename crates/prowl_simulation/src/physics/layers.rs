//! Collision Layers: битовые маски для ray queries и rapier коллайдеров
//!
//! ## Слои:
//! - Bit 0 (0b001 = 1): Ground (пол, рампы, платформы)
//! - Bit 1 (0b010 = 2): Obstacles (стены, ящики: блокируют line-of-sight)
//! - Bit 2 (0b100 = 4): Actors (агенты + tracked target)
//!
//! Биты совпадают с `bevy_rapier3d::Group::GROUP_1..3`, поэтому одна и та же
//! маска работает и для `LevelGeometry`, и для rapier `CollisionGroups`.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{CollisionGroups, Group};
use serde::{Deserialize, Serialize};

/// Маска слоёв (membership или filter, зависит от контекста)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
#[serde(transparent)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    pub const NONE: Self = Self(0);
    pub const GROUND: Self = Self(0b001);
    pub const OBSTACLE: Self = Self(0b010);
    pub const ACTORS: Self = Self(0b100);

    /// Статическая геометрия уровня: и пол, и стены
    pub const ENVIRONMENT: Self = Self(Self::GROUND.0 | Self::OBSTACLE.0);

    pub const ALL: Self = Self(u32::MAX);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn to_rapier_group(self) -> Group {
        Group::from_bits_truncate(self.0)
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::ENVIRONMENT
    }
}

impl std::ops::BitOr for CollisionMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Агенты: на слое ACTORS, коллайдят с окружением и друг с другом
pub fn actor_groups() -> CollisionGroups {
    CollisionGroups::new(
        CollisionMask::ACTORS.to_rapier_group(),
        CollisionMask::ENVIRONMENT.union(CollisionMask::ACTORS).to_rapier_group(),
    )
}

/// Статическая геометрия уровня с заданным слоем
pub fn environment_groups(layer: CollisionMask) -> CollisionGroups {
    CollisionGroups::new(layer.to_rapier_group(), CollisionMask::ACTORS.to_rapier_group())
}

/// Фильтр ray query от лица агента: попадает только в коллайдеры на `mask`
///
/// Rapier проверяет группы в обе стороны, поэтому membership запроса = ACTORS
/// (окружение фильтрует именно этот слой), filter = искомые слои.
pub fn query_groups(mask: CollisionMask) -> CollisionGroups {
    CollisionGroups::new(CollisionMask::ACTORS.to_rapier_group(), mask.to_rapier_group())
}
