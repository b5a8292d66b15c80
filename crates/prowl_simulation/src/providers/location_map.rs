//! Location map: именованные круглые зоны

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{sample_in_disk, ProviderError};
use crate::physics::{CollisionMask, RayCaster};

/// Круглая зона патруля / блуждания
#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
pub struct PatrolArea {
    pub name: String,
    pub center: Vec3,
    pub radius: f32,
}

impl PatrolArea {
    pub fn new(name: impl Into<String>, center: Vec3, radius: f32) -> Self {
        Self {
            name: name.into(),
            center,
            radius: radius.max(0.0),
        }
    }

    /// Точка внутри зоны в горизонтальной плоскости
    pub fn contains_horizontal(&self, point: Vec3) -> bool {
        let offset = Vec2::new(point.x - self.center.x, point.z - self.center.z);
        offset.length() <= self.radius + 1e-4
    }
}

/// Ссылка на зону: по имени или по индексу
///
/// В JSON: строка → имя, число → индекс.
#[derive(Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AreaRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for AreaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaRef::Index(index) => write!(f, "#{}", index),
            AreaRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl From<usize> for AreaRef {
    fn from(index: usize) -> Self {
        AreaRef::Index(index)
    }
}

impl From<&str> for AreaRef {
    fn from(name: &str) -> Self {
        AreaRef::Name(name.to_string())
    }
}

/// Набор зон уровня (level-scoped entity)
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct LocationMap {
    pub areas: Vec<PatrolArea>,
    /// Маска земли для проекции случайной точки
    #[serde(default = "default_ground_mask")]
    pub ground_mask: CollisionMask,
}

fn default_ground_mask() -> CollisionMask {
    CollisionMask::GROUND
}

impl LocationMap {
    pub fn new(areas: Vec<PatrolArea>) -> Self {
        Self {
            areas,
            ground_mask: default_ground_mask(),
        }
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    pub fn area_at(&self, index: usize) -> Result<&PatrolArea, ProviderError> {
        self.areas.get(index).ok_or(ProviderError::AreaOutOfRange {
            index,
            count: self.areas.len(),
        })
    }

    pub fn area_by_name(&self, name: &str) -> Option<&PatrolArea> {
        self.areas.iter().find(|area| area.name == name)
    }

    pub fn resolve(&self, area: &AreaRef) -> Result<&PatrolArea, ProviderError> {
        match area {
            AreaRef::Index(index) => self.area_at(*index),
            AreaRef::Name(name) => self
                .area_by_name(name)
                .ok_or_else(|| ProviderError::UnknownArea(name.clone())),
        }
    }

    /// Добавить зону. Зона с тем же именем заменяется. Возвращает индекс.
    pub fn add_area(&mut self, area: PatrolArea) -> usize {
        if let Some(index) = self.areas.iter().position(|a| a.name == area.name) {
            self.areas[index] = area;
            return index;
        }
        self.areas.push(area);
        self.areas.len() - 1
    }

    /// Случайная точка внутри зоны, спроецированная на землю
    ///
    /// Земли под точкой нет (в пределах probe) → точка из диска как есть.
    pub fn random_point_in<R: Rng + ?Sized>(
        &self,
        area: &AreaRef,
        rng: &mut R,
        rays: &impl RayCaster,
    ) -> Result<Vec3, ProviderError> {
        let area = self.resolve(area)?;
        let point = sample_in_disk(rng, area.center, area.radius);
        Ok(rays.probe_ground(point, self.ground_mask).unwrap_or(point))
    }
}
