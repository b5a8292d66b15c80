//! Waypoint route (упорядоченная последовательность точек)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::ProviderError;

/// Точки ближе этого считаются дубликатами при добавлении
const DUPLICATE_EPSILON: f32 = 1e-4;

/// Маршрут патруля (level-scoped entity, агенты держат handle)
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct WaypointRoute {
    pub points: Vec<Vec3>,
}

impl WaypointRoute {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point_at(&self, index: usize) -> Result<Vec3, ProviderError> {
        if self.points.is_empty() {
            return Err(ProviderError::EmptyRoute);
        }

        self.points
            .get(index)
            .copied()
            .ok_or(ProviderError::WaypointOutOfRange {
                index,
                count: self.points.len(),
            })
    }

    /// Следующий индекс после прибытия на `index`
    ///
    /// Loop: `(index + 1) % count`. Без loop: clamp на последнем.
    /// Курсор после того, как маршрут укоротили: loop заворачивает, иначе последняя точка
    pub fn resume_index(&self, index: usize, looped: bool) -> usize {
        let count = self.points.len();
        if count == 0 || index < count {
            return index;
        }

        if looped {
            index % count
        } else {
            count - 1
        }
    }

    pub fn next_index(&self, index: usize, looped: bool) -> usize {
        let count = self.points.len();
        if count == 0 {
            return 0;
        }

        if looped {
            (index + 1) % count
        } else {
            (index + 1).min(count - 1)
        }
    }

    /// Добавить точку в конец (дубликат игнорируется). true = добавлена
    pub fn push(&mut self, point: Vec3) -> bool {
        if self
            .points
            .iter()
            .any(|p| p.distance(point) <= DUPLICATE_EPSILON)
        {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Удалить точку по индексу (out-of-range → None, маршрут не меняется)
    pub fn remove(&mut self, index: usize) -> Option<Vec3> {
        if index < self.points.len() {
            Some(self.points.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
