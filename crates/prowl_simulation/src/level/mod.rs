//! Level data: геометрия, provider'ы, target и агенты
//!
//! Формат: JSON (serde). Level-scoped объекты (routes, location maps)
//! спавнятся отдельными entity, агенты получают их handles при спавне.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, RigidBody};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ai::{spawn_agent, AgentConfig, AgentSpawn, Behavior, PatrolBehavior, WanderBehavior};
use crate::physics::layers::environment_groups;
use crate::physics::{CollisionMask, GeometryBox, LevelGeometry, Locomotion, PhysicsMode};
use crate::providers::{AreaRef, LocationMap, PatrolArea, WaypointRoute};
use crate::target::{spawn_target, TrackedTarget};

/// Ошибки загрузки уровня
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse level data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("agent #{agent} references unknown route '{name}'")]
    UnknownRoute { agent: usize, name: String },

    #[error("agent #{agent} references unknown location map '{name}'")]
    UnknownLocationMap { agent: usize, name: String },
}

/// Бокс в JSON: центр + половины размеров
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxData {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl BoxData {
    fn to_geometry(self, layer: CollisionMask) -> GeometryBox {
        GeometryBox::from_center(self.center, self.half_extents, layer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteData {
    pub name: String,
    pub points: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMapData {
    pub name: String,
    pub areas: Vec<PatrolArea>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetData {
    pub position: Vec3,
    #[serde(default)]
    pub tracked: TrackedTarget,
}

fn default_true() -> bool {
    true
}

fn default_dwell_time() -> f32 {
    5.0
}

fn default_wander_radius() -> f32 {
    crate::providers::wander::DEFAULT_WANDER_RADIUS
}

fn default_min_interval() -> f32 {
    2.0
}

fn default_max_interval() -> f32 {
    5.0
}

/// Вариант поведения в JSON (provider'ы по имени)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviorData {
    Chaser,
    Patroller {
        route: Option<String>,
        #[serde(default = "default_true")]
        looped: bool,
    },
    AreaPatroller {
        map: Option<String>,
        #[serde(default)]
        areas: Vec<AreaRef>,
        #[serde(default = "default_dwell_time")]
        dwell_time: f32,
    },
    Wanderer {
        #[serde(default)]
        map: Option<String>,
        #[serde(default)]
        area: Option<AreaRef>,
        #[serde(default = "default_wander_radius")]
        radius: f32,
        #[serde(default = "default_min_interval")]
        min_interval: f32,
        #[serde(default = "default_max_interval")]
        max_interval: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub position: Vec3,
    pub behavior: BehaviorData,
    #[serde(default)]
    pub config: AgentConfig,
    #[serde(default)]
    pub locomotion: Locomotion,
}

/// Описание уровня
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelData {
    pub name: String,
    pub ground: Vec<BoxData>,
    pub obstacles: Vec<BoxData>,
    pub routes: Vec<RouteData>,
    pub location_maps: Vec<LocationMapData>,
    pub target: Option<TargetData>,
    pub agents: Vec<AgentData>,
}

/// Что заспавнил `spawn_level`
#[derive(Debug, Clone, Default)]
pub struct SpawnedLevel {
    pub target: Option<Entity>,
    pub agents: Vec<Entity>,
    pub routes: HashMap<String, Entity>,
    pub location_maps: HashMap<String, Entity>,
}

impl LevelData {
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let level = Self::from_json(&json)?;

        crate::log_info(&format!(
            "Level: loaded '{}' from {} ({} agents)",
            level.name,
            path.display(),
            level.agents.len()
        ));
        Ok(level)
    }

    /// Статическая геометрия для ray queries
    pub fn geometry(&self) -> LevelGeometry {
        let ground = self.ground.iter().map(|b| b.to_geometry(CollisionMask::GROUND));
        let obstacles = self
            .obstacles
            .iter()
            .map(|b| b.to_geometry(CollisionMask::OBSTACLE));
        LevelGeometry::new(ground.chain(obstacles).collect())
    }

    /// Ссылки агентов на несуществующие provider'ы
    ///
    /// Это дефект конфигурации, не фатальная ошибка: агент спавнится без
    /// provider'а и деградирует.
    pub fn unresolved_providers(&self) -> Vec<LevelError> {
        let has_route = |name: &str| self.routes.iter().any(|r| r.name == name);
        let has_map = |name: &str| self.location_maps.iter().any(|m| m.name == name);

        let mut errors = Vec::new();
        for (index, agent) in self.agents.iter().enumerate() {
            match &agent.behavior {
                BehaviorData::Patroller {
                    route: Some(name), ..
                } if !has_route(name) => errors.push(LevelError::UnknownRoute {
                    agent: index,
                    name: name.clone(),
                }),
                BehaviorData::AreaPatroller { map: Some(name), .. }
                | BehaviorData::Wanderer { map: Some(name), .. }
                    if !has_map(name) =>
                {
                    errors.push(LevelError::UnknownLocationMap {
                        agent: index,
                        name: name.clone(),
                    })
                }
                _ => {}
            }
        }
        errors
    }

    /// Демо-уровень: двор со стеной, маршрут, две зоны, по агенту каждого варианта
    pub fn demo() -> Self {
        Self {
            name: "courtyard".to_string(),
            ground: vec![BoxData {
                center: Vec3::new(0.0, -0.5, 0.0),
                half_extents: Vec3::new(50.0, 0.5, 50.0),
            }],
            obstacles: vec![BoxData {
                center: Vec3::new(0.0, 1.5, -6.0),
                half_extents: Vec3::new(4.0, 1.5, 0.25),
            }],
            routes: vec![RouteData {
                name: "perimeter".to_string(),
                points: vec![
                    Vec3::new(-15.0, 0.0, -15.0),
                    Vec3::new(15.0, 0.0, -15.0),
                    Vec3::new(15.0, 0.0, 15.0),
                    Vec3::new(-15.0, 0.0, 15.0),
                ],
            }],
            location_maps: vec![LocationMapData {
                name: "yards".to_string(),
                areas: vec![
                    PatrolArea::new("north", Vec3::new(0.0, 0.0, -25.0), 5.0),
                    PatrolArea::new("east", Vec3::new(25.0, 0.0, 0.0), 4.0),
                ],
            }],
            target: Some(TargetData {
                position: Vec3::new(0.0, 0.0, 20.0),
                tracked: TrackedTarget::default(),
            }),
            agents: vec![
                AgentData {
                    position: Vec3::new(0.0, 0.0, -10.0),
                    behavior: BehaviorData::Chaser,
                    config: AgentConfig::default(),
                    locomotion: Locomotion::KinematicCapsule,
                },
                AgentData {
                    position: Vec3::new(-15.0, 0.0, -15.0),
                    behavior: BehaviorData::Patroller {
                        route: Some("perimeter".to_string()),
                        looped: true,
                    },
                    config: AgentConfig::default(),
                    locomotion: Locomotion::DynamicBody,
                },
                AgentData {
                    position: Vec3::new(20.0, 0.0, 0.0),
                    behavior: BehaviorData::AreaPatroller {
                        map: Some("yards".to_string()),
                        areas: Vec::new(),
                        dwell_time: default_dwell_time(),
                    },
                    config: AgentConfig::default(),
                    locomotion: Locomotion::KinematicCapsule,
                },
                AgentData {
                    position: Vec3::new(-20.0, 0.0, 10.0),
                    behavior: BehaviorData::Wanderer {
                        map: None,
                        area: None,
                        radius: default_wander_radius(),
                        min_interval: default_min_interval(),
                        max_interval: default_max_interval(),
                    },
                    config: AgentConfig::default(),
                    locomotion: Locomotion::TransformOnly,
                },
            ],
        }
    }
}

/// Спавн уровня: геометрия → provider'ы → target → агенты
///
/// В rapier режиме боксы дополнительно получают fixed коллайдеры.
pub fn spawn_level(commands: &mut Commands, level: &LevelData, physics: PhysicsMode) -> SpawnedLevel {
    let geometry = level.geometry();

    if physics == PhysicsMode::Rapier {
        for geometry_box in &geometry.boxes {
            let half = geometry_box.half_extents();
            commands.spawn((
                Transform::from_translation(geometry_box.center()),
                RigidBody::Fixed,
                Collider::cuboid(half.x, half.y, half.z),
                environment_groups(geometry_box.layer),
            ));
        }
    }
    commands.insert_resource(geometry);

    let mut spawned = SpawnedLevel::default();

    for route in &level.routes {
        let entity = commands
            .spawn((Name::new(route.name.clone()), WaypointRoute::new(route.points.clone())))
            .id();
        spawned.routes.insert(route.name.clone(), entity);
    }

    for map in &level.location_maps {
        let entity = commands
            .spawn((Name::new(map.name.clone()), LocationMap::new(map.areas.clone())))
            .id();
        spawned.location_maps.insert(map.name.clone(), entity);
    }

    for error in level.unresolved_providers() {
        crate::log_warning(&format!("Level: {}", error));
    }

    spawned.target = level
        .target
        .as_ref()
        .map(|target| spawn_target(commands, target.position, target.tracked));

    for agent in &level.agents {
        let behavior = resolve_behavior(agent, &spawned);
        let mut spawn = AgentSpawn::new(agent.position, behavior)
            .with_config(agent.config.clone())
            .with_locomotion(agent.locomotion);
        if let Some(target) = spawned.target {
            spawn = spawn.with_target(target);
        }
        spawned.agents.push(spawn_agent(commands, spawn));
    }

    crate::log_info(&format!(
        "Level: spawned '{}' ({} agents, {} routes, {} location maps)",
        level.name,
        spawned.agents.len(),
        spawned.routes.len(),
        spawned.location_maps.len()
    ));
    spawned
}

fn resolve_behavior(agent: &AgentData, spawned: &SpawnedLevel) -> Behavior {
    let lookup = |table: &HashMap<String, Entity>, name: &Option<String>| {
        name.as_ref().and_then(|n| table.get(n).copied())
    };

    match &agent.behavior {
        BehaviorData::Chaser => Behavior::Chaser,
        BehaviorData::Patroller { route, looped } => Behavior::Patroller(PatrolBehavior::waypoints(
            lookup(&spawned.routes, route),
            *looped,
        )),
        BehaviorData::AreaPatroller {
            map,
            areas,
            dwell_time,
        } => Behavior::Patroller(PatrolBehavior::areas(
            lookup(&spawned.location_maps, map),
            areas.clone(),
            *dwell_time,
        )),
        BehaviorData::Wanderer {
            map,
            area,
            radius,
            min_interval,
            max_interval,
        } => {
            let mut wander = WanderBehavior::circle(agent.position, *radius, *min_interval, *max_interval);
            wander.map = lookup(&spawned.location_maps, map);
            wander.area = area.clone();
            Behavior::Wanderer(wander)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_courtyard_json_parses() {
        let level = LevelData::from_json(include_str!("../../levels/courtyard.json")).unwrap();

        assert_eq!(level.name, "courtyard");
        assert_eq!(level.agents.len(), 4);
        assert!(level.unresolved_providers().is_empty());
        assert!(matches!(level.agents[1].behavior, BehaviorData::Patroller { looped: true, .. }));
        assert_eq!(level.agents[3].locomotion, Locomotion::TransformOnly);
    }

    #[test]
    fn test_unresolved_provider_names_are_reported() {
        let json = r#"{
            "name": "broken",
            "agents": [
                { "position": [0, 0, 0], "behavior": { "kind": "patroller", "route": "nowhere" } },
                { "position": [1, 0, 0], "behavior": { "kind": "wanderer", "map": "ghost", "area": 0 } }
            ]
        }"#;
        let level = LevelData::from_json(json).unwrap();
        let errors = level.unresolved_providers();

        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], LevelError::UnknownRoute { agent: 0, name } if name == "nowhere"));
        assert!(matches!(&errors[1], LevelError::UnknownLocationMap { agent: 1, .. }));
    }

    #[test]
    fn test_geometry_layers() {
        let geometry = LevelData::demo().geometry();
        assert_eq!(geometry.boxes[0].layer, CollisionMask::GROUND);
        assert_eq!(geometry.boxes[1].layer, CollisionMask::OBSTACLE);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = LevelData::load("/definitely/not/here.json");
        assert!(matches!(result, Err(LevelError::Io { .. })));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(LevelData::from_json("{ nope"), Err(LevelError::Parse(_))));
    }
}
