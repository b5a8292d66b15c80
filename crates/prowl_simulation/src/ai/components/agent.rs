//! Agent components (config, brain, tracked target handle).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::physics::{CollisionMask, MotorSettings};

/// Минимальная ширина hysteresis band после починки конфига
const HYSTERESIS_REPAIR_MARGIN: f32 = 1.0;

/// Скорость погони
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaseSpeed {
    /// Фиксированная скорость (m/s)
    Absolute(f32),
    /// Доля текущей скорости target (читается каждую оценку, не кэшируется)
    TargetFraction(f32),
}

impl ChaseSpeed {
    /// `None`: доля от скорости target, а target свою скорость не сообщает
    pub fn resolve(&self, target_speed: Option<f32>) -> Option<f32> {
        match *self {
            ChaseSpeed::Absolute(speed) => Some(speed),
            ChaseSpeed::TargetFraction(fraction) => target_speed.map(|speed| speed * fraction),
        }
    }
}

impl Default for ChaseSpeed {
    fn default() -> Self {
        ChaseSpeed::Absolute(5.0)
    }
}

/// Параметры агента (неизменны после спавна)
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct AgentConfig {
    /// Базовая скорость вне погони (m/s)
    pub move_speed: f32,
    pub chase_speed: ChaseSpeed,
    /// Скорость поворота (градусы/сек)
    pub rotation_speed: f32,
    pub detection_radius: f32,
    /// Вход в Chase: distance ≤ chase_entry_radius
    pub chase_entry_radius: f32,
    /// Выход из Chase: distance > lose_interest_radius (строго больше entry)
    pub lose_interest_radius: f32,
    pub gravity: f32,
    pub grounded_bias: f32,
    /// Горизонтальная дистанция "дошёл до точки"
    pub arrival_tolerance: f32,
    /// Радиус контакта с target (урон)
    pub contact_radius: f32,
    /// Высота глаз над ногами (perception ray)
    pub eye_height: f32,
    /// Что блокирует line-of-sight
    pub obstacle_mask: CollisionMask,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            chase_speed: ChaseSpeed::default(),
            rotation_speed: 120.0,
            detection_radius: 5.0,
            chase_entry_radius: 8.0,
            lose_interest_radius: 15.0,
            gravity: 20.0,
            grounded_bias: -0.5,
            arrival_tolerance: 0.5,
            contact_radius: 0.6,
            eye_height: 1.0,
            obstacle_mask: CollisionMask::ENVIRONMENT,
        }
    }
}

impl AgentConfig {
    /// Чинит схлопнутый hysteresis band (lose ≤ entry)
    ///
    /// Возвращает конфиг и флаг "был починен" (для warning в логе).
    pub fn sanitized(mut self) -> (Self, bool) {
        let collapsed = self.lose_interest_radius <= self.chase_entry_radius;
        if collapsed {
            self.lose_interest_radius = self.chase_entry_radius + HYSTERESIS_REPAIR_MARGIN;
        }
        (self, collapsed)
    }

    /// Дальность perception для входа в погоню
    ///
    /// Детекция работает хотя бы до chase_entry_radius, иначе entry radius
    /// больше detection был бы недостижим.
    pub fn entry_sight_range(&self) -> f32 {
        self.detection_radius.max(self.chase_entry_radius)
    }

    /// Дальность perception для удержания погони
    pub fn keep_sight_range(&self) -> f32 {
        self.detection_radius.max(self.lose_interest_radius)
    }

    pub fn motor_settings(&self) -> MotorSettings {
        MotorSettings {
            rotation_speed: self.rotation_speed,
            gravity: self.gravity,
            grounded_bias: self.grounded_bias,
            ..default()
        }
    }
}

/// Дискретное состояние агента (ровно одно активно)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Idle,
    Patrol,
    Chase,
    Wander,
}

/// Runtime состояние агента
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AgentBrain {
    pub state: AgentState,
    /// Скорость в силе (всегда соответствует активному состоянию)
    pub move_speed: f32,
    /// Куда вернуться при выходе из Chase
    pub chase_return: AgentState,
    /// Текущая точка назначения (None → стоим)
    pub destination: Option<Vec3>,
    /// Последняя оценка perception
    pub target_visible: bool,
    pub target_distance: Option<f32>,
    /// Дефект "fraction chase speed без скорости target" уже залогирован
    pub speed_fault_reported: bool,
}

impl AgentBrain {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            state: AgentState::Idle,
            move_speed: config.move_speed,
            chase_return: AgentState::Idle,
            destination: None,
            target_visible: false,
            target_distance: None,
            speed_fault_reported: false,
        }
    }
}

impl Default for AgentBrain {
    fn default() -> Self {
        Self::new(&AgentConfig::default())
    }
}

/// Handle на tracked target (инжектится при спавне)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AgentTarget(pub Option<Entity>);
