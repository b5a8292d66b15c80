//! Behavior variants: Chaser / Patroller / Wanderer
//!
//! Общая часть (скорости, радиусы, движение) живёт в `AgentConfig` + `AgentBrain`,
//! вариант хранит только свой курсор. Каждый вариант реализует один набор
//! возможностей: `evaluate_state` (переходы) и `evaluate_behavior` (destination).

use bevy::prelude::*;
use rand::Rng;

use super::agent::{AgentBrain, AgentConfig, AgentState};
use crate::physics::{CollisionMask, RayCaster};
use crate::providers::{AreaRef, LocationMap, ProviderError, WanderCircle, WaypointRoute};

/// Результат perception за тик
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sight {
    /// 3D дистанция до target (None → target отсутствует)
    pub distance: Option<f32>,
    /// Видим в пределах entry range
    pub visible_for_entry: bool,
    /// Видим в пределах keep range
    pub visible_for_keep: bool,
    /// Текущая скорость target (для ChaseSpeed::TargetFraction)
    pub target_speed: Option<f32>,
    /// Живая позиция target
    pub target_position: Option<Vec3>,
}

/// Provider'ы, на которые указывает handle агента (уже разрешённые)
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderRefs<'a> {
    pub route: Option<&'a WaypointRoute>,
    pub map: Option<&'a LocationMap>,
}

/// Переход состояния за тик
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AgentState,
    pub to: AgentState,
}

/// Откуда патрульный берёт точки
#[derive(Debug, Clone, PartialEq, Reflect)]
pub enum PatrolSource {
    Waypoints {
        route: Option<Entity>,
        looped: bool,
    },
    Areas {
        map: Option<Entity>,
        /// Пустая последовательность → все зоны карты по порядку
        sequence: Vec<AreaRef>,
        /// Сколько ждать в фазе B (random point) до перехода к следующей зоне
        dwell_time: f32,
    },
}

/// Фаза патруля по зонам
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub enum AreaPhase {
    /// Фаза A: идём в центр зоны
    #[default]
    ToCenter,
    /// Фаза B: идём к случайной точке, пока не дойдём или не истечёт таймер
    Roaming { point: Vec3, timer: f32 },
}

#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct PatrolBehavior {
    pub source: PatrolSource,
    pub waypoint: usize,
    pub area_step: usize,
    pub phase: AreaPhase,
    /// Уже залогированные дефекты (лог раз на дефект, не каждый тик)
    pub faults: Vec<String>,
}

impl PatrolBehavior {
    pub fn waypoints(route: Option<Entity>, looped: bool) -> Self {
        Self::from_source(PatrolSource::Waypoints { route, looped })
    }

    pub fn areas(map: Option<Entity>, sequence: Vec<AreaRef>, dwell_time: f32) -> Self {
        Self::from_source(PatrolSource::Areas {
            map,
            sequence,
            dwell_time,
        })
    }

    fn from_source(source: PatrolSource) -> Self {
        Self {
            source,
            waypoint: 0,
            area_step: 0,
            phase: AreaPhase::ToCenter,
            faults: Vec::new(),
        }
    }

    /// Provider сконфигурирован и не пуст
    pub fn has_provider(&self, providers: &ProviderRefs) -> bool {
        match &self.source {
            PatrolSource::Waypoints { .. } => providers.route.is_some_and(|r| !r.is_empty()),
            PatrolSource::Areas { .. } => providers.map.is_some_and(|m| m.area_count() > 0),
        }
    }

    fn provider_error(&self) -> ProviderError {
        match &self.source {
            PatrolSource::Waypoints { route, .. } => match route {
                Some(_) => ProviderError::EmptyRoute,
                None => ProviderError::MissingProvider(None),
            },
            PatrolSource::Areas { map, .. } => ProviderError::MissingProvider(*map),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn destination<R: Rng + ?Sized>(
        &mut self,
        agent: Entity,
        position: Vec3,
        config: &AgentConfig,
        providers: &ProviderRefs,
        rng: &mut R,
        rays: &impl RayCaster,
        dt: f32,
    ) -> Option<Vec3> {
        let result = match self.source.clone() {
            PatrolSource::Waypoints { looped, .. } => {
                let route = providers.route;
                self.waypoint_destination(position, config, route, looped)
            }
            PatrolSource::Areas {
                sequence,
                dwell_time,
                ..
            } => self.area_destination(position, config, providers.map, &sequence, dwell_time, rng, rays, dt),
        };

        match result {
            Ok(point) => {
                self.faults.clear();
                Some(point)
            }
            Err(error) => {
                report_fault(&mut self.faults, agent, &error);
                None
            }
        }
    }

    fn waypoint_destination(
        &mut self,
        position: Vec3,
        config: &AgentConfig,
        route: Option<&WaypointRoute>,
        looped: bool,
    ) -> Result<Vec3, ProviderError> {
        let route = route.ok_or(ProviderError::MissingProvider(None))?;
        self.waypoint = route.resume_index(self.waypoint, looped);
        let point = route.point_at(self.waypoint)?;

        if !reached(position, point, config.arrival_tolerance) {
            return Ok(point);
        }

        self.waypoint = route.next_index(self.waypoint, looped);
        route.point_at(self.waypoint)
    }

    #[allow(clippy::too_many_arguments)]
    fn area_destination<R: Rng + ?Sized>(
        &mut self,
        position: Vec3,
        config: &AgentConfig,
        map: Option<&LocationMap>,
        sequence: &[AreaRef],
        dwell_time: f32,
        rng: &mut R,
        rays: &impl RayCaster,
        dt: f32,
    ) -> Result<Vec3, ProviderError> {
        let map = map.ok_or(ProviderError::MissingProvider(None))?;
        let steps = if sequence.is_empty() {
            map.area_count()
        } else {
            sequence.len()
        };
        if steps == 0 {
            return Err(ProviderError::AreaOutOfRange { index: 0, count: 0 });
        }

        let area_ref = |step: usize| -> AreaRef {
            let step = step % steps;
            sequence.get(step).cloned().unwrap_or(AreaRef::Index(step))
        };

        match self.phase {
            AreaPhase::ToCenter => {
                let current = area_ref(self.area_step);
                let center = match map.resolve(&current) {
                    Ok(area) => area.center,
                    Err(error) => {
                        // Битая ссылка: на следующем тике берём следующую зону
                        self.area_step = (self.area_step + 1) % steps;
                        return Err(error);
                    }
                };

                if !reached(position, center, config.arrival_tolerance) {
                    return Ok(center);
                }

                let point = map.random_point_in(&current, rng, rays)?;
                self.phase = AreaPhase::Roaming {
                    point,
                    timer: dwell_time,
                };
                Ok(point)
            }
            AreaPhase::Roaming { point, timer } => {
                let timer = timer - dt;
                if !reached(position, point, config.arrival_tolerance) && timer > 0.0 {
                    self.phase = AreaPhase::Roaming { point, timer };
                    return Ok(point);
                }

                self.area_step = (self.area_step + 1) % steps;
                self.phase = AreaPhase::ToCenter;
                map.resolve(&area_ref(self.area_step)).map(|area| area.center)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct WanderBehavior {
    /// Location map (None → круг вокруг home)
    pub map: Option<Entity>,
    pub area: Option<AreaRef>,
    /// Радиус self-centered круга
    pub radius: f32,
    pub min_interval: f32,
    pub max_interval: f32,
    /// Точка спавна (центр круга)
    pub home: Vec3,
    pub timer: f32,
    pub target_point: Option<Vec3>,
    pub ground_mask: CollisionMask,
    pub faults: Vec<String>,
}

impl WanderBehavior {
    pub fn circle(home: Vec3, radius: f32, min_interval: f32, max_interval: f32) -> Self {
        Self {
            map: None,
            area: None,
            radius,
            min_interval,
            max_interval,
            home,
            timer: 0.0,
            target_point: None,
            ground_mask: CollisionMask::GROUND,
            faults: Vec::new(),
        }
    }

    pub fn in_area(
        home: Vec3,
        map: Option<Entity>,
        area: AreaRef,
        min_interval: f32,
        max_interval: f32,
    ) -> Self {
        Self {
            map,
            area: Some(area),
            ..Self::circle(home, crate::providers::wander::DEFAULT_WANDER_RADIUS, min_interval, max_interval)
        }
    }

    /// Сбросить цель: новая точка будет выбрана в ближайшей оценке
    pub fn resample(&mut self) {
        self.target_point = None;
    }

    fn next_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let (lo, hi) = if self.min_interval <= self.max_interval {
            (self.min_interval, self.max_interval)
        } else {
            (self.max_interval, self.min_interval)
        };
        if hi - lo <= f32::EPSILON {
            return lo;
        }
        rng.gen_range(lo..=hi)
    }

    fn sample<R: Rng + ?Sized>(
        &mut self,
        agent: Entity,
        map: Option<&LocationMap>,
        rng: &mut R,
        rays: &impl RayCaster,
    ) -> Vec3 {
        let circle = WanderCircle::new(self.home, self.radius);

        if self.map.is_none() && self.area.is_none() {
            return circle.random_point(rng, rays, self.ground_mask);
        }

        let sampled = match (map, &self.area) {
            (Some(map), Some(area)) => map.random_point_in(area, rng, rays),
            (Some(_), None) => Err(ProviderError::UnknownArea(String::new())),
            (None, _) => Err(ProviderError::MissingProvider(self.map)),
        };

        match sampled {
            Ok(point) => {
                self.faults.clear();
                point
            }
            Err(error) => {
                // Деградация до круга вокруг home
                report_fault(&mut self.faults, agent, &error);
                circle.random_point(rng, rays, self.ground_mask)
            }
        }
    }

    fn destination<R: Rng + ?Sized>(
        &mut self,
        agent: Entity,
        map: Option<&LocationMap>,
        rng: &mut R,
        rays: &impl RayCaster,
        dt: f32,
    ) -> Vec3 {
        self.timer -= dt;

        match self.target_point {
            Some(point) if self.timer > 0.0 => point,
            _ => {
                let point = self.sample(agent, map, rng, rays);
                self.target_point = Some(point);
                self.timer = self.next_interval(rng);
                point
            }
        }
    }
}

/// Вариант поведения агента
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub enum Behavior {
    /// Только Idle ↔ Chase
    Chaser,
    Patroller(PatrolBehavior),
    Wanderer(WanderBehavior),
}

impl Default for Behavior {
    fn default() -> Self {
        Self::Chaser
    }
}

impl Behavior {
    /// Handles provider'ов (route, map) для разрешения в системе
    pub fn provider_handles(&self) -> (Option<Entity>, Option<Entity>) {
        match self {
            Behavior::Chaser => (None, None),
            Behavior::Patroller(patrol) => match &patrol.source {
                PatrolSource::Waypoints { route, .. } => (*route, None),
                PatrolSource::Areas { map, .. } => (None, *map),
            },
            Behavior::Wanderer(wander) => (None, wander.map),
        }
    }

    /// Естественное не-chase состояние варианта
    ///
    /// Patroller без provider'а деградирует до Idle.
    pub fn resting_state(&self, providers: &ProviderRefs) -> AgentState {
        match self {
            Behavior::Chaser => AgentState::Idle,
            Behavior::Patroller(patrol) if patrol.has_provider(providers) => AgentState::Patrol,
            Behavior::Patroller(_) => AgentState::Idle,
            Behavior::Wanderer(_) => AgentState::Wander,
        }
    }

    /// Оценка переходов (фаза 1 тика)
    ///
    /// Hysteresis: вход при distance ≤ entry и видимости, выход при
    /// distance > lose_interest или потере видимости.
    pub fn evaluate_state(
        &mut self,
        agent: Entity,
        brain: &mut AgentBrain,
        config: &AgentConfig,
        sight: &Sight,
        providers: &ProviderRefs,
    ) -> Option<Transition> {
        let from = brain.state;
        brain.target_distance = sight.distance;

        if brain.state == AgentState::Chase {
            brain.target_visible = sight.visible_for_keep;

            let keep = sight
                .distance
                .is_some_and(|d| d <= config.lose_interest_radius)
                && sight.visible_for_keep;

            if keep {
                // TargetFraction читает скорость target каждую оценку
                brain.move_speed = chase_speed(agent, brain, config, sight.target_speed);
                return None;
            }

            let resting = self.resting_state(providers);
            brain.state = match brain.chase_return {
                AgentState::Chase => resting,
                state => state,
            };
            brain.move_speed = config.move_speed;
            brain.destination = None;
            self.on_chase_exit();

            return Some(Transition {
                from,
                to: brain.state,
            });
        }

        brain.target_visible = sight.visible_for_entry;

        let enter = sight
            .distance
            .is_some_and(|d| d <= config.chase_entry_radius)
            && sight.visible_for_entry;

        let to = if enter {
            brain.chase_return = self.resting_state(providers);
            brain.move_speed = chase_speed(agent, brain, config, sight.target_speed);
            AgentState::Chase
        } else {
            brain.move_speed = config.move_speed;
            self.resting_state(providers)
        };

        if to == AgentState::Idle {
            if let Behavior::Patroller(patrol) = self {
                let error = patrol.provider_error();
                report_fault(&mut patrol.faults, agent, &error);
            }
        }

        if to == from {
            return None;
        }

        brain.state = to;
        Some(Transition { from, to })
    }

    /// Destination активного состояния (фаза 2 тика)
    ///
    /// Chase → живая позиция target; Idle → None (никакого движения).
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_behavior<R: Rng + ?Sized>(
        &mut self,
        agent: Entity,
        position: Vec3,
        brain: &mut AgentBrain,
        config: &AgentConfig,
        target_position: Option<Vec3>,
        providers: &ProviderRefs,
        rng: &mut R,
        rays: &impl RayCaster,
        dt: f32,
    ) -> Option<Vec3> {
        let destination = match (brain.state, self) {
            (AgentState::Chase, _) => target_position,
            (AgentState::Idle, _) => None,
            (AgentState::Patrol, Behavior::Patroller(patrol)) => {
                patrol.destination(agent, position, config, providers, rng, rays, dt)
            }
            (AgentState::Wander, Behavior::Wanderer(wander)) => {
                Some(wander.destination(agent, providers.map, rng, rays, dt))
            }
            // Состояние не принадлежит варианту, стоим
            _ => None,
        };

        brain.destination = destination;
        destination
    }

    fn on_chase_exit(&mut self) {
        match self {
            Behavior::Wanderer(wander) => wander.resample(),
            // Patroller продолжает с того же курсора
            Behavior::Patroller(_) | Behavior::Chaser => {}
        }
    }
}

/// Скорость погони в силе
///
/// TargetFraction без скорости target: дефект конфигурации, агент гонится
/// на `move_speed` (лог один раз на агента).
fn chase_speed(agent: Entity, brain: &mut AgentBrain, config: &AgentConfig, target_speed: Option<f32>) -> f32 {
    if let Some(speed) = config.chase_speed.resolve(target_speed) {
        return speed;
    }

    if !brain.speed_fault_reported {
        crate::log_warning(&format!(
            "AI: {:?} chase speed is a fraction of the target's speed, but the target reports none; using move_speed {}",
            agent, config.move_speed
        ));
        brain.speed_fault_reported = true;
    }
    config.move_speed
}

/// Горизонтальное "дошёл"
pub fn reached(position: Vec3, point: Vec3, tolerance: f32) -> bool {
    Vec2::new(point.x - position.x, point.z - position.z).length() <= tolerance
}

fn report_fault(reported: &mut Vec<String>, agent: Entity, error: &ProviderError) {
    let message = error.to_string();
    if reported.contains(&message) {
        return;
    }
    crate::log_warning(&format!("AI: {:?} target provider defect: {}", agent, message));
    reported.push(message);
}
