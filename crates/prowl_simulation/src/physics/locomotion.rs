//! Movement resolver: intent "иди к точке" → поворот + перемещение
//!
//! Архитектура:
//! - `move_toward`: чистая функция (без ECS), один вызов на тик
//! - Backend выбирается при спавне (`Locomotion`), в рантайме не меняется
//! - Результат тика: `LocomotionCommand`, который применяет либо наш
//!   headless интегратор, либо rapier (см. `PhysicsMode`)
//!
//! Конвенция: `Transform.translation` агента: точка ног (контакт с землёй).

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use super::geometry::{LevelGeometry, RayCaster};
use super::layers::{actor_groups, CollisionMask};

/// Горизонтальная дистанция, ниже которой направление считается вырожденным
pub const DEGENERATE_DISTANCE: f32 = 1e-3;

/// Ground probe от ног: старт чуть выше ног, чтобы не начинать внутри пола
const FEET_PROBE_LIFT: f32 = 0.1;

/// Насколько высоко над новой позицией ищем пол (ступеньки, рампы)
const STEP_PROBE_HEIGHT: f32 = 0.5;

/// Допуск прилипания к полу в headless интеграторе
const GROUND_SNAP: f32 = 0.05;

/// Capsule коллайдер агента (для rapier)
const CAPSULE_HALF_HEIGHT: f32 = 0.5;
const CAPSULE_RADIUS: f32 = 0.5;

/// Backend движения агента
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(rename_all = "snake_case")]
pub enum Locomotion {
    /// Kinematic capsule controller: одно смещение за тик, grounded от контроллера
    #[default]
    KinematicCapsule,
    /// Dynamic rigidbody: velocity ставится напрямую, grounded от probe под ногами
    DynamicBody,
    /// Без коллайдера: transform двигается вдоль facing, без гравитации
    TransformOnly,
}

/// Вертикальное состояние мотора
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Motor {
    pub vertical_velocity: f32,
    pub grounded: bool,
}

/// Параметры мотора (из AgentConfig при спавне)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct MotorSettings {
    /// Скорость поворота (градусы/сек)
    pub rotation_speed: f32,
    /// Модуль гравитации (m/s², положительный)
    pub gravity: f32,
    /// Вертикальная скорость на земле (прижимает к склонам)
    pub grounded_bias: f32,
    /// Длина ground probe под ногами (DynamicBody)
    pub ground_probe_distance: f32,
    /// Что считается землёй
    pub ground_mask: CollisionMask,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            rotation_speed: 120.0,
            gravity: 20.0,
            grounded_bias: -0.5,
            ground_probe_distance: 0.2,
            ground_mask: CollisionMask::GROUND,
        }
    }
}

/// Результат одного тика resolver'а
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub enum LocomotionCommand {
    /// Никакого движения в этом тике
    #[default]
    Hold,
    /// Смещение за тик (KinematicCapsule)
    Displace(Vec3),
    /// Скорость тела на тик (DynamicBody), не импульс
    SetVelocity(Vec3),
    /// Transform уже сдвинут (TransformOnly)
    Translated,
}

/// Последняя команда resolver'а (читается интегратором / rapier bridge)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct LocomotionIntent {
    pub command: LocomotionCommand,
}

/// Поворот, смотрящий вдоль горизонтального `direction` (forward = -Z)
pub fn heading_rotation(direction: Vec3) -> Quat {
    Quat::from_rotation_y(f32::atan2(-direction.x, -direction.z))
}

/// Плавный поворот к heading с ограничением угловой скорости
///
/// Slerp пропорционален времени: за тик не больше `rotation_speed * dt` градусов.
pub fn rotate_toward_heading(transform: &mut Transform, direction: Vec3, rotation_speed: f32, dt: f32) {
    let target = heading_rotation(direction);
    let max_step = rotation_speed.to_radians() * dt;
    let angle = transform.rotation.angle_between(target);

    if angle <= max_step || angle < 1e-5 {
        transform.rotation = target;
    } else {
        transform.rotation = transform.rotation.slerp(target, max_step / angle).normalize();
    }
}

/// Горизонтальный шаг за тик вдоль текущего facing
///
/// Скорость масштабируется косинусом ошибки heading'а (назад не идём),
/// шаг не длиннее `distance * cos`, за один тик цель не перелетаем,
/// поэтому горизонтальная дистанция до цели не растёт.
pub fn horizontal_step(transform: &Transform, direction: Vec3, distance: f32, speed: f32, dt: f32) -> Vec3 {
    let forward = *transform.forward();
    let facing = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let alignment = facing.dot(direction);

    if alignment <= 0.0 || speed <= 0.0 || dt <= 0.0 {
        return Vec3::ZERO;
    }

    let step = (speed * dt * alignment).min(distance * alignment);
    facing * step
}

/// Гравитация: на земле, grounded bias, в воздухе, накапливаем
pub fn integrate_vertical(motor: &mut Motor, settings: &MotorSettings, dt: f32) {
    if motor.grounded {
        motor.vertical_velocity = settings.grounded_bias;
    } else {
        motor.vertical_velocity -= settings.gravity * dt;
    }
}

/// Короткий probe под ногами (DynamicBody grounded check)
pub fn probe_feet(rays: &impl RayCaster, feet: Vec3, settings: &MotorSettings) -> bool {
    rays.cast_ray(
        feet + Vec3::Y * FEET_PROBE_LIFT,
        Vec3::NEG_Y,
        FEET_PROBE_LIFT + settings.ground_probe_distance,
        settings.ground_mask,
    )
    .is_some()
}

/// MoveToward: один тик движения агента к `destination`
///
/// - Вырожденное направление (уже на месте) → без поворота и без
///   горизонтального движения (гравитация у физических backend'ов остаётся)
/// - KinematicCapsule: горизонталь + накопленная вертикаль одним смещением
/// - DynamicBody: grounded по probe, velocity на тик
/// - TransformOnly: сдвиг transform вдоль facing, без гравитации
#[allow(clippy::too_many_arguments)]
pub fn move_toward(
    backend: Locomotion,
    settings: &MotorSettings,
    motor: &mut Motor,
    transform: &mut Transform,
    destination: Vec3,
    speed: f32,
    dt: f32,
    rays: &impl RayCaster,
) -> LocomotionCommand {
    if dt <= 0.0 {
        return LocomotionCommand::Hold;
    }

    let to_destination = destination - transform.translation;
    let horizontal = Vec3::new(to_destination.x, 0.0, to_destination.z);
    let distance = horizontal.length();

    let step = if distance > DEGENERATE_DISTANCE {
        let direction = horizontal / distance;
        rotate_toward_heading(transform, direction, settings.rotation_speed, dt);
        horizontal_step(transform, direction, distance, speed, dt)
    } else {
        Vec3::ZERO
    };

    match backend {
        Locomotion::KinematicCapsule => {
            // grounded пришёл от контроллера в прошлом тике
            integrate_vertical(motor, settings, dt);
            LocomotionCommand::Displace(step + Vec3::Y * motor.vertical_velocity * dt)
        }
        Locomotion::DynamicBody => {
            motor.grounded = probe_feet(rays, transform.translation, settings);
            integrate_vertical(motor, settings, dt);
            LocomotionCommand::SetVelocity(step / dt + Vec3::Y * motor.vertical_velocity)
        }
        Locomotion::TransformOnly => {
            if step == Vec3::ZERO {
                return LocomotionCommand::Hold;
            }
            transform.translation += step;
            LocomotionCommand::Translated
        }
    }
}

/// Headless: прижать позицию к полу под ней, вернуть grounded
///
/// Пол ищется от `STEP_PROBE_HEIGHT` над max(старая, новая) высотой.
pub fn settle_on_ground(rays: &impl RayCaster, previous: Vec3, next: &mut Vec3, mask: CollisionMask) -> bool {
    let probe_top = previous.y.max(next.y) + STEP_PROBE_HEIGHT;
    let probe_length = probe_top - next.y + GROUND_SNAP;
    let origin = Vec3::new(next.x, probe_top, next.z);

    match rays.cast_ray(origin, Vec3::NEG_Y, probe_length, mask) {
        Some(hit) => {
            next.y = hit.point.y;
            true
        }
        None => false,
    }
}

/// Headless применение команды тика к transform'у
///
/// KinematicCapsule: смещение + прилипание к полу, grounded репортит "контроллер".
/// DynamicBody: velocity * dt + коллизия с полом (grounded считает resolver).
pub fn integrate_command(
    backend: Locomotion,
    command: LocomotionCommand,
    settings: &MotorSettings,
    motor: &mut Motor,
    transform: &mut Transform,
    rays: &impl RayCaster,
    dt: f32,
) {
    let previous = transform.translation;

    let mut next = match (backend, command) {
        (Locomotion::KinematicCapsule, LocomotionCommand::Displace(displacement)) => previous + displacement,
        (Locomotion::DynamicBody, LocomotionCommand::SetVelocity(velocity)) => previous + velocity * dt,
        _ => return,
    };

    let landed = settle_on_ground(rays, previous, &mut next, settings.ground_mask);

    match backend {
        Locomotion::KinematicCapsule => motor.grounded = landed,
        // Тело упёрлось в пол, вертикальная скорость гасится коллизией
        Locomotion::DynamicBody if landed && motor.vertical_velocity < 0.0 => {
            motor.vertical_velocity = settings.grounded_bias;
        }
        _ => {}
    }

    transform.translation = next;
}

/// Система: headless интеграция (без rapier)
pub fn integrate_headless_locomotion(
    mut query: Query<(&Locomotion, &MotorSettings, &LocomotionIntent, &mut Motor, &mut Transform)>,
    geometry: Option<Res<LevelGeometry>>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let fallback = LevelGeometry::default();
    let geometry = geometry.as_deref().unwrap_or(&fallback);

    for (backend, settings, intent, mut motor, mut transform) in query.iter_mut() {
        integrate_command(
            *backend,
            intent.command,
            settings,
            &mut motor,
            &mut transform,
            geometry,
            delta,
        );
    }
}

/// Система: rapier bridge, команда resolver'а → rapier компоненты
///
/// Идёт до `PhysicsSet::SyncBackend`: поворот из `move_toward` уходит в rapier
/// вместе с командой (kinematic position / set_position), writeback его сохраняет.
pub fn write_rapier_locomotion(
    mut controllers: Query<(&LocomotionIntent, &mut KinematicCharacterController)>,
    mut bodies: Query<(&LocomotionIntent, &mut Velocity), Without<KinematicCharacterController>>,
) {
    for (intent, mut controller) in controllers.iter_mut() {
        controller.translation = match intent.command {
            LocomotionCommand::Displace(displacement) => Some(displacement),
            _ => None,
        };
    }

    for (intent, mut velocity) in bodies.iter_mut() {
        // Yaw ведёт resolver через Transform, коллизии тело не крутят
        velocity.angvel = Vec3::ZERO;
        match intent.command {
            LocomotionCommand::SetVelocity(linvel) => velocity.linvel = linvel,
            LocomotionCommand::Hold => {
                velocity.linvel.x = 0.0;
                velocity.linvel.z = 0.0;
            }
            _ => {}
        }
    }
}

/// Система: grounded от rapier character controller'а
pub fn read_rapier_controller_output(
    mut query: Query<(&KinematicCharacterControllerOutput, &mut Motor)>,
) {
    for (output, mut motor) in query.iter_mut() {
        motor.grounded = output.grounded;
    }
}

/// Добавляет entity компоненты выбранного backend'а
///
/// - KinematicCapsule: KinematicPositionBased + capsule + character controller
/// - DynamicBody: Dynamic + capsule, наклон залочен (X/Z), yaw свободен под resolver,
///   своя гравитация (GravityScale 0)
/// - TransformOnly: без коллайдера
pub fn insert_locomotion(entity: &mut EntityCommands, backend: Locomotion, settings: MotorSettings) {
    entity.insert((
        backend,
        settings,
        Motor::default(),
        LocomotionIntent::default(),
    ));

    // Transform в ногах → капсула поднята на half_height + radius
    let capsule = || {
        Collider::compound(vec![(
            Vec3::Y * (CAPSULE_HALF_HEIGHT + CAPSULE_RADIUS),
            Quat::IDENTITY,
            Collider::capsule_y(CAPSULE_HALF_HEIGHT, CAPSULE_RADIUS),
        )])
    };

    match backend {
        Locomotion::KinematicCapsule => {
            entity.insert((
                RigidBody::KinematicPositionBased,
                capsule(),
                KinematicCharacterController {
                    snap_to_ground: Some(CharacterLength::Absolute(0.3)),
                    ..default()
                },
                actor_groups(),
            ));
        }
        Locomotion::DynamicBody => {
            entity.insert((
                RigidBody::Dynamic,
                capsule(),
                Velocity::default(),
                LockedAxes::ROTATION_LOCKED_X | LockedAxes::ROTATION_LOCKED_Z,
                GravityScale(0.0),
                actor_groups(),
            ));
        }
        Locomotion::TransformOnly => {}
    }
}
