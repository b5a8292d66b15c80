//! Tests for the movement resolver (all three backends).

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::geometry::{EmptySpace, LevelGeometry};
    use super::super::locomotion::*;

    const DT: f32 = 1.0 / 60.0;

    fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
        Vec2::new(a.x - b.x, a.z - b.z).length()
    }

    /// Гоняет resolver + headless интеграцию до прибытия, проверяя монотонность
    fn run_until_arrival(backend: Locomotion, start_rotation: Quat) -> usize {
        let geometry = LevelGeometry::flat_ground(0.0);
        let settings = MotorSettings::default();
        let mut motor = Motor::default();
        let mut transform = Transform::from_xyz(0.0, 0.0, 0.0).with_rotation(start_rotation);
        let destination = Vec3::new(10.0, 0.0, 5.0);
        let arrival_tolerance = 0.5;

        let mut previous = horizontal_distance(transform.translation, destination);

        for tick in 0..1200 {
            let command = move_toward(
                backend,
                &settings,
                &mut motor,
                &mut transform,
                destination,
                3.0,
                DT,
                &geometry,
            );
            integrate_command(backend, command, &settings, &mut motor, &mut transform, &geometry, DT);

            let distance = horizontal_distance(transform.translation, destination);
            assert!(
                distance <= previous + 1e-4,
                "{:?}: distance grew on tick {} ({} → {})",
                backend,
                tick,
                previous,
                distance
            );
            previous = distance;

            if distance < arrival_tolerance {
                return tick;
            }
        }

        panic!("{:?}: never arrived, distance left = {}", backend, previous);
    }

    #[test]
    fn test_kinematic_capsule_converges() {
        run_until_arrival(Locomotion::KinematicCapsule, Quat::IDENTITY);
    }

    #[test]
    fn test_dynamic_body_converges() {
        run_until_arrival(Locomotion::DynamicBody, Quat::IDENTITY);
    }

    #[test]
    fn test_transform_only_converges() {
        run_until_arrival(Locomotion::TransformOnly, Quat::IDENTITY);
    }

    #[test]
    fn test_converges_when_starting_backwards() {
        // Смотрим строго от цели: сначала только поворот, потом движение
        let away = heading_rotation(Vec3::new(-10.0, 0.0, -5.0).normalize());
        for backend in [
            Locomotion::KinematicCapsule,
            Locomotion::DynamicBody,
            Locomotion::TransformOnly,
        ] {
            run_until_arrival(backend, away);
        }
    }

    #[test]
    fn test_rotation_is_rate_limited() {
        let settings = MotorSettings::default(); // 120°/s
        let mut transform = Transform::default();
        let before = transform.rotation;

        rotate_toward_heading(&mut transform, Vec3::X, settings.rotation_speed, DT);

        let turned = before.angle_between(transform.rotation).to_degrees();
        assert!((turned - 2.0).abs() < 0.01, "turned {}°", turned);
    }

    #[test]
    fn test_degenerate_direction_keeps_rotation_and_position() {
        let settings = MotorSettings::default();
        let mut motor = Motor {
            grounded: true,
            ..default()
        };
        let rotation = Quat::from_rotation_y(0.7);
        let mut transform = Transform::from_xyz(2.0, 0.0, 3.0).with_rotation(rotation);

        let command = move_toward(
            Locomotion::KinematicCapsule,
            &settings,
            &mut motor,
            &mut transform,
            Vec3::new(2.0, 0.0, 3.0),
            3.0,
            DT,
            &EmptySpace,
        );

        assert_eq!(transform.rotation, rotation);
        let LocomotionCommand::Displace(displacement) = command else {
            panic!("capsule must displace, got {:?}", command);
        };
        assert_eq!(displacement.x, 0.0);
        assert_eq!(displacement.z, 0.0);
        // Grounded bias всё равно прижимает к полу
        assert!(displacement.y < 0.0);
    }

    #[test]
    fn test_gravity_accumulates_while_airborne() {
        let settings = MotorSettings::default();
        let mut motor = Motor::default();
        let mut transform = Transform::from_xyz(0.0, 5.0, 0.0);

        for _ in 0..3 {
            move_toward(
                Locomotion::KinematicCapsule,
                &settings,
                &mut motor,
                &mut transform,
                Vec3::new(0.0, 5.0, -10.0),
                3.0,
                DT,
                &EmptySpace,
            );
        }

        let expected = -settings.gravity * DT * 3.0;
        assert!((motor.vertical_velocity - expected).abs() < 1e-4);
    }

    #[test]
    fn test_dynamic_body_probes_ground_under_feet() {
        let geometry = LevelGeometry::flat_ground(0.0);
        let settings = MotorSettings::default();
        let mut motor = Motor {
            vertical_velocity: -3.0,
            grounded: false,
        };
        let mut transform = Transform::default();

        let command = move_toward(
            Locomotion::DynamicBody,
            &settings,
            &mut motor,
            &mut transform,
            Vec3::new(0.0, 0.0, -10.0),
            3.0,
            DT,
            &geometry,
        );

        assert!(motor.grounded);
        assert_eq!(motor.vertical_velocity, settings.grounded_bias);
        let LocomotionCommand::SetVelocity(velocity) = command else {
            panic!("dynamic body must set velocity, got {:?}", command);
        };
        // Уже смотрим на -Z: полная скорость вперёд
        assert!((velocity.z + 3.0).abs() < 1e-4, "velocity = {:?}", velocity);
    }

    #[test]
    fn test_transform_only_ignores_gravity() {
        let settings = MotorSettings::default();
        let mut motor = Motor::default();
        let mut transform = Transform::from_xyz(0.0, 4.0, 0.0);

        for _ in 0..30 {
            move_toward(
                Locomotion::TransformOnly,
                &settings,
                &mut motor,
                &mut transform,
                Vec3::new(0.0, 0.0, -10.0),
                3.0,
                DT,
                &EmptySpace,
            );
        }

        assert_eq!(transform.translation.y, 4.0);
        assert_eq!(motor.vertical_velocity, 0.0);
        assert!(transform.translation.z < -1.0);
    }

    #[test]
    fn test_capsule_lands_and_reports_grounded() {
        let geometry = LevelGeometry::flat_ground(0.0);
        let settings = MotorSettings::default();
        let mut motor = Motor::default();
        let mut transform = Transform::from_xyz(0.0, 2.0, 0.0);

        for _ in 0..120 {
            let command = move_toward(
                Locomotion::KinematicCapsule,
                &settings,
                &mut motor,
                &mut transform,
                Vec3::ZERO,
                3.0,
                DT,
                &geometry,
            );
            integrate_command(
                Locomotion::KinematicCapsule,
                command,
                &settings,
                &mut motor,
                &mut transform,
                &geometry,
                DT,
            );
        }

        assert!(motor.grounded);
        assert!(transform.translation.y.abs() < 1e-4);
    }
}
