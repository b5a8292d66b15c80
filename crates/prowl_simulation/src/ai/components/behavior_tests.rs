//! Tests for behavior variants (transitions + provider cursors).

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::super::agent::{AgentBrain, AgentConfig, AgentState, ChaseSpeed};
    use super::super::behavior::*;
    use crate::physics::{EmptySpace, LevelGeometry};
    use crate::providers::{AreaRef, LocationMap, PatrolArea, WaypointRoute};

    const DT: f32 = 1.0 / 60.0;
    const AGENT: Entity = Entity::PLACEHOLDER;

    /// Sight без препятствий: видимость определяется только дальностью
    fn open_sight(config: &AgentConfig, distance: f32) -> Sight {
        Sight {
            distance: Some(distance),
            visible_for_entry: distance <= config.entry_sight_range(),
            visible_for_keep: distance <= config.keep_sight_range(),
            target_speed: Some(4.0),
            target_position: Some(Vec3::new(distance, 0.0, 0.0)),
        }
    }

    fn square_route() -> WaypointRoute {
        WaypointRoute::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(6.0, 0.0, 0.0),
            Vec3::new(6.0, 0.0, 6.0),
        ])
    }

    #[test]
    fn test_hysteresis_no_flicker_inside_band() {
        let config = AgentConfig::default(); // entry 8, lose 15
        let mut brain = AgentBrain::new(&config);
        let mut behavior = Behavior::Chaser;
        let providers = ProviderRefs::default();

        // Подходим с 20 до 0: вход ровно на 8
        let mut distance = 20.0;
        while distance >= 0.0 {
            behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, distance), &providers);
            let expected = if distance <= 8.0 { AgentState::Chase } else { AgentState::Idle };
            assert_eq!(brain.state, expected, "approach at {}", distance);
            distance -= 0.25;
        }

        // Отходим до 15 включительно: погоня не прерывается
        let mut distance = 0.0;
        while distance <= 15.0 {
            behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, distance), &providers);
            assert_eq!(brain.state, AgentState::Chase, "retreat at {}", distance);
            distance += 0.25;
        }

        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 15.25), &providers);
        assert_eq!(brain.state, AgentState::Idle);
    }

    #[test]
    fn test_chase_entry_sets_speed_and_return_state() {
        let config = AgentConfig {
            move_speed: 2.0,
            chase_speed: ChaseSpeed::Absolute(6.0),
            ..default()
        };
        let route = square_route();
        let providers = ProviderRefs {
            route: Some(&route),
            map: None,
        };
        let mut brain = AgentBrain::new(&config);
        let mut behavior = Behavior::Patroller(PatrolBehavior::waypoints(None, true));

        let transition = behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 30.0), &providers);
        assert_eq!(
            transition,
            Some(Transition {
                from: AgentState::Idle,
                to: AgentState::Patrol
            })
        );
        assert_eq!(brain.move_speed, 2.0);

        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 7.0), &providers);
        assert_eq!(brain.state, AgentState::Chase);
        assert_eq!(brain.move_speed, 6.0);
        assert_eq!(brain.chase_return, AgentState::Patrol);

        let transition = behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 16.0), &providers);
        assert_eq!(
            transition,
            Some(Transition {
                from: AgentState::Chase,
                to: AgentState::Patrol
            })
        );
        assert_eq!(brain.move_speed, 2.0);
    }

    #[test]
    fn test_lost_visibility_ends_chase() {
        let config = AgentConfig::default();
        let mut brain = AgentBrain::new(&config);
        let mut behavior = Behavior::Chaser;
        let providers = ProviderRefs::default();

        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 4.0), &providers);
        assert_eq!(brain.state, AgentState::Chase);

        let occluded = Sight {
            visible_for_entry: false,
            visible_for_keep: false,
            ..open_sight(&config, 4.0)
        };
        behavior.evaluate_state(AGENT, &mut brain, &config, &occluded, &providers);
        assert_eq!(brain.state, AgentState::Idle);

        // Target пропал (despawn) → тоже "не видим"
        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 4.0), &providers);
        behavior.evaluate_state(AGENT, &mut brain, &config, &Sight::default(), &providers);
        assert_eq!(brain.state, AgentState::Idle);
    }

    #[test]
    fn test_fraction_chase_speed_resampled_every_evaluation() {
        let config = AgentConfig {
            chase_speed: ChaseSpeed::TargetFraction(0.5),
            ..default()
        };
        let mut brain = AgentBrain::new(&config);
        let mut behavior = Behavior::Chaser;
        let providers = ProviderRefs::default();

        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 5.0), &providers);
        assert_eq!(brain.move_speed, 2.0);

        let faster = Sight {
            target_speed: Some(10.0),
            ..open_sight(&config, 5.0)
        };
        behavior.evaluate_state(AGENT, &mut brain, &config, &faster, &providers);
        assert_eq!(brain.move_speed, 5.0);
    }

    #[test]
    fn test_fraction_chase_speed_without_target_speed_uses_move_speed() {
        let config = AgentConfig {
            chase_speed: ChaseSpeed::TargetFraction(0.5),
            ..default()
        };
        let mut brain = AgentBrain::new(&config);
        let mut behavior = Behavior::Chaser;
        let providers = ProviderRefs::default();

        // Target без TrackedTarget: скорость неизвестна
        let silent = Sight {
            target_speed: None,
            ..open_sight(&config, 5.0)
        };
        behavior.evaluate_state(AGENT, &mut brain, &config, &silent, &providers);
        assert_eq!(brain.state, AgentState::Chase);
        assert_eq!(brain.move_speed, config.move_speed);
        assert!(brain.speed_fault_reported);

        behavior.evaluate_state(AGENT, &mut brain, &config, &silent, &providers);
        assert_eq!(brain.move_speed, config.move_speed);

        // Скорость появилась → снова доля от неё
        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 5.0), &providers);
        assert_eq!(brain.move_speed, 2.0);
    }

    #[test]
    fn test_waypoint_cursor_survives_route_shrink() {
        let config = AgentConfig::default();
        let route = WaypointRoute::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(6.0, 0.0, 0.0),
            Vec3::new(6.0, 0.0, 6.0),
            Vec3::new(0.0, 0.0, 6.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for looped in [true, false] {
            let mut brain = AgentBrain {
                state: AgentState::Patrol,
                ..AgentBrain::new(&config)
            };
            let mut behavior = Behavior::Patroller(PatrolBehavior::waypoints(None, looped));
            if let Behavior::Patroller(patrol) = &mut behavior {
                patrol.waypoint = 3;
            }

            let mut shorter = route.clone();
            shorter.remove(3);
            shorter.remove(2);
            let providers = ProviderRefs {
                route: Some(&shorter),
                map: None,
            };

            let destination = behavior.evaluate_behavior(
                AGENT,
                Vec3::new(-20.0, 0.0, -20.0),
                &mut brain,
                &config,
                None,
                &providers,
                &mut rng,
                &EmptySpace,
                DT,
            );

            // 3 % 2 = 1 при loop, последняя точка без loop: тоже 1
            assert_eq!(destination, Some(shorter.points[1]), "looped = {}", looped);
            assert_eq!(brain.state, AgentState::Patrol);
            let Behavior::Patroller(patrol) = &behavior else {
                unreachable!()
            };
            assert_eq!(patrol.waypoint, 1);
            assert!(patrol.faults.is_empty());
        }
    }

    #[test]
    fn test_waypoint_cursor_cycles_on_arrival() {
        let config = AgentConfig::default();
        let route = square_route();
        let providers = ProviderRefs {
            route: Some(&route),
            map: None,
        };
        let mut brain = AgentBrain {
            state: AgentState::Patrol,
            ..AgentBrain::new(&config)
        };
        let mut behavior = Behavior::Patroller(PatrolBehavior::waypoints(None, true));
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let mut visited = Vec::new();
        for _ in 0..7 {
            let Behavior::Patroller(patrol) = &behavior else {
                unreachable!()
            };
            visited.push(patrol.waypoint);
            // Стоим ровно на текущей точке → курсор сдвигается
            let here = route.point_at(patrol.waypoint).unwrap();
            let next = behavior
                .evaluate_behavior(AGENT, here, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
                .unwrap();
            assert_ne!(next, here);
        }

        assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_waypoint_cursor_clamps_without_loop() {
        let config = AgentConfig::default();
        let route = square_route();
        let providers = ProviderRefs {
            route: Some(&route),
            map: None,
        };
        let mut brain = AgentBrain {
            state: AgentState::Patrol,
            ..AgentBrain::new(&config)
        };
        let mut behavior = Behavior::Patroller(PatrolBehavior::waypoints(None, false));
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for index in [0usize, 1, 2, 2, 2] {
            let here = route.point_at(index).unwrap();
            behavior.evaluate_behavior(AGENT, here, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT);
        }

        let Behavior::Patroller(patrol) = &behavior else {
            unreachable!()
        };
        assert_eq!(patrol.waypoint, 2);
        assert_eq!(brain.destination, Some(route.points[2]));
    }

    #[test]
    fn test_patroller_without_provider_stays_idle() {
        let config = AgentConfig::default();
        let empty = WaypointRoute::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for providers in [
            ProviderRefs::default(),
            ProviderRefs {
                route: Some(&empty),
                map: None,
            },
        ] {
            let mut brain = AgentBrain::new(&config);
            let mut behavior = Behavior::Patroller(PatrolBehavior::waypoints(None, true));

            for _ in 0..30 {
                let transition =
                    behavior.evaluate_state(AGENT, &mut brain, &config, &Sight::default(), &providers);
                assert_eq!(transition, None);
                let destination = behavior.evaluate_behavior(
                    AGENT,
                    Vec3::ZERO,
                    &mut brain,
                    &config,
                    None,
                    &providers,
                    &mut rng,
                    &EmptySpace,
                    DT,
                );
                assert_eq!(destination, None);
                assert_eq!(brain.state, AgentState::Idle);
            }

            let Behavior::Patroller(patrol) = &behavior else {
                unreachable!()
            };
            // Дефект залогирован ровно один раз
            assert_eq!(patrol.faults.len(), 1);
        }
    }

    #[test]
    fn test_area_patrol_two_phase_cycle() {
        let config = AgentConfig::default();
        let map = LocationMap::new(vec![
            PatrolArea::new("a", Vec3::new(0.0, 0.0, 0.0), 3.0),
            PatrolArea::new("b", Vec3::new(20.0, 0.0, 0.0), 3.0),
        ]);
        let providers = ProviderRefs {
            route: None,
            map: Some(&map),
        };
        let geometry = LevelGeometry::flat_ground(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut brain = AgentBrain {
            state: AgentState::Patrol,
            ..AgentBrain::new(&config)
        };
        let mut behavior = Behavior::Patroller(PatrolBehavior::areas(None, Vec::new(), 1.0));

        // Фаза A: в центре зоны "a" → фаза B со случайной точкой внутри "a"
        let roam = behavior
            .evaluate_behavior(AGENT, Vec3::ZERO, &mut brain, &config, None, &providers, &mut rng, &geometry, DT)
            .unwrap();
        assert!(map.areas[0].contains_horizontal(roam));
        let Behavior::Patroller(patrol) = &behavior else {
            unreachable!()
        };
        assert!(matches!(patrol.phase, AreaPhase::Roaming { .. }));

        // Фаза B: стоим далеко от точки, таймер 1с истекает → следующая зона
        let far = Vec3::new(-50.0, 0.0, -50.0);
        let mut destination = roam;
        for _ in 0..61 {
            destination = behavior
                .evaluate_behavior(AGENT, far, &mut brain, &config, None, &providers, &mut rng, &geometry, DT)
                .unwrap();
        }
        assert_eq!(destination, map.areas[1].center);

        let Behavior::Patroller(patrol) = &behavior else {
            unreachable!()
        };
        assert_eq!(patrol.area_step, 1);
        assert_eq!(patrol.phase, AreaPhase::ToCenter);
    }

    #[test]
    fn test_area_patrol_point_reached_ends_phase_early() {
        let config = AgentConfig::default();
        let map = LocationMap::new(vec![
            PatrolArea::new("a", Vec3::ZERO, 3.0),
            PatrolArea::new("b", Vec3::new(20.0, 0.0, 0.0), 3.0),
        ]);
        let providers = ProviderRefs {
            route: None,
            map: Some(&map),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut brain = AgentBrain {
            state: AgentState::Patrol,
            ..AgentBrain::new(&config)
        };
        let sequence = vec![AreaRef::Name("b".into()), AreaRef::Name("a".into())];
        let mut behavior = Behavior::Patroller(PatrolBehavior::areas(None, sequence, 100.0));

        let center_b = map.areas[1].center;
        let roam = behavior
            .evaluate_behavior(AGENT, center_b, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
            .unwrap();

        // Дошли до random point → сразу к следующей зоне ("a")
        let next = behavior
            .evaluate_behavior(AGENT, roam, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
            .unwrap();
        assert_eq!(next, map.areas[0].center);
    }

    #[test]
    fn test_wanderer_samples_at_spawn_and_on_timer() {
        let config = AgentConfig::default();
        let home = Vec3::new(5.0, 0.0, 5.0);
        let mut behavior = Behavior::Wanderer(WanderBehavior::circle(home, 4.0, 1.0, 2.0));
        let mut brain = AgentBrain {
            state: AgentState::Wander,
            ..AgentBrain::new(&config)
        };
        let providers = ProviderRefs::default();
        let mut rng = ChaCha8Rng::seed_from_u64(21);

        let first = behavior
            .evaluate_behavior(AGENT, home, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
            .unwrap();
        assert!(Vec2::new(first.x - home.x, first.z - home.z).length() <= 4.0 + 1e-4);

        let Behavior::Wanderer(wander) = &behavior else {
            unreachable!()
        };
        let interval = wander.timer;
        assert!((1.0..=2.0).contains(&interval), "interval = {}", interval);

        // До истечения таймера точка не меняется
        let ticks_before_expiry = (interval / DT) as usize - 1;
        for _ in 0..ticks_before_expiry {
            let same = behavior
                .evaluate_behavior(AGENT, home, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
                .unwrap();
            assert_eq!(same, first);
        }

        // Чуть позже таймер истёк → новая точка
        let mut changed = false;
        for _ in 0..3 {
            let point = behavior
                .evaluate_behavior(AGENT, home, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
                .unwrap();
            changed |= point != first;
        }
        assert!(changed);
    }

    #[test]
    fn test_wanderer_resamples_after_chase() {
        let config = AgentConfig::default();
        let mut behavior = Behavior::Wanderer(WanderBehavior::circle(Vec3::ZERO, 10.0, 30.0, 30.0));
        let mut brain = AgentBrain::new(&config);
        let providers = ProviderRefs::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 30.0), &providers);
        assert_eq!(brain.state, AgentState::Wander);
        let before = behavior
            .evaluate_behavior(AGENT, Vec3::ZERO, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
            .unwrap();

        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 6.0), &providers);
        assert_eq!(brain.state, AgentState::Chase);
        behavior.evaluate_state(AGENT, &mut brain, &config, &open_sight(&config, 20.0), &providers);
        assert_eq!(brain.state, AgentState::Wander);

        let Behavior::Wanderer(wander) = &behavior else {
            unreachable!()
        };
        assert_eq!(wander.target_point, None);

        let after = behavior
            .evaluate_behavior(AGENT, Vec3::ZERO, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
            .unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_wanderer_unknown_area_falls_back_to_circle() {
        let config = AgentConfig::default();
        let map = LocationMap::new(vec![PatrolArea::new("yard", Vec3::new(100.0, 0.0, 0.0), 2.0)]);
        let providers = ProviderRefs {
            route: None,
            map: Some(&map),
        };
        let home = Vec3::new(-3.0, 0.0, 0.0);
        let mut behavior = Behavior::Wanderer(WanderBehavior::in_area(
            home,
            None,
            AreaRef::Name("cellar".into()),
            1.0,
            2.0,
        ));
        let mut brain = AgentBrain {
            state: AgentState::Wander,
            ..AgentBrain::new(&config)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let point = behavior
            .evaluate_behavior(AGENT, home, &mut brain, &config, None, &providers, &mut rng, &EmptySpace, DT)
            .unwrap();
        assert!(Vec2::new(point.x - home.x, point.z - home.z).length() <= 10.0 + 1e-4);

        let Behavior::Wanderer(wander) = &behavior else {
            unreachable!()
        };
        assert_eq!(wander.faults.len(), 1);
    }

    #[test]
    fn test_chase_destination_is_live_target_position() {
        let config = AgentConfig::default();
        let mut brain = AgentBrain {
            state: AgentState::Chase,
            ..AgentBrain::new(&config)
        };
        let mut behavior = Behavior::Chaser;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let target = Vec3::new(3.0, 0.0, -2.0);

        let destination = behavior.evaluate_behavior(
            AGENT,
            Vec3::ZERO,
            &mut brain,
            &config,
            Some(target),
            &ProviderRefs::default(),
            &mut rng,
            &EmptySpace,
            DT,
        );
        assert_eq!(destination, Some(target));

        brain.state = AgentState::Idle;
        let destination = behavior.evaluate_behavior(
            AGENT,
            Vec3::ZERO,
            &mut brain,
            &config,
            Some(target),
            &ProviderRefs::default(),
            &mut rng,
            &EmptySpace,
            DT,
        );
        assert_eq!(destination, None);
    }

    #[test]
    fn test_sanitized_repairs_collapsed_band() {
        let config = AgentConfig {
            chase_entry_radius: 10.0,
            lose_interest_radius: 10.0,
            ..default()
        };
        let (fixed, repaired) = config.sanitized();
        assert!(repaired);
        assert_eq!(fixed.lose_interest_radius, 11.0);

        let (same, repaired) = AgentConfig::default().sanitized();
        assert!(!repaired);
        assert_eq!(same, AgentConfig::default());
    }
}
