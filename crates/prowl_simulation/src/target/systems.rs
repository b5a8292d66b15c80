//! Target systems: реакция на ContactDamage, таймеры иммунитета и knockback.

use bevy::prelude::*;

use super::components::{receive_contact, ContactOutcome, Knockback, LifeLedger, Vulnerability};
use super::{TargetDefeated, TargetLifeLost};
use crate::ai::events::ContactDamage;

/// Система: ContactDamage → жизнь, иммунитет, knockback
///
/// Гейт иммунитета здесь второй раз: detect_target_contact видит состояние
/// до этого тика, а несколько агентов могут коснуться target одновременно.
pub fn apply_contact_damage(
    mut contact_events: EventReader<ContactDamage>,
    mut targets: Query<(&Transform, &mut LifeLedger, &mut Vulnerability, &mut Knockback)>,
    mut life_lost_events: EventWriter<TargetLifeLost>,
    mut defeated_events: EventWriter<TargetDefeated>,
) {
    for event in contact_events.read() {
        let Ok((transform, mut ledger, mut vulnerability, mut knockback)) = targets.get_mut(event.target)
        else {
            continue;
        };

        let outcome = receive_contact(
            &mut ledger,
            &mut vulnerability,
            &mut knockback,
            transform.translation,
            event.source_position,
        );

        match outcome {
            ContactOutcome::Ignored => {}
            ContactOutcome::LifeLost { remaining } => {
                crate::log(&format!(
                    "Target: {:?} hit by {:?}, {} lives left",
                    event.target, event.agent, remaining
                ));
                life_lost_events.write(TargetLifeLost {
                    target: event.target,
                    remaining,
                });
            }
            ContactOutcome::Defeated => {
                crate::log_info(&format!("Target: {:?} defeated by {:?}", event.target, event.agent));
                life_lost_events.write(TargetLifeLost {
                    target: event.target,
                    remaining: 0,
                });
                defeated_events.write(TargetDefeated { target: event.target });
            }
        }
    }
}

/// Система: countdown иммунитета + фаза мигания
pub fn tick_vulnerability(mut targets: Query<&mut Vulnerability>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for mut vulnerability in targets.iter_mut() {
        vulnerability.tick(delta);
    }
}

/// Система: сдвиг target по knockback (напрямую в Transform)
pub fn apply_knockback(mut targets: Query<(&mut Transform, &mut Knockback)>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for (mut transform, mut knockback) in targets.iter_mut() {
        if knockback.is_active() {
            transform.translation += knockback.step(delta);
        }
    }
}
