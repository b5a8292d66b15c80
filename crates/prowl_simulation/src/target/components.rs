//! Target components: скорость, иммунитет (blink), knockback, жизни

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Длительность иммунитета после урона (секунды)
pub const IMMUNITY_DURATION: f32 = 2.0;
/// Период мигания во время иммунитета
pub const BLINK_INTERVAL: f32 = 0.1;
/// Длительность knockback
pub const KNOCKBACK_DURATION: f32 = 0.2;
/// Скорость отбрасывания (m/s)
pub const KNOCKBACK_FORCE: f32 = 10.0;
/// Жизней на старте
pub const STARTING_LIVES: u32 = 3;

/// Отслеживаемая цель (обычно игрок)
///
/// `move_speed` читается агентами с `ChaseSpeed::TargetFraction` каждую оценку.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct TrackedTarget {
    pub move_speed: f32,
    pub contact_radius: f32,
}

impl Default for TrackedTarget {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            contact_radius: 0.5,
        }
    }
}

/// Иммунитет после урона + фаза мигания
///
/// Явный countdown вместо корутины: `tick` раз в фиксированный тик.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Vulnerability {
    pub immunity_remaining: f32,
    pub blink_timer: f32,
    /// Видим ли target сейчас (мигание во время иммунитета)
    pub visible: bool,
}

impl Default for Vulnerability {
    fn default() -> Self {
        Self {
            immunity_remaining: 0.0,
            blink_timer: 0.0,
            visible: true,
        }
    }
}

impl Vulnerability {
    pub fn is_immune(&self) -> bool {
        self.immunity_remaining > 0.0
    }

    pub fn start_immunity(&mut self) {
        self.immunity_remaining = IMMUNITY_DURATION;
        self.blink_timer = BLINK_INTERVAL;
        self.visible = false;
    }

    pub fn tick(&mut self, delta: f32) {
        if !self.is_immune() {
            self.visible = true;
            return;
        }

        self.immunity_remaining = (self.immunity_remaining - delta).max(0.0);
        if !self.is_immune() {
            self.blink_timer = 0.0;
            self.visible = true;
            return;
        }

        self.blink_timer -= delta;
        if self.blink_timer <= 0.0 {
            self.blink_timer += BLINK_INTERVAL;
            self.visible = !self.visible;
        }
    }
}

/// Отбрасывание от источника урона (горизонтально)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Knockback {
    pub remaining: f32,
    pub direction: Vec3,
}

impl Knockback {
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    /// Старт отбрасывания от `source` (источник в той же точке → без сдвига)
    pub fn start(&mut self, position: Vec3, source: Vec3) {
        let away = position - source;
        self.direction = Vec3::new(away.x, 0.0, away.z).normalize_or_zero();
        self.remaining = KNOCKBACK_DURATION;
    }

    /// Смещение за тик; последний тик обрезается по остатку
    pub fn step(&mut self, delta: f32) -> Vec3 {
        if !self.is_active() {
            return Vec3::ZERO;
        }

        let step = delta.min(self.remaining);
        self.remaining -= step;
        self.direction * KNOCKBACK_FORCE * step
    }
}

/// Оставшиеся жизни target
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct LifeLedger {
    pub lives: u32,
}

impl Default for LifeLedger {
    fn default() -> Self {
        Self {
            lives: STARTING_LIVES,
        }
    }
}

impl LifeLedger {
    pub fn is_defeated(&self) -> bool {
        self.lives == 0
    }
}

/// Итог одного контакта с target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Иммунен или уже побеждён
    Ignored,
    LifeLost { remaining: u32 },
    Defeated,
}

/// Контакт агента с target: жизнь, иммунитет, knockback
///
/// Иммунный или побеждённый target контакт игнорирует, поэтому несколько
/// контактов за один тик стоят одну жизнь.
pub fn receive_contact(
    ledger: &mut LifeLedger,
    vulnerability: &mut Vulnerability,
    knockback: &mut Knockback,
    position: Vec3,
    source_position: Vec3,
) -> ContactOutcome {
    if vulnerability.is_immune() || ledger.is_defeated() {
        return ContactOutcome::Ignored;
    }

    ledger.lives -= 1;
    if ledger.is_defeated() {
        return ContactOutcome::Defeated;
    }

    vulnerability.start_immunity();
    knockback.start(position, source_position);
    ContactOutcome::LifeLost {
        remaining: ledger.lives,
    }
}
