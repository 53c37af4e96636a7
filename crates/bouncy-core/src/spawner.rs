//! Time-driven enemy scheduling with a one-time difficulty ramp.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::{EnemyClassConfig, SpawnConfig, SpawnSchedule};
use crate::entity::EntityKind;

/// An enemy the spawner wants created this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnOrder {
    pub kind: EntityKind,
    /// Leftward speed magnitude.
    pub speed: f32,
}

/// Counts down physics steps to the next enemy.
#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnConfig,
    difficulty_threshold_secs: f32,
    countdown: i64,
    spawned: u64,
    rng: ChaCha8Rng,
}

impl Spawner {
    pub fn new(config: SpawnConfig, difficulty_threshold_secs: f32, seed: u64) -> Self {
        Self {
            countdown: i64::from(config.initial_countdown),
            config,
            difficulty_threshold_secs,
            spawned: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Steps remaining until the next spawn.
    pub fn countdown(&self) -> i64 {
        self.countdown
    }

    /// Number of scheduled spawns so far.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Whether enemies spawned at `elapsed_secs` use their boosted speed.
    pub fn is_boosted(&self, elapsed_secs: f32) -> bool {
        elapsed_secs > self.difficulty_threshold_secs
    }

    fn class(&self, kind: EntityKind) -> &EnemyClassConfig {
        match kind {
            EntityKind::AirEnemy => &self.config.air,
            _ => &self.config.ground,
        }
    }

    /// Spawn speed of `kind` at `elapsed_secs`.
    pub fn speed_for(&self, kind: EntityKind, elapsed_secs: f32) -> f32 {
        let class = self.class(kind);
        if self.is_boosted(elapsed_secs) {
            class.boosted_speed
        } else {
            class.speed
        }
    }

    /// Advances one step. Returns an order when the countdown runs out, after
    /// resetting it from the spawned class's interval.
    pub fn tick(&mut self, elapsed_secs: f32) -> Option<SpawnOrder> {
        self.countdown -= 1;
        if self.countdown > 0 {
            return None;
        }

        let kind = self.next_kind();
        let speed = self.speed_for(kind, elapsed_secs);
        let [min, max] = self.class(kind).spawn_interval;
        self.countdown = i64::from(self.rng.random_range(min..=max));
        self.spawned += 1;

        tracing::info!(
            "[spawner] {:?} at {:.1}s, speed={}, next in {} steps",
            kind,
            elapsed_secs,
            speed,
            self.countdown
        );
        Some(SpawnOrder { kind, speed })
    }

    fn next_kind(&mut self) -> EntityKind {
        match self.config.schedule {
            SpawnSchedule::Alternate => {
                if self.spawned % 2 == 0 {
                    EntityKind::GroundEnemy
                } else {
                    EntityKind::AirEnemy
                }
            }
            SpawnSchedule::Random => {
                if self.rng.random_bool(0.5) {
                    EntityKind::GroundEnemy
                } else {
                    EntityKind::AirEnemy
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawner(schedule: SpawnSchedule, seed: u64) -> Spawner {
        let config = SpawnConfig {
            schedule,
            initial_countdown: 1,
            ..SpawnConfig::default()
        };
        Spawner::new(config, 25.0, seed)
    }

    /// Ticks until the next order, returning it and the steps it took.
    fn next_order(spawner: &mut Spawner, elapsed_secs: f32) -> (SpawnOrder, u32) {
        for steps in 1..=1_000 {
            if let Some(order) = spawner.tick(elapsed_secs) {
                return (order, steps);
            }
        }
        panic!("spawner never fired");
    }

    #[test]
    fn test_initial_countdown() {
        let config = SpawnConfig {
            initial_countdown: 3,
            ..SpawnConfig::default()
        };
        let mut spawner = Spawner::new(config, 25.0, 1);
        assert!(spawner.tick(0.0).is_none());
        assert!(spawner.tick(0.0).is_none());
        assert!(spawner.tick(0.0).is_some());
    }

    #[test]
    fn test_countdown_reset_ranges() {
        let mut spawner = spawner(SpawnSchedule::Random, 99);
        let mut seen_ground = false;
        let mut seen_air = false;

        for _ in 0..200 {
            let (order, _) = next_order(&mut spawner, 0.0);
            let countdown = spawner.countdown();
            match order.kind {
                EntityKind::GroundEnemy => {
                    seen_ground = true;
                    assert!((100..=200).contains(&countdown), "ground reset {countdown}");
                }
                EntityKind::AirEnemy => {
                    seen_air = true;
                    assert!((250..=400).contains(&countdown), "air reset {countdown}");
                }
                other => panic!("unexpected kind {other:?}"),
            }
        }

        assert!(seen_ground && seen_air);
    }

    #[test]
    fn test_gap_between_spawns_matches_reset() {
        let mut spawner = spawner(SpawnSchedule::Alternate, 5);
        next_order(&mut spawner, 0.0);
        let expected = spawner.countdown();
        let (_, steps) = next_order(&mut spawner, 0.0);
        assert_eq!(i64::from(steps), expected);
    }

    #[test]
    fn test_alternate_schedule() {
        let mut spawner = spawner(SpawnSchedule::Alternate, 5);
        let kinds: Vec<EntityKind> = (0..4).map(|_| next_order(&mut spawner, 0.0).0.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::GroundEnemy,
                EntityKind::AirEnemy,
                EntityKind::GroundEnemy,
                EntityKind::AirEnemy
            ]
        );
    }

    #[test]
    fn test_difficulty_ramp_is_a_step_change() {
        let mut spawner = spawner(SpawnSchedule::Alternate, 5);

        let (ground, _) = next_order(&mut spawner, 10.0);
        let (air, _) = next_order(&mut spawner, 24.9);
        assert_eq!(ground.speed, 50.0);
        assert_eq!(air.speed, 100.0);

        let (ground, _) = next_order(&mut spawner, 25.1);
        let (air, _) = next_order(&mut spawner, 300.0);
        assert_eq!(ground.speed, 100.0);
        assert_eq!(air.speed, 200.0);
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let mut a = spawner(SpawnSchedule::Random, 42);
        let mut b = spawner(SpawnSchedule::Random, 42);
        for _ in 0..20 {
            assert_eq!(next_order(&mut a, 0.0), next_order(&mut b, 0.0));
        }
    }
}
