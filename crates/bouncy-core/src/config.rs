//! Tunable parameters for a play session.
//!
//! Everything is loaded from JSON with per-field defaults, so an empty object
//! `{}` yields the classic setup.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed timestep for physics simulation (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// How the spawner picks the class of the next enemy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpawnSchedule {
    /// Uniform coin flip between ground and air.
    #[default]
    Random,
    /// Ground, air, ground, air, ...
    Alternate,
}

/// Screen and static geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayfieldConfig {
    pub width: f32,
    pub height: f32,
    /// Bombs and enemies with `x` below this are off screen.
    pub left_bound: f32,
    /// Bombs with `x` above this are off screen. Defaults to `width`.
    pub right_bound: f32,
    pub floor_half_width: f32,
    pub floor_half_height: f32,
    pub floor_elasticity: f32,
    pub floor_friction: f32,
    pub player_center: [f32; 2],
    pub player_half_extents: [f32; 2],
}

impl Default for PlayfieldConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 600.0,
            left_bound: 0.0,
            right_bound: 600.0,
            floor_half_width: 400.0,
            floor_half_height: 10.0,
            floor_elasticity: 0.9,
            floor_friction: 0.9,
            player_center: [20.0, 300.0],
            player_half_extents: [15.0, 300.0],
        }
    }
}

impl PlayfieldConfig {
    /// Y coordinate of the floor's walkable surface.
    pub fn floor_top(&self) -> f32 {
        self.height - self.floor_half_height
    }
}

/// Gravity, timestep and velocity damping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// World gravity in units/s², +y pointing down.
    pub gravity: [f32; 2],
    pub dt: f32,
    /// Per-step velocity multiplier; 1.0 means no damping.
    pub damping: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 900.0],
            dt: PHYSICS_DT,
            damping: 1.0,
        }
    }
}

/// Health, damage and state machine behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub starting_health: i32,
    pub contact_damage: i32,
    /// Simulated seconds after which newly spawned enemies use their boosted speed.
    pub difficulty_threshold_secs: f32,
    /// Steps an enemy may stay pressed against the player before it is destroyed
    /// anyway. `None` waits for the separation event only.
    pub max_player_contact_steps: Option<u32>,
    /// Stop stepping the world once the game is over.
    pub freeze_on_game_over: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            starting_health: 100,
            contact_damage: 20,
            difficulty_threshold_secs: 25.0,
            max_player_contact_steps: Some(45),
            freeze_on_game_over: true,
        }
    }
}

/// Projectile parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BombConfig {
    pub radius: f32,
    pub mass: f32,
    pub elasticity: f32,
    pub friction: f32,
    pub launch_position: [f32; 2],
    /// Gravity applied to bombs regardless of the world setting.
    pub launch_gravity: [f32; 2],
    pub high_launch: [f32; 2],
    pub low_launch: [f32; 2],
}

impl Default for BombConfig {
    fn default() -> Self {
        Self {
            radius: 10.0,
            mass: 10.0,
            elasticity: 0.8,
            friction: 0.9,
            launch_position: [50.0, 550.0],
            launch_gravity: [0.0, 900.0],
            high_launch: [200.0, -900.0],
            low_launch: [250.0, -400.0],
        }
    }
}

/// Parameters of one enemy class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnemyClassConfig {
    /// Leftward speed before the difficulty threshold.
    pub speed: f32,
    /// Leftward speed after the difficulty threshold.
    pub boosted_speed: f32,
    /// Inclusive range of steps until the next spawn after this class spawns.
    pub spawn_interval: [u32; 2],
    /// Spawn height. `None` rests the enemy on the floor.
    pub altitude: Option<f32>,
    pub size: f32,
    pub mass: f32,
    pub elasticity: f32,
    pub friction: f32,
}

impl EnemyClassConfig {
    pub fn ground() -> Self {
        Self {
            speed: 50.0,
            boosted_speed: 100.0,
            spawn_interval: [100, 200],
            altitude: None,
            size: 30.0,
            mass: 10.0,
            elasticity: 0.9,
            friction: 0.0,
        }
    }

    pub fn air() -> Self {
        Self {
            speed: 100.0,
            boosted_speed: 200.0,
            spawn_interval: [250, 400],
            altitude: Some(420.0),
            ..Self::ground()
        }
    }
}

impl Default for EnemyClassConfig {
    fn default() -> Self {
        Self::ground()
    }
}

/// Spawner parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpawnConfig {
    pub schedule: SpawnSchedule,
    pub initial_countdown: u32,
    pub ground: EnemyClassConfig,
    pub air: EnemyClassConfig,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            schedule: SpawnSchedule::Random,
            initial_countdown: 60,
            ground: EnemyClassConfig::ground(),
            air: EnemyClassConfig::air(),
        }
    }
}

/// Complete session configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub seed: u64,
    pub playfield: PlayfieldConfig,
    pub physics: PhysicsConfig,
    pub rules: RulesConfig,
    pub bomb: BombConfig,
    pub spawn: SpawnConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            playfield: PlayfieldConfig::default(),
            physics: PhysicsConfig::default(),
            rules: RulesConfig::default(),
            bomb: BombConfig::default(),
            spawn: SpawnConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.physics.dt > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "physics.dt must be positive, got {}",
                self.physics.dt
            )));
        }
        if self.rules.starting_health <= 0 {
            return Err(ConfigError::Invalid(
                "rules.starting_health must be positive".to_string(),
            ));
        }
        if self.playfield.left_bound >= self.playfield.right_bound {
            return Err(ConfigError::Invalid(
                "playfield.left_bound must be below right_bound".to_string(),
            ));
        }
        if self.bomb.radius <= 0.0 || self.bomb.mass <= 0.0 {
            return Err(ConfigError::Invalid(
                "bomb radius and mass must be positive".to_string(),
            ));
        }
        for (name, class) in [("ground", &self.spawn.ground), ("air", &self.spawn.air)] {
            let [min, max] = class.spawn_interval;
            if min == 0 || min > max {
                return Err(ConfigError::Invalid(format!(
                    "spawn.{name}.spawn_interval must be a non-empty positive range, got [{min}, {max}]"
                )));
            }
            if class.size <= 0.0 || class.mass <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "spawn.{name} size and mass must be positive"
                )));
            }
        }
        Ok(())
    }
}
