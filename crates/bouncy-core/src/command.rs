//! Discrete per-frame input commands.

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;

/// Enemy class for manual spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyClass {
    Ground,
    Air,
}

impl EnemyClass {
    pub fn kind(self) -> EntityKind {
        match self {
            Self::Ground => EntityKind::GroundEnemy,
            Self::Air => EntityKind::AirEnemy,
        }
    }
}

/// Edge-triggered action collected from the input layer for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputCommand {
    /// Stop the run loop.
    Quit,
    /// Steep, fast bomb.
    LaunchHighBomb,
    /// Flat, slower bomb.
    LaunchLowBomb,
    /// Spawn an enemy immediately, outside the spawner's schedule.
    SpawnEnemy(EnemyClass),
}

impl InputCommand {
    /// Whether the command changes gameplay and is therefore ignored after
    /// game over.
    pub fn is_gameplay(self) -> bool {
        !matches!(self, Self::Quit)
    }
}
