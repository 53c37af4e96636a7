//! Read-only view of a session for renderers and overlays.

use serde::Serialize;

use crate::entity::{CollisionCategory, EntityId, EntityKind, Geometry};
use crate::game::{Game, GamePhase};

/// Overlay help text.
pub const INSTRUCTIONS: [&str; 4] = [
    "Press ESC or Q to quit",
    "Press space to launch a bomb",
    "Press B to launch a low bomb",
    "Press RETURN to send an enemy",
];

/// One drawable entity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub category: CollisionCategory,
    pub geometry: Geometry,
    pub position: [f32; 2],
    pub angle: f32,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderSnapshot {
    pub frame: u64,
    pub phase: GamePhase,
    pub health: i32,
    pub entities: Vec<EntityView>,
    pub instructions: Vec<&'static str>,
}

impl RenderSnapshot {
    /// Create a snapshot from the current game.
    pub fn from_game(game: &Game) -> Self {
        let world = game.world();
        let entities = game
            .registry()
            .iter()
            .filter_map(|entity| {
                Some(EntityView {
                    id: entity.id,
                    kind: entity.kind,
                    category: entity.category(),
                    geometry: entity.geometry,
                    position: world.position(entity.body_handle)?,
                    angle: world.angle(entity.body_handle)?,
                })
            })
            .collect();

        Self {
            frame: game.current_frame(),
            phase: game.phase(),
            health: game.health(),
            entities,
            instructions: INSTRUCTIONS.to_vec(),
        }
    }

    /// Overlay headline: health while running, the end screen afterwards.
    pub fn status_line(&self) -> String {
        match self.phase {
            GamePhase::Running => format!("Health: {}", self.health),
            GamePhase::GameOver => "GAME OVER".to_string(),
        }
    }
}

impl Game {
    /// Create a render snapshot of the current state.
    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot::from_game(self)
    }
}
