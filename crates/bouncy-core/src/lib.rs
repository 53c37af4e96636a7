//! Bouncy-Bombs Core Library
//!
//! Physics-driven gameplay for a 2D arcade game: the player lobs bombs at
//! enemies walking and flying in from the right, built on `Rapier2D` with a
//! fixed timestep and seeded randomness so sessions replay exactly.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod collision;
pub mod command;
pub mod config;
pub mod entity;
pub mod error;
pub mod force;
pub mod game;
pub mod physics;
pub mod snapshot;
pub mod spawner;

pub use collision::{CollisionResolver, ContactEffect, PairTable, ResolveOutcome};
pub use command::{EnemyClass, InputCommand};
pub use config::{GameConfig, PHYSICS_DT, SpawnSchedule};
pub use entity::{CollisionCategory, Entity, EntityBlueprint, EntityId, EntityKind, EntityRegistry, Geometry};
pub use error::{ConfigError, CoreError};
pub use force::ForcePolicy;
pub use game::{FrameReport, Game, GamePhase, GameState};
pub use physics::{ContactEvent, ContactPhase, PhysicsWorld, default_gravity};
pub use snapshot::{EntityView, RenderSnapshot};
pub use spawner::{SpawnOrder, Spawner};
