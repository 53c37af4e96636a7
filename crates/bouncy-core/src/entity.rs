//! Entity definitions and the registry of live bombs and enemies.

use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::config::{BombConfig, EnemyClassConfig, PlayfieldConfig};
use crate::error::CoreError;
use crate::force::ForcePolicy;
use crate::physics::PhysicsWorld;

/// Unique identifier for an entity, never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Tag selecting which gameplay effect, if any, applies to a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollisionCategory {
    Bomb,
    Enemy,
    Player,
    StaticGeometry,
}

/// Concrete entity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Bomb,
    GroundEnemy,
    AirEnemy,
    Player,
    StaticGeometry,
}

impl EntityKind {
    pub fn category(self) -> CollisionCategory {
        match self {
            Self::Bomb => CollisionCategory::Bomb,
            Self::GroundEnemy | Self::AirEnemy => CollisionCategory::Enemy,
            Self::Player => CollisionCategory::Player,
            Self::StaticGeometry => CollisionCategory::StaticGeometry,
        }
    }

    /// Player and static geometry never move and are never removed.
    pub fn is_fixture(self) -> bool {
        matches!(self, Self::Player | Self::StaticGeometry)
    }

    /// Type tag stored in the upper half of a collider's `user_data`.
    pub fn tag(self) -> u64 {
        match self {
            Self::Bomb => 1,
            Self::GroundEnemy => 2,
            Self::AirEnemy => 3,
            Self::Player => 4,
            Self::StaticGeometry => 5,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            1 => Some(Self::Bomb),
            2 => Some(Self::GroundEnemy),
            3 => Some(Self::AirEnemy),
            4 => Some(Self::Player),
            5 => Some(Self::StaticGeometry),
            _ => None,
        }
    }
}

/// Collider shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Circle { radius: f32 },
    Box { half_width: f32, half_height: f32 },
}

/// Everything needed to create one body+collider pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBlueprint {
    pub kind: EntityKind,
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub geometry: Geometry,
    pub mass: f32,
    pub elasticity: f32,
    pub friction: f32,
    /// Suppresses collisions with other members of the same category.
    pub grouped: bool,
    pub lock_rotation: bool,
    pub force: Option<ForcePolicy>,
}

impl EntityBlueprint {
    /// A bomb leaving the launch point with `launch` velocity.
    pub fn bomb(config: &BombConfig, launch: [f32; 2]) -> Self {
        Self {
            kind: EntityKind::Bomb,
            position: config.launch_position,
            velocity: launch,
            geometry: Geometry::Circle {
                radius: config.radius,
            },
            mass: config.mass,
            elasticity: config.elasticity,
            friction: config.friction,
            grouped: true,
            lock_rotation: false,
            force: Some(ForcePolicy::GravityPassthrough {
                gravity: config.launch_gravity,
            }),
        }
    }

    /// An enemy entering from the right edge, moving left at `speed`.
    ///
    /// Only `GroundEnemy` and `AirEnemy` are meaningful kinds here; anything
    /// else is treated as a ground enemy.
    pub fn enemy(
        kind: EntityKind,
        class: &EnemyClassConfig,
        playfield: &PlayfieldConfig,
        speed: f32,
    ) -> Self {
        let half = class.size / 2.0;
        let vx = -speed.abs();
        let (kind, y, force) = match kind {
            EntityKind::AirEnemy => (
                EntityKind::AirEnemy,
                class.altitude.unwrap_or(playfield.floor_top() - half),
                ForcePolicy::HoldAltitude { vx },
            ),
            _ => (
                EntityKind::GroundEnemy,
                class.altitude.unwrap_or(playfield.floor_top() - half),
                ForcePolicy::HoldGround { vx },
            ),
        };

        Self {
            kind,
            position: [playfield.right_bound + 20.0, y],
            velocity: [vx, 0.0],
            geometry: Geometry::Box {
                half_width: half,
                half_height: half,
            },
            mass: class.mass,
            elasticity: class.elasticity,
            friction: class.friction,
            grouped: true,
            lock_rotation: true,
            force: Some(force),
        }
    }

    pub fn player(playfield: &PlayfieldConfig) -> Self {
        Self::fixture(
            EntityKind::Player,
            playfield.player_center,
            Geometry::Box {
                half_width: playfield.player_half_extents[0],
                half_height: playfield.player_half_extents[1],
            },
            0.0,
            0.5,
        )
    }

    pub fn floor(playfield: &PlayfieldConfig) -> Self {
        Self::fixture(
            EntityKind::StaticGeometry,
            [playfield.floor_half_width, playfield.height],
            Geometry::Box {
                half_width: playfield.floor_half_width,
                half_height: playfield.floor_half_height,
            },
            playfield.floor_elasticity,
            playfield.floor_friction,
        )
    }

    fn fixture(
        kind: EntityKind,
        position: [f32; 2],
        geometry: Geometry,
        elasticity: f32,
        friction: f32,
    ) -> Self {
        Self {
            kind,
            position,
            velocity: [0.0, 0.0],
            geometry,
            mass: 0.0,
            elasticity,
            friction,
            grouped: false,
            lock_rotation: true,
            force: None,
        }
    }
}

/// A live entity: one rigid body and its collider.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
    pub geometry: Geometry,
}

impl Entity {
    pub fn category(&self) -> CollisionCategory {
        self.kind.category()
    }
}

/// Tracks live entities and keeps them in lockstep with the physics world.
///
/// Bombs and enemies are kept in insertion order. Fixtures (player, floor) are
/// registered once and never removed.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    bombs: Vec<Entity>,
    enemies: Vec<Entity>,
    fixtures: Vec<Entity>,
    next_id: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the body+collider in `world` and registers the entity.
    pub fn spawn(&mut self, world: &mut PhysicsWorld, blueprint: &EntityBlueprint) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let (body_handle, collider_handle) = world.add_entity(id, blueprint);
        let entity = Entity {
            id,
            kind: blueprint.kind,
            body_handle,
            collider_handle,
            geometry: blueprint.geometry,
        };

        match blueprint.kind.category() {
            CollisionCategory::Bomb => self.bombs.push(entity),
            CollisionCategory::Enemy => self.enemies.push(entity),
            CollisionCategory::Player | CollisionCategory::StaticGeometry => {
                self.fixtures.push(entity);
            }
        }

        tracing::debug!("[registry] spawned {:?} {:?}", blueprint.kind, id);
        id
    }

    /// Removes a bomb or enemy from the world, then from the registry.
    ///
    /// Returns `false` without touching anything if the entity is already gone
    /// or is a fixture.
    pub fn remove(&mut self, world: &mut PhysicsWorld, id: EntityId) -> bool {
        for list in [&mut self.bombs, &mut self.enemies] {
            if let Some(pos) = list.iter().position(|e| e.id == id) {
                world.remove_entity(&list[pos]);
                let entity = list.remove(pos);
                tracing::debug!("[registry] removed {:?} {:?}", entity.kind, id);
                return true;
            }
        }
        false
    }

    /// Removes bombs that flew above the top or left the screen sideways.
    ///
    /// Bombs below the bottom are kept: they bounce on the floor.
    pub fn prune_bombs(
        &mut self,
        world: &mut PhysicsWorld,
        left_bound: f32,
        right_bound: f32,
    ) -> Vec<EntityId> {
        let doomed: Vec<EntityId> = self
            .bombs
            .iter()
            .filter(|bomb| {
                world.position(bomb.body_handle).is_some_and(|[x, y]| {
                    y < 0.0 || x > right_bound || x < left_bound
                })
            })
            .map(|bomb| bomb.id)
            .collect();

        for &id in &doomed {
            self.remove(world, id);
        }
        doomed
    }

    /// Removes enemies that made it past the left boundary.
    pub fn prune_enemies(&mut self, world: &mut PhysicsWorld, left_bound: f32) -> Vec<EntityId> {
        let doomed: Vec<EntityId> = self
            .enemies
            .iter()
            .filter(|enemy| {
                world
                    .position(enemy.body_handle)
                    .is_some_and(|[x, _]| x < left_bound)
            })
            .map(|enemy| enemy.id)
            .collect();

        for &id in &doomed {
            self.remove(world, id);
        }
        doomed
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn bombs(&self) -> &[Entity] {
        &self.bombs
    }

    pub fn enemies(&self) -> &[Entity] {
        &self.enemies
    }

    pub fn fixtures(&self) -> &[Entity] {
        &self.fixtures
    }

    /// Fixtures, then bombs, then enemies, each in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.fixtures
            .iter()
            .chain(self.bombs.iter())
            .chain(self.enemies.iter())
    }

    pub fn len(&self) -> usize {
        self.fixtures.len() + self.bombs.len() + self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the position of an entity.
    pub fn position(&self, world: &PhysicsWorld, id: EntityId) -> Option<[f32; 2]> {
        self.get(id).and_then(|e| world.position(e.body_handle))
    }

    /// Gets the velocity of an entity.
    pub fn velocity(&self, world: &PhysicsWorld, id: EntityId) -> Option<[f32; 2]> {
        self.get(id).and_then(|e| world.velocity(e.body_handle))
    }

    /// Checks that every registered entity has its body+collider pair in
    /// `world` and that `world` holds nothing else.
    pub fn verify(&self, world: &PhysicsWorld) -> Result<(), CoreError> {
        for entity in self.iter() {
            world.verify_entity(entity)?;
        }
        if world.body_count() != self.len() || world.collider_count() != self.len() {
            return Err(CoreError::InvariantViolation {
                entity: None,
                detail: format!(
                    "registry holds {} entities but world holds {} bodies and {} colliders",
                    self.len(),
                    world.body_count(),
                    world.collider_count()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn bomb_at(registry: &mut EntityRegistry, world: &mut PhysicsWorld, x: f32, y: f32) -> EntityId {
        let mut blueprint = EntityBlueprint::bomb(&BombConfig::default(), [0.0, 0.0]);
        blueprint.position = [x, y];
        registry.spawn(world, &blueprint)
    }

    #[test]
    fn test_kind_tag_roundtrip() {
        for kind in [
            EntityKind::Bomb,
            EntityKind::GroundEnemy,
            EntityKind::AirEnemy,
            EntityKind::Player,
            EntityKind::StaticGeometry,
        ] {
            assert_eq!(EntityKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EntityKind::from_tag(0), None);
    }

    #[test]
    fn test_spawn_assigns_unique_ids() {
        let mut world = PhysicsWorld::new();
        let mut registry = EntityRegistry::new();

        let a = bomb_at(&mut registry, &mut world, 100.0, 100.0);
        let b = bomb_at(&mut registry, &mut world, 200.0, 100.0);

        assert_ne!(a, b);
        assert_eq!(registry.bombs().len(), 2);
        assert_eq!(world.body_count(), 2);
        assert!(registry.verify(&world).is_ok());
    }

    #[test]
    fn test_double_removal_is_a_noop() {
        let mut world = PhysicsWorld::new();
        let mut registry = EntityRegistry::new();
        let config = GameConfig::default();

        let enemy = registry.spawn(
            &mut world,
            &EntityBlueprint::enemy(
                EntityKind::GroundEnemy,
                &config.spawn.ground,
                &config.playfield,
                config.spawn.ground.speed,
            ),
        );

        assert!(registry.remove(&mut world, enemy));
        assert!(!registry.remove(&mut world, enemy));
        assert!(registry.enemies().is_empty());
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.collider_count(), 0);
        assert!(registry.verify(&world).is_ok());
    }

    #[test]
    fn test_fixtures_are_not_removable() {
        let mut world = PhysicsWorld::new();
        let mut registry = EntityRegistry::new();
        let player = registry.spawn(&mut world, &EntityBlueprint::player(&PlayfieldConfig::default()));

        assert!(!registry.remove(&mut world, player));
        assert!(registry.contains(player));
    }

    #[test]
    fn test_prune_bombs_bounds() {
        let mut world = PhysicsWorld::new();
        let mut registry = EntityRegistry::new();

        let above = bomb_at(&mut registry, &mut world, 300.0, -5.0);
        let right = bomb_at(&mut registry, &mut world, 650.0, 300.0);
        let left = bomb_at(&mut registry, &mut world, -5.0, 300.0);
        let below = bomb_at(&mut registry, &mut world, 300.0, 700.0);
        let inside = bomb_at(&mut registry, &mut world, 300.0, 300.0);

        let pruned = registry.prune_bombs(&mut world, 0.0, 600.0);

        assert_eq!(pruned, vec![above, right, left]);
        assert!(registry.contains(below));
        assert!(registry.contains(inside));
        for bomb in registry.bombs() {
            let [x, y] = world.position(bomb.body_handle).unwrap();
            assert!(y >= 0.0 && (0.0..=600.0).contains(&x));
        }
        assert!(registry.verify(&world).is_ok());
    }

    #[test]
    fn test_prune_enemies_past_left_bound() {
        let mut world = PhysicsWorld::new();
        let mut registry = EntityRegistry::new();
        let config = GameConfig::default();

        let mut blueprint = EntityBlueprint::enemy(
            EntityKind::AirEnemy,
            &config.spawn.air,
            &config.playfield,
            config.spawn.air.speed,
        );
        let visible = registry.spawn(&mut world, &blueprint);
        blueprint.position = [-40.0, 300.0];
        let escaped = registry.spawn(&mut world, &blueprint);

        assert_eq!(registry.prune_enemies(&mut world, 0.0), vec![escaped]);
        assert!(registry.contains(visible));
    }

    #[test]
    fn test_enemy_blueprint_placement() {
        let config = GameConfig::default();
        let ground = EntityBlueprint::enemy(
            EntityKind::GroundEnemy,
            &config.spawn.ground,
            &config.playfield,
            50.0,
        );
        assert_eq!(ground.position, [620.0, 575.0]);
        assert_eq!(ground.velocity, [-50.0, 0.0]);
        assert_eq!(ground.force, Some(ForcePolicy::HoldGround { vx: -50.0 }));

        let air = EntityBlueprint::enemy(EntityKind::AirEnemy, &config.spawn.air, &config.playfield, 100.0);
        assert_eq!(air.position, [620.0, 420.0]);
        assert_eq!(air.force, Some(ForcePolicy::HoldAltitude { vx: -100.0 }));
    }
}
