//! Physics simulation using `Rapier2D` with deterministic behavior.
//!
//! [`PhysicsWorld`] is the only place entity bodies and colliders are created
//! or destroyed. It applies each body's [`ForcePolicy`] in place of the
//! solver's gravity and reports contact transitions as [`ContactEvent`]s.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{PHYSICS_DT, PhysicsConfig};
use crate::entity::{
    CollisionCategory, Entity, EntityBlueprint, EntityId, EntityKind, Geometry,
};
use crate::error::CoreError;
use crate::force::ForcePolicy;

/// Default gravity vector (downward, in units/s²).
pub fn default_gravity() -> Vector {
    Vector::new(0.0, 900.0)
}

/// Encodes an entity kind and id into u128 `user_data`.
pub fn encode_user_data(kind: EntityKind, id: EntityId) -> u128 {
    (u128::from(kind.tag()) << 64) | u128::from(id.0)
}

/// Decodes u128 `user_data` into (kind, id).
#[allow(clippy::cast_possible_truncation)]
pub fn decode_user_data(user_data: u128) -> Option<(EntityKind, EntityId)> {
    let kind = EntityKind::from_tag((user_data >> 64) as u64)?;
    Some((kind, EntityId(user_data as u64)))
}

/// Whether two colliders started or stopped touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactPhase {
    Begin,
    Separate,
}

/// One side of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactParty {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl ContactParty {
    pub fn category(&self) -> CollisionCategory {
        self.kind.category()
    }
}

/// A contact transition reported by one physics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactEvent {
    pub phase: ContactPhase,
    pub a: ContactParty,
    pub b: ContactParty,
}

impl ContactEvent {
    pub fn begin(a: ContactParty, b: ContactParty) -> Self {
        Self {
            phase: ContactPhase::Begin,
            a,
            b,
        }
    }

    pub fn separate(a: ContactParty, b: ContactParty) -> Self {
        Self {
            phase: ContactPhase::Separate,
            a,
            b,
        }
    }

    /// Returns the party of `category`, then the other one, if the event
    /// involves `category`.
    pub fn split(&self, category: CollisionCategory) -> Option<(ContactParty, ContactParty)> {
        if self.a.category() == category {
            Some((self.a, self.b))
        } else if self.b.category() == category {
            Some((self.b, self.a))
        } else {
            None
        }
    }

    fn sort_key(&self) -> (EntityId, EntityId) {
        (self.a.id.min(self.b.id), self.a.id.max(self.b.id))
    }
}

/// Buffers solver collision events during a step.
#[derive(Default)]
struct EventBuffer {
    events: Mutex<Vec<CollisionEvent>>,
}

impl EventHandler for EventBuffer {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.events.lock().push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Physics world containing all `Rapier2D` components for deterministic simulation.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub gravity: Vector,
    pub damping: f32,
    overrides: HashMap<RigidBodyHandle, ForcePolicy>,
    frame: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default settings.
    pub fn new() -> Self {
        Self::with_gravity(default_gravity())
    }

    /// Creates a new physics world with custom gravity.
    pub fn with_gravity(gravity: Vector) -> Self {
        Self::with_parameters(gravity, PHYSICS_DT, 1.0)
    }

    /// Creates a physics world from session config.
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::with_parameters(
            Vector::new(config.gravity[0], config.gravity[1]),
            config.dt,
            config.damping,
        )
    }

    fn with_parameters(gravity: Vector, dt: f32, damping: f32) -> Self {
        let integration_parameters = IntegrationParameters {
            dt,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity,
            damping,
            overrides: HashMap::new(),
            frame: 0,
        }
    }

    /// Fixed timestep length.
    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    /// Advances the simulation by one fixed timestep and returns the contact
    /// transitions it produced, ordered by entity id pair.
    pub fn step(&mut self) -> Vec<ContactEvent> {
        self.apply_force_overrides();

        let buffer = EventBuffer::default();
        self.physics_pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            &(),
            &buffer,
        );
        self.frame += 1;

        let raw = buffer.events.into_inner();
        let mut events: Vec<ContactEvent> = raw
            .into_iter()
            .filter_map(|event| match event {
                CollisionEvent::Started(h1, h2, _flags) => Some(ContactEvent::begin(
                    self.contact_party(h1)?,
                    self.contact_party(h2)?,
                )),
                CollisionEvent::Stopped(h1, h2, _flags) => Some(ContactEvent::separate(
                    self.contact_party(h1)?,
                    self.contact_party(h2)?,
                )),
            })
            .collect();

        // Stable: a begin and a separate of the same pair keep solver order.
        events.sort_by_key(ContactEvent::sort_key);
        events
    }

    /// Advances the physics simulation by multiple steps, discarding contacts.
    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    fn apply_force_overrides(&mut self) {
        let gravity = [self.gravity.x, self.gravity.y];
        let dt = self.dt();
        for (&handle, policy) in &self.overrides {
            let Some(body) = self.rigid_body_set.get_mut(handle) else {
                continue;
            };
            let linvel = body.linvel();
            let [vx, vy] = policy.apply([linvel.x, linvel.y], gravity, self.damping, dt);
            body.set_linvel(Vector::new(vx, vy), true);
        }
    }

    /// Maps a collider to the entity stored in its `user_data`. Colliders
    /// removed since the event was raised map to `None`.
    fn contact_party(&self, handle: ColliderHandle) -> Option<ContactParty> {
        let collider = self.collider_set.get(handle)?;
        let (kind, id) = decode_user_data(collider.user_data)?;
        Some(ContactParty { id, kind })
    }

    /// Creates the rigid body and collider for an entity.
    pub fn add_entity(
        &mut self,
        id: EntityId,
        blueprint: &EntityBlueprint,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let user_data = encode_user_data(blueprint.kind, id);
        let translation = Vector::new(blueprint.position[0], blueprint.position[1]);

        let builder = if blueprint.kind.is_fixture() {
            RigidBodyBuilder::fixed().translation(translation)
        } else {
            RigidBodyBuilder::dynamic()
                .translation(translation)
                .linvel(Vector::new(blueprint.velocity[0], blueprint.velocity[1]))
                .gravity_scale(0.0)
                .ccd_enabled(true)
        };
        let builder = if blueprint.lock_rotation {
            builder.lock_rotations()
        } else {
            builder
        };
        let body_handle = self
            .rigid_body_set
            .insert(builder.user_data(user_data).build());

        let shape = match blueprint.geometry {
            Geometry::Circle { radius } => ColliderBuilder::ball(radius),
            Geometry::Box {
                half_width,
                half_height,
            } => ColliderBuilder::cuboid(half_width, half_height),
        };
        let shape = match blueprint.kind.category() {
            CollisionCategory::Player | CollisionCategory::StaticGeometry => shape,
            CollisionCategory::Bomb => shape.mass(blueprint.mass),
            // Enemies slide: their horizontal speed is owned by the force policy.
            CollisionCategory::Enemy => shape
                .mass(blueprint.mass)
                .friction_combine_rule(CoefficientCombineRule::Min),
        };
        let collider = shape
            .restitution(blueprint.elasticity)
            .friction(blueprint.friction)
            .collision_groups(interaction_groups(blueprint.kind.category(), blueprint.grouped))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(user_data)
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        if let Some(policy) = blueprint.force {
            self.overrides.insert(body_handle, policy);
        }

        (body_handle, collider_handle)
    }

    /// Removes an entity's rigid body together with its collider.
    ///
    /// Returns `false` if the body is already gone.
    pub fn remove_entity(&mut self, entity: &Entity) -> bool {
        self.overrides.remove(&entity.body_handle);
        self.rigid_body_set
            .remove(
                entity.body_handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// Checks that the entity's body exists, owns exactly its collider, and
    /// that the collider points back at the body.
    pub fn verify_entity(&self, entity: &Entity) -> Result<(), CoreError> {
        let violation = |detail: &str| CoreError::InvariantViolation {
            entity: Some(entity.id),
            detail: detail.to_string(),
        };

        let body = self
            .rigid_body_set
            .get(entity.body_handle)
            .ok_or_else(|| violation("rigid body missing"))?;
        let collider = self
            .collider_set
            .get(entity.collider_handle)
            .ok_or_else(|| violation("collider missing"))?;
        if collider.parent() != Some(entity.body_handle) {
            return Err(violation("collider not attached to its body"));
        }
        if body.colliders().len() != 1 {
            return Err(violation("body does not own exactly one collider"));
        }
        if decode_user_data(collider.user_data) != Some((entity.kind, entity.id)) {
            return Err(violation("collider user_data does not match entity"));
        }
        Ok(())
    }

    /// Gets the translation of a body.
    pub fn position(&self, handle: RigidBodyHandle) -> Option<[f32; 2]> {
        self.rigid_body_set.get(handle).map(|body| {
            let pos = body.translation();
            [pos.x, pos.y]
        })
    }

    /// Gets the linear velocity of a body.
    pub fn velocity(&self, handle: RigidBodyHandle) -> Option<[f32; 2]> {
        self.rigid_body_set.get(handle).map(|body| {
            let vel = body.linvel();
            [vel.x, vel.y]
        })
    }

    /// Gets the rotation angle of a body in radians.
    pub fn angle(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.rigid_body_set
            .get(handle)
            .map(|body| body.rotation().angle())
    }

    /// Gets the force policy attached to a body.
    pub fn force_policy(&self, handle: RigidBodyHandle) -> Option<ForcePolicy> {
        self.overrides.get(&handle).copied()
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    /// Computes a deterministic hash of the current physics state.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.frame.hash(&mut hasher);

        for (handle, body) in self.rigid_body_set.iter() {
            let (index, generation) = handle.into_raw_parts();
            index.hash(&mut hasher);
            generation.hash(&mut hasher);

            let pos = body.translation();
            hash_f32(pos.x, &mut hasher);
            hash_f32(pos.y, &mut hasher);

            let rot = body.rotation().angle();
            hash_f32(rot, &mut hasher);

            let linvel = body.linvel();
            hash_f32(linvel.x, &mut hasher);
            hash_f32(linvel.y, &mut hasher);

            let angvel = body.angvel();
            hash_f32(angvel, &mut hasher);
        }

        hasher.finish()
    }

    /// Returns the current simulation frame number.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }
}

/// Category membership, optionally excluding collisions with the same category.
fn interaction_groups(category: CollisionCategory, grouped: bool) -> InteractionGroups {
    let membership = match category {
        CollisionCategory::Bomb => Group::GROUP_1,
        CollisionCategory::Enemy => Group::GROUP_2,
        CollisionCategory::Player => Group::GROUP_3,
        CollisionCategory::StaticGeometry => Group::GROUP_4,
    };
    let filter = if grouped {
        Group::ALL.difference(membership)
    } else {
        Group::ALL
    };
    InteractionGroups::all()
        .with_memberships(membership)
        .with_filter(filter)
}

/// Hashes a f32 value by converting to bits.
fn hash_f32(value: f32, hasher: &mut impl Hasher) {
    value.to_bits().hash(hasher);
}
