//! Category-pair table and the resolver that turns contacts into gameplay.
//!
//! Resolution runs in two phases per step: every contact event is first mapped
//! to an [`EffectRequest`] through the [`PairTable`], then the requests are
//! applied in order. Removals go through [`EntityRegistry::remove`], so an
//! entity already destroyed earlier in the same step is skipped.

use std::collections::{BTreeMap, HashMap};

use crate::entity::{CollisionCategory, EntityId, EntityRegistry};
use crate::game::GameState;
use crate::physics::{ContactEvent, ContactPhase, PhysicsWorld};

/// Gameplay consequence of a contact transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEffect {
    /// Enemy hit the player: subtract contact damage.
    DamagePlayer,
    /// Enemy is done with the player: remove it.
    DestroyEnemy,
    /// Bomb struck an enemy: remove both.
    DestroyBoth,
}

/// Effects for the two contact phases of a category pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairPolicy {
    pub on_begin: Option<ContactEffect>,
    pub on_separate: Option<ContactEffect>,
}

/// Fixed mapping of unordered category pairs to effects, built once.
#[derive(Debug, Clone)]
pub struct PairTable {
    entries: HashMap<(CollisionCategory, CollisionCategory), PairPolicy>,
}

impl Default for PairTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl PairTable {
    /// Player–Enemy: damage on begin, destroy on separate.
    /// Bomb–Enemy: destroy both on begin.
    pub fn standard() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            normalize(CollisionCategory::Player, CollisionCategory::Enemy),
            PairPolicy {
                on_begin: Some(ContactEffect::DamagePlayer),
                on_separate: Some(ContactEffect::DestroyEnemy),
            },
        );
        entries.insert(
            normalize(CollisionCategory::Bomb, CollisionCategory::Enemy),
            PairPolicy {
                on_begin: Some(ContactEffect::DestroyBoth),
                on_separate: None,
            },
        );
        Self { entries }
    }

    pub fn policy(&self, a: CollisionCategory, b: CollisionCategory) -> Option<&PairPolicy> {
        self.entries.get(&normalize(a, b))
    }

    /// Effect of `event`, or `None` for unpaired categories.
    pub fn effect(&self, event: &ContactEvent) -> Option<ContactEffect> {
        let policy = self.policy(event.a.category(), event.b.category())?;
        match event.phase {
            ContactPhase::Begin => policy.on_begin,
            ContactPhase::Separate => policy.on_separate,
        }
    }
}

fn normalize(
    a: CollisionCategory,
    b: CollisionCategory,
) -> (CollisionCategory, CollisionCategory) {
    if a <= b { (a, b) } else { (b, a) }
}

/// An effect waiting to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectRequest {
    pub effect: ContactEffect,
    pub event: ContactEvent,
}

/// What one resolution pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub damage_taken: i32,
    pub destroyed: Vec<EntityId>,
    /// Requests dropped because an entity was already gone or the contact was
    /// already counted.
    pub skipped: usize,
}

/// Applies contact effects to the world, registry and game state.
#[derive(Debug, Clone)]
pub struct CollisionResolver {
    table: PairTable,
    contact_damage: i32,
    max_contact_steps: Option<u32>,
    /// Enemies currently touching the player, with steps spent touching.
    pressing: BTreeMap<EntityId, u32>,
}

impl CollisionResolver {
    pub fn new(contact_damage: i32, max_contact_steps: Option<u32>) -> Self {
        Self {
            table: PairTable::standard(),
            contact_damage,
            max_contact_steps,
            pressing: BTreeMap::new(),
        }
    }

    pub fn table(&self) -> &PairTable {
        &self.table
    }

    /// Enemies currently pressed against the player.
    pub fn pressing(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.pressing.keys().copied()
    }

    /// Maps events to effect requests without touching any state.
    pub fn collect(&self, events: &[ContactEvent]) -> Vec<EffectRequest> {
        events
            .iter()
            .filter_map(|event| {
                self.table.effect(event).map(|effect| EffectRequest {
                    effect,
                    event: *event,
                })
            })
            .collect()
    }

    /// Applies one step's contacts, then destroys enemies that overstayed
    /// their contact with the player.
    pub fn resolve(
        &mut self,
        events: &[ContactEvent],
        world: &mut PhysicsWorld,
        registry: &mut EntityRegistry,
        state: &mut GameState,
    ) -> ResolveOutcome {
        let mut outcome = ResolveOutcome::default();

        for request in self.collect(events) {
            self.apply(request, world, registry, state, &mut outcome);
        }
        self.age_contacts(world, registry, &mut outcome);

        outcome
    }

    /// Drops contact tracking without applying anything.
    pub fn clear(&mut self) {
        self.pressing.clear();
    }

    fn apply(
        &mut self,
        request: EffectRequest,
        world: &mut PhysicsWorld,
        registry: &mut EntityRegistry,
        state: &mut GameState,
        outcome: &mut ResolveOutcome,
    ) {
        let Some((enemy, other)) = request.event.split(CollisionCategory::Enemy) else {
            outcome.skipped += 1;
            return;
        };

        match request.effect {
            ContactEffect::DamagePlayer => {
                if !registry.contains(enemy.id) || self.pressing.contains_key(&enemy.id) {
                    outcome.skipped += 1;
                    return;
                }
                self.pressing.insert(enemy.id, 0);
                state.apply_damage(self.contact_damage);
                outcome.damage_taken += self.contact_damage;
                tracing::info!(
                    "[collision] {:?} hit the player, health={}",
                    enemy.id,
                    state.health()
                );
            }
            ContactEffect::DestroyEnemy => {
                self.pressing.remove(&enemy.id);
                if registry.remove(world, enemy.id) {
                    outcome.destroyed.push(enemy.id);
                    tracing::debug!("[collision] {:?} left the player and vanished", enemy.id);
                } else {
                    outcome.skipped += 1;
                }
            }
            ContactEffect::DestroyBoth => {
                if !registry.contains(enemy.id) || !registry.contains(other.id) {
                    outcome.skipped += 1;
                    return;
                }
                self.pressing.remove(&enemy.id);
                registry.remove(world, other.id);
                registry.remove(world, enemy.id);
                outcome.destroyed.push(other.id);
                outcome.destroyed.push(enemy.id);
                tracing::info!("[collision] {:?} destroyed {:?}", other.id, enemy.id);
            }
        }
    }

    fn age_contacts(
        &mut self,
        world: &mut PhysicsWorld,
        registry: &mut EntityRegistry,
        outcome: &mut ResolveOutcome,
    ) {
        self.pressing.retain(|id, _| registry.contains(*id));
        for steps in self.pressing.values_mut() {
            *steps += 1;
        }

        let Some(max) = self.max_contact_steps else {
            return;
        };
        let expired: Vec<EntityId> = self
            .pressing
            .iter()
            .filter(|&(_, &steps)| steps > max)
            .map(|(&id, _)| id)
            .collect();
        for id in expired {
            self.pressing.remove(&id);
            if registry.remove(world, id) {
                outcome.destroyed.push(id);
                tracing::debug!("[collision] {:?} pinned against the player, removed", id);
            }
        }
    }
}
