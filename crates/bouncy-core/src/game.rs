//! Game state machine and the per-frame update.

use serde::{Deserialize, Serialize};

use crate::collision::{CollisionResolver, ResolveOutcome};
use crate::command::InputCommand;
use crate::config::GameConfig;
use crate::entity::{EntityBlueprint, EntityId, EntityKind, EntityRegistry};
use crate::error::CoreError;
use crate::physics::PhysicsWorld;
use crate::spawner::Spawner;

/// Game phase. `GameOver` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Running,
    GameOver,
}

/// Health, phase and elapsed steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    phase: GamePhase,
    health: i32,
    elapsed_steps: u64,
}

impl GameState {
    pub fn new(starting_health: i32) -> Self {
        Self {
            phase: GamePhase::Running,
            health: starting_health,
            elapsed_steps: 0,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn elapsed_steps(&self) -> u64 {
        self.elapsed_steps
    }

    /// Simulated seconds played.
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_secs(&self, dt: f32) -> f32 {
        self.elapsed_steps as f32 * dt
    }

    /// Subtracts `amount` from health. Ignored once the game is over.
    pub fn apply_damage(&mut self, amount: i32) {
        if self.is_running() {
            self.health -= amount;
        }
    }

    /// Moves to `GameOver` if health is depleted. Returns true on the
    /// transition.
    pub fn evaluate(&mut self) -> bool {
        if self.is_running() && self.health <= 0 {
            self.phase = GamePhase::GameOver;
            return true;
        }
        false
    }

    fn advance(&mut self) {
        self.elapsed_steps += 1;
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Contact transitions reported by the physics step.
    pub contacts: usize,
    pub launched: Vec<EntityId>,
    pub spawned: Vec<EntityId>,
    pub pruned: Vec<EntityId>,
    pub collisions: ResolveOutcome,
    /// Set on the frame the game ends.
    pub game_over: bool,
    pub quit: bool,
}

/// A play session: physics world, live entities, rules and spawner.
#[derive(Debug)]
pub struct Game {
    config: GameConfig,
    world: PhysicsWorld,
    registry: EntityRegistry,
    resolver: CollisionResolver,
    spawner: Spawner,
    state: GameState,
    player: EntityId,
    quit_requested: bool,
}

impl Game {
    /// Validates `config` and builds the playfield.
    pub fn new(config: GameConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let mut world = PhysicsWorld::from_config(&config.physics);
        let mut registry = EntityRegistry::new();
        registry.spawn(&mut world, &EntityBlueprint::floor(&config.playfield));
        let player = registry.spawn(&mut world, &EntityBlueprint::player(&config.playfield));

        let resolver = CollisionResolver::new(
            config.rules.contact_damage,
            config.rules.max_player_contact_steps,
        );
        let spawner = Spawner::new(
            config.spawn.clone(),
            config.rules.difficulty_threshold_secs,
            config.seed,
        );

        tracing::info!("[game] session started, seed={}", config.seed);

        Ok(Self {
            state: GameState::new(config.rules.starting_health),
            config,
            world,
            registry,
            resolver,
            spawner,
            player,
            quit_requested: false,
        })
    }

    /// Runs one frame: physics step, input, cleanup, contact effects,
    /// spawning, then the state machine.
    pub fn tick(&mut self, commands: &[InputCommand]) -> FrameReport {
        let mut report = FrameReport::default();

        if commands.contains(&InputCommand::Quit) {
            self.quit_requested = true;
        }
        report.quit = self.quit_requested;

        if !self.state.is_running() && self.config.rules.freeze_on_game_over {
            report.frame = self.world.current_frame();
            return report;
        }

        let events = self.world.step();
        report.frame = self.world.current_frame();
        report.contacts = events.len();

        for &command in commands {
            match command {
                InputCommand::Quit => {}
                InputCommand::LaunchHighBomb => {
                    report.launched.extend(self.launch_bomb(self.config.bomb.high_launch));
                }
                InputCommand::LaunchLowBomb => {
                    report.launched.extend(self.launch_bomb(self.config.bomb.low_launch));
                }
                InputCommand::SpawnEnemy(class) => {
                    report.spawned.extend(self.spawn_enemy(class.kind()));
                }
            }
        }

        let playfield = &self.config.playfield;
        report.pruned = self.registry.prune_bombs(
            &mut self.world,
            playfield.left_bound,
            playfield.right_bound,
        );
        report
            .pruned
            .extend(self.registry.prune_enemies(&mut self.world, playfield.left_bound));

        if self.state.is_running() {
            report.collisions =
                self.resolver
                    .resolve(&events, &mut self.world, &mut self.registry, &mut self.state);

            let elapsed = self.elapsed_secs();
            if let Some(order) = self.spawner.tick(elapsed) {
                report.spawned.extend(self.spawn_enemy_at_speed(order.kind, order.speed));
            }
        } else {
            self.resolver.clear();
        }

        self.state.advance();
        if self.state.evaluate() {
            report.game_over = true;
            tracing::info!(
                "[game] game over after {:.1}s, health={}",
                self.elapsed_secs(),
                self.state.health()
            );
        }

        if cfg!(debug_assertions) {
            if let Err(err) = self.verify_consistency() {
                panic!("{err}");
            }
        }

        report
    }

    /// Launches a bomb from the player. Returns `None` after game over.
    pub fn launch_bomb(&mut self, velocity: [f32; 2]) -> Option<EntityId> {
        if !self.state.is_running() {
            return None;
        }
        let blueprint = EntityBlueprint::bomb(&self.config.bomb, velocity);
        let id = self.registry.spawn(&mut self.world, &blueprint);
        tracing::debug!("[game] launched {:?} with velocity {:?}", id, velocity);
        Some(id)
    }

    /// Spawns an enemy at the current difficulty. Returns `None` after game
    /// over or for non-enemy kinds.
    pub fn spawn_enemy(&mut self, kind: EntityKind) -> Option<EntityId> {
        let speed = self.spawner.speed_for(kind, self.elapsed_secs());
        self.spawn_enemy_at_speed(kind, speed)
    }

    fn spawn_enemy_at_speed(&mut self, kind: EntityKind, speed: f32) -> Option<EntityId> {
        if !self.state.is_running() {
            return None;
        }
        let class = match kind {
            EntityKind::GroundEnemy => &self.config.spawn.ground,
            EntityKind::AirEnemy => &self.config.spawn.air,
            _ => return None,
        };
        let blueprint = EntityBlueprint::enemy(kind, class, &self.config.playfield, speed);
        Some(self.registry.spawn(&mut self.world, &blueprint))
    }

    /// Checks that the registry and the physics world agree.
    pub fn verify_consistency(&self) -> Result<(), CoreError> {
        self.registry.verify(&self.world)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase()
    }

    pub fn health(&self) -> i32 {
        self.state.health()
    }

    pub fn player(&self) -> EntityId {
        self.player
    }

    /// Steps until the spawner fires.
    pub fn spawn_countdown(&self) -> i64 {
        self.spawner.countdown()
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.state.elapsed_secs(self.world.dt())
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Returns the current frame number.
    pub fn current_frame(&self) -> u64 {
        self.world.current_frame()
    }

    /// Computes a hash of the current physics state.
    pub fn compute_hash(&self) -> u64 {
        self.world.compute_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::EnemyClass;
    use crate::config::SpawnSchedule;
    use crate::physics::{ContactEvent, ContactParty};

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig::default();
        // Keep the spawner out of the way unless a test wants it
        config.spawn.initial_countdown = 100_000;
        config
    }

    fn setup_game() -> Game {
        Game::new(quiet_config()).unwrap()
    }

    fn hit_player(game: &mut Game, enemy: EntityId) {
        let event = ContactEvent::begin(
            ContactParty {
                id: game.player,
                kind: EntityKind::Player,
            },
            ContactParty {
                id: enemy,
                kind: EntityKind::GroundEnemy,
            },
        );
        game.resolver
            .resolve(&[event], &mut game.world, &mut game.registry, &mut game.state);
    }

    #[test]
    fn test_game_creation() {
        let game = setup_game();
        assert_eq!(game.phase(), GamePhase::Running);
        assert_eq!(game.health(), 100);
        assert_eq!(game.registry().fixtures().len(), 2);
        assert!(game.registry().bombs().is_empty());
        assert!(game.verify_consistency().is_ok());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = GameConfig::default();
        config.rules.starting_health = 0;
        assert!(matches!(Game::new(config), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_launch_commands() {
        let mut game = setup_game();

        let report = game.tick(&[InputCommand::LaunchHighBomb, InputCommand::LaunchLowBomb]);
        assert_eq!(report.launched.len(), 2);

        let high = game.registry().velocity(game.world(), report.launched[0]).unwrap();
        let low = game.registry().velocity(game.world(), report.launched[1]).unwrap();
        assert_eq!(high, [200.0, -900.0]);
        assert_eq!(low, [250.0, -400.0]);
    }

    #[test]
    fn test_quit_command() {
        let mut game = setup_game();
        assert!(!game.tick(&[]).quit);
        assert!(game.tick(&[InputCommand::Quit]).quit);
        assert!(game.quit_requested());
    }

    #[test]
    fn test_bombs_pruned_after_leaving_screen() {
        let mut game = setup_game();
        let id = game.tick(&[InputCommand::LaunchLowBomb]).launched[0];

        let mut pruned_at = None;
        for frame in 0..600 {
            if game.tick(&[]).pruned.contains(&id) {
                pruned_at = Some(frame);
                break;
            }
        }

        assert!(pruned_at.is_some());
        assert!(!game.registry().contains(id));
        assert!(game.verify_consistency().is_ok());
    }

    #[test]
    fn test_health_and_game_over() {
        let mut game = setup_game();

        let enemy = game.spawn_enemy(EntityKind::GroundEnemy).unwrap();
        hit_player(&mut game, enemy);
        assert_eq!(game.health(), 80);

        for _ in 0..4 {
            let enemy = game.spawn_enemy(EntityKind::GroundEnemy).unwrap();
            hit_player(&mut game, enemy);
        }
        assert!(game.health() <= 0);
        assert_eq!(game.phase(), GamePhase::Running);

        let report = game.tick(&[]);
        assert!(report.game_over);
        assert_eq!(game.phase(), GamePhase::GameOver);
    }

    #[test]
    fn test_game_over_suppresses_gameplay() {
        let mut config = quiet_config();
        config.spawn.initial_countdown = 1;
        config.spawn.ground.spawn_interval = [1, 1];
        config.spawn.air.spawn_interval = [1, 1];
        config.rules.freeze_on_game_over = false;
        let mut game = Game::new(config).unwrap();

        for _ in 0..5 {
            let enemy = game.spawn_enemy(EntityKind::AirEnemy).unwrap();
            hit_player(&mut game, enemy);
        }
        game.tick(&[]);
        assert_eq!(game.phase(), GamePhase::GameOver);

        let bombs = game.registry().bombs().len();
        let enemies = game.registry().enemies().len();
        let frame = game.current_frame();

        for _ in 0..10 {
            let report = game.tick(&[
                InputCommand::LaunchHighBomb,
                InputCommand::LaunchLowBomb,
                InputCommand::SpawnEnemy(EnemyClass::Ground),
            ]);
            assert!(report.launched.is_empty());
            assert!(report.spawned.is_empty());
        }

        assert_eq!(game.registry().bombs().len(), bombs);
        assert!(game.registry().enemies().len() <= enemies);
        assert_eq!(game.current_frame(), frame + 10);
        assert_eq!(game.phase(), GamePhase::GameOver);
        assert!(game.launch_bomb([0.0, 0.0]).is_none());
    }

    #[test]
    fn test_frozen_after_game_over() {
        let mut game = setup_game();
        for _ in 0..5 {
            let enemy = game.spawn_enemy(EntityKind::GroundEnemy).unwrap();
            hit_player(&mut game, enemy);
        }
        game.tick(&[]);
        let hash = game.compute_hash();

        let report = game.tick(&[InputCommand::LaunchHighBomb]);
        assert!(report.launched.is_empty());
        assert_eq!(game.compute_hash(), hash);
        assert!(game.tick(&[InputCommand::Quit]).quit);
    }

    #[test]
    fn test_difficulty_ramp_on_spawned_enemies() {
        let mut game = setup_game();

        let ground = game.spawn_enemy(EntityKind::GroundEnemy).unwrap();
        let air = game.spawn_enemy(EntityKind::AirEnemy).unwrap();
        let [gvx, _] = game.registry().velocity(game.world(), ground).unwrap();
        let [avx, _] = game.registry().velocity(game.world(), air).unwrap();
        assert_eq!(gvx.abs(), 50.0);
        assert_eq!(avx.abs(), 100.0);

        // 25 s at 60 Hz, plus one step to cross the threshold
        for _ in 0..1_501 {
            game.state.advance();
        }
        assert!(game.elapsed_secs() > 25.0);

        let ground = game.spawn_enemy(EntityKind::GroundEnemy).unwrap();
        let air = game.spawn_enemy(EntityKind::AirEnemy).unwrap();
        let [gvx, _] = game.registry().velocity(game.world(), ground).unwrap();
        let [avx, _] = game.registry().velocity(game.world(), air).unwrap();
        assert_eq!(gvx.abs(), 100.0);
        assert_eq!(avx.abs(), 200.0);
    }

    #[test]
    fn test_spawner_drives_enemies() {
        let mut config = quiet_config();
        config.spawn.initial_countdown = 5;
        config.spawn.schedule = SpawnSchedule::Alternate;
        let mut game = Game::new(config).unwrap();

        let mut spawned = Vec::new();
        for _ in 0..5 {
            spawned.extend(game.tick(&[]).spawned);
        }

        assert_eq!(spawned.len(), 1);
        assert_eq!(game.registry().get(spawned[0]).unwrap().kind, EntityKind::GroundEnemy);
        assert!((100..=200).contains(&game.spawn_countdown()));
    }

    #[test]
    fn test_bomb_strikes_air_enemy() {
        let mut game = setup_game();
        let enemy = game.spawn_enemy(EntityKind::AirEnemy).unwrap();

        // A steady stream of high bombs crosses the air lane near x=420
        let mut destroyed = Vec::new();
        for frame in 0..300 {
            let commands = if frame % 5 == 0 {
                vec![InputCommand::LaunchHighBomb]
            } else {
                Vec::new()
            };
            let report = game.tick(&commands);
            destroyed.extend(report.collisions.destroyed);
            if !game.registry().contains(enemy) {
                break;
            }
        }

        assert!(destroyed.contains(&enemy));
        assert_eq!(destroyed.len(), 2);
        assert_eq!(game.health(), 100);
        assert!(game.verify_consistency().is_ok());
    }

    #[test]
    fn test_enemy_walks_into_player() {
        let mut game = setup_game();
        let enemy = game.spawn_enemy(EntityKind::GroundEnemy).unwrap();

        let mut damaged = false;
        let mut removed = false;
        for _ in 0..1_000 {
            let report = game.tick(&[]);
            damaged |= report.collisions.damage_taken > 0;
            if !game.registry().contains(enemy) {
                removed = true;
                break;
            }
        }

        assert!(damaged);
        assert!(removed);
        assert_eq!(game.health(), 80);
    }

    #[test]
    fn test_deterministic_sessions() {
        let mut game1 = Game::new(GameConfig::default()).unwrap();
        let mut game2 = Game::new(GameConfig::default()).unwrap();

        for frame in 0..600 {
            let commands = if frame % 45 == 0 {
                vec![InputCommand::LaunchHighBomb]
            } else {
                Vec::new()
            };
            game1.tick(&commands);
            game2.tick(&commands);
        }

        assert_eq!(game1.compute_hash(), game2.compute_hash());
        assert_eq!(game1.health(), game2.health());
    }
}
