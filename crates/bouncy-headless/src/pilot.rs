//! Scripted input source that aims bombs at incoming enemies.

use bouncy_core::{EntityKind, Game, GamePhase, InputCommand};

/// Frames to keep showing the game-over screen before quitting.
const GAME_OVER_LINGER: u32 = 60;

/// Minimum frames between two launches.
const COOLDOWN: u32 = 8;

/// Horizontal slack, in units, when matching an enemy to a crossing point.
const AIM_TOLERANCE: f32 = 6.0;

/// Where and when a launch crosses a given height on its way down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub x: f32,
    pub time: f32,
}

/// Solves `y0 + vy*t + g*t²/2 = target_y` for the descending root.
pub fn descending_crossing(
    origin: [f32; 2],
    velocity: [f32; 2],
    gravity_y: f32,
    target_y: f32,
) -> Option<Crossing> {
    let a = gravity_y / 2.0;
    let b = velocity[1];
    let c = origin[1] - target_y;
    if a <= 0.0 {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let time = (-b + disc.sqrt()) / (2.0 * a);
    if time <= 0.0 {
        return None;
    }
    Some(Crossing {
        x: origin[0] + velocity[0] * time,
        time,
    })
}

/// Fires low bombs at ground enemies and high bombs at air enemies when the
/// enemy will be over the bomb's landing point on arrival.
#[derive(Debug)]
pub struct Autopilot {
    max_frames: u32,
    frame: u32,
    cooldown: u32,
    game_over_frames: u32,
}

impl Autopilot {
    pub fn new(max_frames: u32) -> Self {
        Self {
            max_frames,
            frame: 0,
            cooldown: 0,
            game_over_frames: 0,
        }
    }

    /// Commands for the next frame.
    pub fn commands(&mut self, game: &Game) -> Vec<InputCommand> {
        self.frame += 1;
        self.cooldown = self.cooldown.saturating_sub(1);

        if self.frame >= self.max_frames {
            return vec![InputCommand::Quit];
        }
        if game.phase() == GamePhase::GameOver {
            self.game_over_frames += 1;
            if self.game_over_frames >= GAME_OVER_LINGER {
                return vec![InputCommand::Quit];
            }
            return Vec::new();
        }
        if self.cooldown > 0 {
            return Vec::new();
        }

        let command = self.aim(game);
        if command.is_some() {
            self.cooldown = COOLDOWN;
        }
        command.into_iter().collect()
    }

    fn aim(&self, game: &Game) -> Option<InputCommand> {
        let config = game.config();
        let bomb = &config.bomb;

        for enemy in game.registry().enemies() {
            let Some([x, y]) = game.registry().position(game.world(), enemy.id) else {
                continue;
            };
            let Some([vx, _]) = game.registry().velocity(game.world(), enemy.id) else {
                continue;
            };
            let (launch, command) = match enemy.kind {
                EntityKind::AirEnemy => (bomb.high_launch, InputCommand::LaunchHighBomb),
                _ => (bomb.low_launch, InputCommand::LaunchLowBomb),
            };
            let Some(crossing) =
                descending_crossing(bomb.launch_position, launch, bomb.launch_gravity[1], y)
            else {
                continue;
            };
            let arrival = x + vx * crossing.time;
            if (arrival - crossing.x).abs() < AIM_TOLERANCE {
                tracing::debug!(
                    "[pilot] {:?} aimed at {:?} (x={:.0}, meets at x={:.0})",
                    command,
                    enemy.id,
                    x,
                    crossing.x
                );
                return Some(command);
            }
        }
        None
    }
}
