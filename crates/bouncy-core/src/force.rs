//! Per-class velocity integration replacing the solver's uniform gravity.
//!
//! Every entity body is created with a zero gravity scale; before each solver
//! step the physics world asks the body's [`ForcePolicy`] for its next velocity.

use serde::{Deserialize, Serialize};

/// Velocity update rule attached to a dynamic body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ForcePolicy {
    /// Standard projectile motion under a fixed gravity, independent of the
    /// world setting.
    GravityPassthrough { gravity: [f32; 2] },
    /// Constant horizontal velocity, world gravity vertically.
    HoldGround { vx: f32 },
    /// Constant horizontal velocity, no vertical motion.
    HoldAltitude { vx: f32 },
}

impl ForcePolicy {
    /// Returns the velocity the body should enter the next step with.
    ///
    /// `damping` is a per-step multiplier applied to integrated components.
    pub fn apply(
        &self,
        velocity: [f32; 2],
        world_gravity: [f32; 2],
        damping: f32,
        dt: f32,
    ) -> [f32; 2] {
        match *self {
            Self::GravityPassthrough { gravity } => [
                velocity[0] * damping + gravity[0] * dt,
                velocity[1] * damping + gravity[1] * dt,
            ],
            Self::HoldGround { vx } => [vx, velocity[1] * damping + world_gravity[1] * dt],
            Self::HoldAltitude { vx } => [vx, 0.0],
        }
    }
}
