//! A stylised physics model. It isn't trying to be accurate, just to look nice.
//!
//! Units are pixels and "frames". One frame of simulation moves a particle by exactly its
//! velocity.

use color_eyre::eyre::{bail, Result};
use glam::DVec2;

use crate::particle::Particle;

/// Added to the downward velocity of every particle, every frame.
pub const GRAVITY_STEP: f64 = 0.2;

/// Removed from the magnitude of every particle's sideways velocity, every frame.
pub const FRICTION_STEP: f64 = 0.025;

/// The fastest a particle can ever fall.
pub const TERMINAL_VELOCITY: f64 = 30.0;

/// Move a horizontal velocity towards zero by `friction_step`, without ever crossing zero.
#[must_use]
pub fn dampen_horizontal(vx: f64, friction_step: f64) -> f64 {
    if vx.abs() < friction_step {
        return 0.0;
    }

    vx - friction_step.copysign(vx)
}

/// Accelerate a vertical velocity downwards, capped at the terminal velocity. Gravity never
/// slows a particle down, so a velocity that somehow already exceeds the cap is left alone.
#[must_use]
pub fn apply_gravity(vy: f64, gravity_step: f64, terminal_velocity: f64) -> f64 {
    let ceiling = terminal_velocity.max(vy);
    (vy + gravity_step).min(ceiling)
}

/// Explicit Euler: displace the position by one frame's worth of velocity.
#[must_use]
pub fn integrate(position: DVec2, velocity: DVec2) -> DVec2 {
    position + velocity
}

/// Advance a particle by one frame. Friction and gravity are applied first, and the position
/// then moves with the new velocity.
///
/// The particle is left untouched if the result isn't finite.
pub fn step(particle: &mut Particle) -> Result<()> {
    let velocity = DVec2::new(
        dampen_horizontal(particle.velocity.x, FRICTION_STEP),
        apply_gravity(particle.velocity.y, GRAVITY_STEP, TERMINAL_VELOCITY),
    );
    let position = integrate(particle.position, velocity);

    if !velocity.is_finite() || !position.is_finite() {
        bail!("Particle left the finite plane: position {position}, velocity {velocity}");
    }

    particle.velocity = velocity;
    particle.position = position;
    Ok(())
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    clippy::unwrap_used,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;

    #[test]
    fn friction_snaps_small_velocities_to_zero() {
        assert_eq!(dampen_horizontal(0.01, 0.025), 0.0);
        assert_eq!(dampen_horizontal(-0.01, 0.025), 0.0);
        assert_eq!(dampen_horizontal(0.0, 0.025), 0.0);
    }

    #[test]
    fn friction_is_sign_symmetric() {
        assert_eq!(dampen_horizontal(1.0, 0.25), 0.75);
        assert_eq!(dampen_horizontal(-1.0, 0.25), -0.75);
        assert_eq!(dampen_horizontal(0.25, 0.25), 0.0);
    }

    #[test]
    fn friction_never_adds_energy() {
        let mut vx = 4.9;
        for _ in 0..1000 {
            let next = dampen_horizontal(vx, FRICTION_STEP);
            assert!(next.abs() <= vx.abs());
            assert!(next == 0.0 || next.signum() == vx.signum());
            vx = next;
        }
        assert_eq!(vx, 0.0);
    }

    #[test]
    fn gravity_accelerates_downwards() {
        assert_eq!(apply_gravity(-1.0, 0.5, 30.0), -0.5);
        assert_eq!(apply_gravity(0.0, 0.5, 30.0), 0.5);
    }

    #[test]
    fn gravity_clamps_at_terminal_velocity() {
        assert_eq!(apply_gravity(29.9, 0.2, 30.0), 30.0);
        assert_eq!(apply_gravity(30.0, 0.2, 30.0), 30.0);
    }

    #[test]
    fn gravity_never_slows_a_fall() {
        assert_eq!(apply_gravity(45.0, 0.2, 30.0), 45.0);
    }

    #[test]
    fn integration_is_additive() {
        let position = integrate(DVec2::new(10.0, 10.0), DVec2::new(2.0, -3.0));
        assert_eq!(position, DVec2::new(12.0, 7.0));
    }

    #[test]
    fn step_uses_updated_velocity() {
        let mut particle = Particle::new(DVec2::new(100.0, 100.0), DVec2::new(1.0, -2.0), 5.0);
        step(&mut particle).unwrap();

        assert_eq!(particle.velocity.x, 1.0 - FRICTION_STEP);
        assert_eq!(particle.velocity.y, -2.0 + GRAVITY_STEP);
        assert_eq!(particle.position.x, 100.0 + (1.0 - FRICTION_STEP));
        assert_eq!(particle.position.y, 100.0 + (-2.0 + GRAVITY_STEP));
    }

    #[test]
    fn step_rejects_non_finite_results() {
        let mut particle = Particle::new(DVec2::new(f64::MAX, 0.0), DVec2::new(f64::MAX, 0.0), 5.0);
        let before = particle;
        assert!(step(&mut particle).is_err());
        assert_eq!(particle, before);
    }
}
