//! A single dot in the fountain.

use glam::DVec2;

/// Uniquely identifies a particle for the lifetime of the process.
pub type ParticleId = u64;

/// The physical state of a single dot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Particle {
    /// Centre of the dot in surface pixels. [0, 0] is in the top-left.
    pub position: DVec2,
    /// Pixels per frame. Negative `y` is upwards.
    pub velocity: DVec2,
    /// Fixed for the whole life of the particle.
    pub radius: f64,
}

impl Particle {
    /// Instantiate
    #[must_use]
    pub const fn new(position: DVec2, velocity: DVec2, radius: f64) -> Self {
        Self {
            position,
            velocity,
            radius,
        }
    }

    /// Finite position and velocity, and a positive radius.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.radius.is_finite()
            && self.radius > 0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn validity() {
        let good = Particle::new(DVec2::new(1.0, 2.0), DVec2::new(-1.0, -9.0), 5.0);
        assert!(good.is_valid());

        let no_radius = Particle::new(DVec2::ZERO, DVec2::ZERO, 0.0);
        assert!(!no_radius.is_valid());

        let lost = Particle::new(DVec2::new(f64::NAN, 0.0), DVec2::ZERO, 5.0);
        assert!(!lost.is_valid());

        let too_fast = Particle::new(DVec2::ZERO, DVec2::new(0.0, f64::INFINITY), 5.0);
        assert!(!too_fast.is_valid());
    }
}
