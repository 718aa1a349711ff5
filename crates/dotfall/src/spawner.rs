//! Launch new dots from the bottom of the surface.
//!
//! The launch point sweeps back and forth across the width of the surface, and a dot is fired
//! on every eighth tick.

use glam::DVec2;
use rand::Rng;

use crate::particle::Particle;
use crate::physics::GRAVITY_STEP;
use crate::renderer::SurfaceSize;

/// How far the launch point moves along the bottom of the surface every tick.
pub const ADDER_SPEED: f64 = 1.5;

/// A spawner fires once every this many ticks.
pub const SPAWN_CADENCE: u8 = 8;

/// Launches are randomly left or right up to this speed.
const MAX_SIDEWAYS_LAUNCH: f64 = 5.0;

/// The smallest possible dot.
const MIN_RADIUS: f64 = 5.0;

/// Dots are up to this much bigger than the smallest dot.
const RADIUS_SPREAD: f64 = 20.0;

/// The strongest launch is scaled by the surface's height, then boosted by this much.
const LAUNCH_BOOST: f64 = 10.0;

/// How much of the height-derived launch speed to use.
const LAUNCH_SCALE: f64 = 1.5;

/// A single spawning phase. Many of them run side by side, each with its own state.
#[derive(Debug, Clone, PartialEq)]
pub struct Spawner {
    /// Current horizontal displacement of the launch point from the centre of the surface.
    x_offset: f64,
    /// Which way, and how fast, the launch point is moving.
    direction: f64,
    /// Only spawn when this is 0. Cycles through `0..SPAWN_CADENCE`.
    tick_counter: u8,
}

impl Spawner {
    /// Create a spawner that's the given number of ticks into its cycle. Giving each spawner a
    /// different phase staggers their launches.
    #[must_use]
    pub fn new(phase: usize) -> Self {
        let tick_counter = u8::try_from(phase % usize::from(SPAWN_CADENCE)).unwrap_or_default();
        Self {
            x_offset: f64::from(tick_counter) * ADDER_SPEED,
            direction: ADDER_SPEED,
            tick_counter,
        }
    }

    /// The launch point's current displacement from the centre of the surface.
    #[cfg(test)]
    #[must_use]
    pub const fn x_offset(&self) -> f64 {
        self.x_offset
    }

    /// Whether the next call to `tick()` will try to spawn a dot.
    #[must_use]
    pub const fn is_due(&self) -> bool {
        self.tick_counter == 0
    }

    /// Advance the spawner by one tick, possibly creating a new particle.
    ///
    /// Nothing is spawned onto a surface that can't show anything. The size is passed in fresh
    /// every tick so that resizes are picked up straight away.
    pub fn tick<R: Rng>(&mut self, size: SurfaceSize, rng: &mut R) -> Option<Particle> {
        let maybe_particle = if self.is_due() && !size.is_degenerate() {
            Some(self.launch(size, rng))
        } else {
            None
        };

        self.tick_counter = (self.tick_counter + 1) % SPAWN_CADENCE;

        let half_width = size.width / 2.0;
        self.x_offset += self.direction;
        if self.x_offset > half_width {
            self.direction = -ADDER_SPEED;
        }
        if self.x_offset < -half_width {
            self.direction = ADDER_SPEED;
        }

        maybe_particle
    }

    /// Create a particle at the bottom of the surface, thrown upwards. Taller surfaces get
    /// stronger launches.
    fn launch<R: Rng>(&self, size: SurfaceSize, rng: &mut R) -> Particle {
        let position = DVec2::new(size.width / 2.0 + self.x_offset, size.height);

        let strongest_launch = (size.height * GRAVITY_STEP).sqrt() * LAUNCH_SCALE + LAUNCH_BOOST;
        let velocity = DVec2::new(
            rng.gen_range(-MAX_SIDEWAYS_LAUNCH..MAX_SIDEWAYS_LAUNCH),
            -rng.gen_range(0.0..strongest_launch),
        );

        let radius = rng.gen_range(0.0..RADIUS_SPREAD).floor() + MIN_RADIUS;

        Particle::new(position, velocity, radius)
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::float_cmp,
    reason = "Tests aren't so strict"
)]
mod test {
    use rand::SeedableRng as _;

    use super::*;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(42)
    }

    #[test]
    fn spawns_once_every_eight_ticks() {
        let size = SurfaceSize::new(800.0, 600.0);
        let mut spawner = Spawner::new(0);
        let mut rng = rng();

        let spawned: Vec<bool> = (0..24)
            .map(|_| spawner.tick(size, &mut rng).is_some())
            .collect();

        for (tick, did_spawn) in spawned.iter().enumerate() {
            assert_eq!(*did_spawn, tick % 8 == 0, "tick {tick}");
        }
    }

    #[test]
    fn launches_from_the_bottom_edge() {
        let size = SurfaceSize::new(800.0, 600.0);
        let mut spawner = Spawner::new(0);
        let particle = spawner.tick(size, &mut rng()).unwrap();

        assert_eq!(particle.position, DVec2::new(400.0, 600.0));
    }

    #[test]
    fn launches_are_randomised_within_bounds() {
        let size = SurfaceSize::new(800.0, 600.0);
        let strongest = (600.0 * GRAVITY_STEP).sqrt() * 1.5 + 10.0;
        let mut rng = rng();

        for _ in 0..500 {
            let mut spawner = Spawner::new(0);
            let particle = spawner.tick(size, &mut rng).unwrap();

            assert!((-5.0..5.0).contains(&particle.velocity.x));
            assert!(particle.velocity.y <= 0.0);
            assert!(particle.velocity.y > -strongest);
            assert!((5.0..25.0).contains(&particle.radius));
            assert_eq!(particle.radius.fract(), 0.0);
        }
    }

    #[test]
    fn launch_point_sweeps_back_and_forth() {
        let size = SurfaceSize::new(30.0, 100.0);
        let mut spawner = Spawner::new(0);
        let mut rng = rng();
        let mut offsets = Vec::new();

        for _ in 0..60 {
            spawner.tick(size, &mut rng);
            offsets.push(spawner.x_offset());
        }

        let furthest_right = offsets.iter().copied().fold(f64::MIN, f64::max);
        let furthest_left = offsets.iter().copied().fold(f64::MAX, f64::min);
        assert!(furthest_right > 15.0 && furthest_right <= 15.0 + 2.0 * ADDER_SPEED);
        assert!(furthest_left < -15.0 && furthest_left >= -15.0 - 2.0 * ADDER_SPEED);
    }

    #[test]
    fn phases_are_staggered() {
        let first = Spawner::new(0);
        let second = Spawner::new(1);
        let ninth = Spawner::new(8);

        assert!(first.is_due());
        assert!(!second.is_due());
        assert_eq!(ninth, first);
    }

    #[test]
    fn nothing_spawns_on_an_empty_surface() {
        let mut spawner = Spawner::new(0);
        assert!(spawner
            .tick(SurfaceSize::new(0.0, 600.0), &mut rng())
            .is_none());
        assert!(!spawner.is_due());
    }

    #[test]
    fn resizing_moves_the_launch_point() {
        let mut spawner = Spawner::new(0);
        let mut rng = rng();
        let small = spawner.tick(SurfaceSize::new(100.0, 100.0), &mut rng).unwrap();
        for _ in 1..8 {
            spawner.tick(SurfaceSize::new(100.0, 100.0), &mut rng);
        }
        let large = spawner.tick(SurfaceSize::new(1000.0, 400.0), &mut rng).unwrap();

        assert_eq!(small.position, DVec2::new(50.0, 100.0));
        assert_eq!(large.position, DVec2::new(500.0 + 8.0 * ADDER_SPEED, 400.0));
    }
}
