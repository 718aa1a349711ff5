//! The lifecycle of the whole animation. It owns all the state and decides what happens in each
//! frame.
//!
//! Nothing here knows about time. Whatever drives the engine calls `frame()` once per display
//! refresh, and keeps doing so for as long as it's told to by the returned [`Schedule`].

use rand::SeedableRng as _;

use crate::colour_cycle::{ColourTable, RollingOffset};
use crate::particle_store::{ParticleStore, Visit};
use crate::renderer::{DrawingContext, SurfaceSize};
use crate::spawner::Spawner;

/// The number of independent spawning phases.
pub const SPAWNER_COUNT: usize = 10;

/// Particles that fall this many surface-heights down are gone for good.
pub const CULL_FACTOR: f64 = 1.5;

/// Whether the animation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Lifecycle {
    /// Nothing is spawned, simulated or drawn.
    Stopped,
    /// Frames are being produced.
    Running,
}

/// What the driver should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Schedule {
    /// Call `frame()` again on the next display refresh.
    Continue,
    /// Stop calling `frame()` until the engine is started again.
    Halt,
}

/// All the state of the animation.
pub struct Engine {
    /// Every live dot.
    store: ParticleStore,
    /// The rainbow. Computed once.
    colours: ColourTable,
    /// Slides the rainbow along every frame.
    rolling_offset: RollingOffset,
    /// The staggered spawning phases.
    spawners: Vec<Spawner>,
    /// Whether we're running or not.
    lifecycle: Lifecycle,
    /// The latest known size of the drawing surface.
    size: SurfaceSize,
    /// Source of randomness for launches.
    rng: rand::rngs::StdRng,
}

impl Engine {
    /// Instantiate. A seed makes every launch reproducible.
    #[must_use]
    pub fn new(size: SurfaceSize, maybe_seed: Option<u64>) -> Self {
        let rng = match maybe_seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        };

        Self {
            store: ParticleStore::default(),
            colours: ColourTable::build(),
            rolling_offset: RollingOffset::default(),
            spawners: Self::fresh_spawners(),
            lifecycle: Lifecycle::Stopped,
            size,
            rng,
        }
    }

    /// A full set of spawners, each in a different phase.
    fn fresh_spawners() -> Vec<Spawner> {
        (0..SPAWNER_COUNT).map(Spawner::new).collect()
    }

    /// The current lifecycle state.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Convenience for checking the lifecycle.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// All the live dots.
    #[must_use]
    pub const fn particles(&self) -> &ParticleStore {
        &self.store
    }

    /// The latest known size of the drawing surface.
    #[must_use]
    pub const fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Tell the engine that the drawing surface has changed size. It takes effect from the next
    /// frame.
    pub fn set_size(&mut self, size: SurfaceSize) {
        if size != self.size {
            tracing::debug!("Surface resized to {}x{}", size.width, size.height);
        }
        self.size = size;
    }

    /// Start from a clean slate. Safe to call whilst already running, in which case everything
    /// is reset.
    ///
    /// The first frame is produced immediately so that there's never an initial blank frame.
    pub fn start(&mut self, context: &mut impl DrawingContext) -> Schedule {
        tracing::debug!("Starting animation");
        self.store.clear();
        self.spawners = Self::fresh_spawners();
        self.lifecycle = Lifecycle::Running;
        self.frame(context)
    }

    /// Stop the animation. All the dots vanish immediately. Calling this whilst already stopped
    /// does nothing.
    pub fn stop(&mut self) {
        if self.lifecycle == Lifecycle::Stopped {
            return;
        }

        tracing::debug!("Stopping animation, discarding {} dots", self.store.len());
        self.lifecycle = Lifecycle::Stopped;
        self.store.clear();
    }

    /// Produce a single frame: spawn, simulate, cull and then render.
    ///
    /// A frame that was already scheduled when the engine was stopped still runs, but only to
    /// clear the surface. It then asks not to be scheduled again.
    pub fn frame(&mut self, context: &mut impl DrawingContext) -> Schedule {
        if self.is_running() {
            self.spawn();
            self.simulate();
        }

        crate::renderer::render_frame(
            &self.store,
            &self.colours,
            &mut self.rolling_offset,
            self.size,
            context,
        );

        if self.is_running() {
            Schedule::Continue
        } else {
            Schedule::Halt
        }
    }

    /// Give every spawner a tick.
    fn spawn(&mut self) {
        for spawner in &mut self.spawners {
            let Some(particle) = spawner.tick(self.size, &mut self.rng) else {
                continue;
            };
            if let Err(error) = self.store.insert(particle) {
                tracing::warn!("Couldn't spawn particle: {error:?}");
            }
        }
    }

    /// Move every particle on by one frame and remove any that have fallen out of sight for
    /// good. A particle that breaks during the update is removed without affecting the others.
    fn simulate(&mut self) {
        let cull_line = self.size.height * CULL_FACTOR;
        let culled = self.store.for_each_mut(|id, particle| {
            if let Err(error) = crate::physics::step(particle) {
                tracing::warn!("Removing particle {id}: {error:?}");
                return Visit::Remove;
            }

            if particle.position.y > cull_line {
                Visit::Remove
            } else {
                Visit::Keep
            }
        });

        tracing::trace!("{} live particles, {culled} culled", self.store.len());
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "Tests aren't so strict"
)]
mod test {
    use std::collections::HashSet;

    use dotfall_protocol::DrawCommand;

    use super::*;
    use crate::recorder::Recorder;

    fn engine() -> Engine {
        Engine::new(SurfaceSize::new(800.0, 600.0), Some(1))
    }

    fn circles(recorder: &mut Recorder) -> usize {
        recorder
            .take_frame()
            .commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::FillCircle { .. }))
            .count()
    }

    #[test]
    fn starts_stopped() {
        let engine = engine();
        assert_eq!(engine.lifecycle(), Lifecycle::Stopped);
        assert!(engine.particles().is_empty());
    }

    #[test]
    fn start_renders_the_first_frame_immediately() {
        let mut engine = engine();
        let mut recorder = Recorder::default();

        let schedule = engine.start(&mut recorder);

        assert_eq!(schedule, Schedule::Continue);
        assert!(engine.is_running());
        assert!(!engine.particles().is_empty());
        assert_eq!(circles(&mut recorder), engine.particles().len());
    }

    #[test]
    fn start_then_stop_leaves_nothing_behind() {
        let mut engine = engine();
        let mut recorder = Recorder::default();

        engine.start(&mut recorder);
        engine.stop();
        assert!(engine.particles().is_empty());

        // The frame that was already scheduled still runs, but only to clear the surface.
        let schedule = engine.frame(&mut recorder);
        assert_eq!(schedule, Schedule::Halt);
        assert!(engine.particles().is_empty());
        assert_eq!(circles(&mut recorder), 0);
    }

    #[test]
    fn stopping_twice_is_harmless() {
        let mut engine = engine();
        engine.stop();
        engine.stop();
        assert_eq!(engine.lifecycle(), Lifecycle::Stopped);
    }

    #[test]
    fn restarting_resets_everything() {
        let mut engine = engine();
        let mut recorder = Recorder::default();

        engine.start(&mut recorder);
        for _ in 0..20 {
            engine.frame(&mut recorder);
        }
        let busy = engine.particles().len();

        engine.start(&mut recorder);
        assert!(engine.is_running());
        assert!(engine.particles().len() < busy);
    }

    #[test]
    fn ten_phases_over_eight_ticks() {
        let mut engine = engine();
        let mut spawned_per_phase = vec![0_usize; SPAWNER_COUNT];

        for _ in 0..8 {
            for (phase, spawner) in engine.spawners.iter_mut().enumerate() {
                if spawner.tick(engine.size, &mut engine.rng).is_some() {
                    spawned_per_phase[phase] += 1;
                }
            }
        }

        assert_eq!(spawned_per_phase.iter().sum::<usize>(), SPAWNER_COUNT);
        assert!(spawned_per_phase.iter().all(|count| *count == 1));
    }

    #[test]
    fn particles_are_culled_once_far_below_the_surface() {
        let mut engine = engine();
        let mut recorder = Recorder::default();
        engine.start(&mut recorder);
        engine.stop();

        engine.lifecycle = Lifecycle::Running;
        engine.spawners.clear();
        let particle = crate::particle::Particle::new(
            glam::DVec2::new(400.0, 600.0),
            glam::DVec2::new(0.0, 1.0),
            5.0,
        );
        let id = engine.store.insert(particle).unwrap();

        let cull_line = 600.0 * CULL_FACTOR;
        let mut removed_at = None;
        for frame in 0..1000 {
            let before = engine.particles().get(id).copied();
            engine.frame(&mut recorder);
            match engine.particles().get(id) {
                Some(after) => assert!(after.position.y <= cull_line),
                None => {
                    let before = before.unwrap();
                    assert!(before.position.y <= cull_line);
                    removed_at = Some(frame);
                    break;
                }
            }
        }
        assert!(removed_at.is_some());

        for _ in 0..50 {
            engine.frame(&mut recorder);
            assert!(engine.particles().get(id).is_none());
        }
    }

    #[test]
    fn ids_are_never_repeated_across_frames() {
        let mut engine = engine();
        let mut recorder = Recorder::default();
        let mut seen = HashSet::new();

        engine.start(&mut recorder);
        for _ in 0..200 {
            engine.frame(&mut recorder);
            for (id, _) in engine.particles().iter() {
                seen.insert(id);
            }
        }

        let max_id = seen.iter().max().copied().unwrap();
        assert_eq!(u64::try_from(seen.len()).unwrap(), max_id);
    }

    #[test]
    fn resizing_mid_run_changes_spawns_and_colours() {
        let mut engine = engine();
        let mut recorder = Recorder::default();
        engine.start(&mut recorder);

        engine.set_size(SurfaceSize::new(2000.0, 100.0));
        for _ in 0..8 {
            engine.frame(&mut recorder);
        }

        let frame = recorder.take_frame();
        assert_eq!(frame.width, 2000);
        assert_eq!(frame.height, 100);
        assert_eq!(
            frame.commands[0],
            DrawCommand::Clear {
                width: 2000.0,
                height: 100.0
            }
        );

        let launched_on_new_surface = engine
            .particles()
            .iter()
            .any(|(_, particle)| particle.position.x > 800.0);
        assert!(launched_on_new_surface);
    }

    #[test]
    fn zero_sized_surface_does_not_crash() {
        let mut engine = Engine::new(SurfaceSize::default(), Some(3));
        let mut recorder = Recorder::default();

        engine.start(&mut recorder);
        for _ in 0..100 {
            assert_eq!(engine.frame(&mut recorder), Schedule::Continue);
        }
        assert!(engine.particles().is_empty());
    }
}
