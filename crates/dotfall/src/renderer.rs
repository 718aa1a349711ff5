//! Paint the current state of the simulation onto a drawing surface.

use color_eyre::eyre::Result;
use glam::DVec2;

use crate::colour_cycle::{ColourEntry, ColourTable, RollingOffset};
use crate::particle::Particle;
use crate::particle_store::ParticleStore;

/// The size of a drawing surface in simulation pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "It's very unlikely that this is going to have any more fields added to it"
)]
pub struct SurfaceSize {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl SurfaceSize {
    /// Any dimension that isn't a finite, positive number is treated as zero.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        let sanitise = |dimension: f64| {
            if dimension.is_finite() && dimension > 0.0 {
                dimension
            } else {
                0.0
            }
        };

        Self {
            width: sanitise(width),
            height: sanitise(height),
        }
    }

    /// A surface that can't show anything.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// The operations we need from a 2D drawing context. It's modelled on the HTML canvas.
pub trait DrawingContext {
    /// Wipe the whole visible area.
    fn clear(&mut self, size: SurfaceSize);

    /// Set the colour used for all following fills.
    fn set_fill(&mut self, colour: ColourEntry);

    /// Draw a filled circle in the current fill colour.
    fn fill_circle(&mut self, centre: DVec2, radius: f64) -> Result<()>;
}

/// Whether a particle has any geometry that could be drawn.
fn is_drawable(particle: &Particle) -> bool {
    particle.position.is_finite() && particle.radius.is_finite() && particle.radius > 0.0
}

/// Clear the surface and then draw every particle, coloured by where it is on the surface.
///
/// Once everything has been drawn the rainbow is slid along one step, ready for the next frame.
/// Particles that can't be drawn are skipped without affecting any others.
pub fn render_frame(
    store: &ParticleStore,
    colours: &ColourTable,
    rolling_offset: &mut RollingOffset,
    size: SurfaceSize,
    context: &mut impl DrawingContext,
) {
    context.clear(size);

    for (id, particle) in store.iter() {
        if !is_drawable(particle) {
            tracing::trace!("Skipping undrawable particle {id}: {particle:?}");
            continue;
        }

        let colour =
            colours.lookup_for_offset(particle.position.x, size.width, rolling_offset.value());
        context.set_fill(colour);
        if let Err(error) = context.fill_circle(particle.position, particle.radius) {
            tracing::trace!("Couldn't draw particle {id}: {error:?}");
        }
    }

    rolling_offset.advance();
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "Tests aren't so strict"
)]
mod test {
    use dotfall_protocol::DrawCommand;

    use super::*;
    use crate::recorder::Recorder;

    fn store_with(particles: &[Particle]) -> ParticleStore {
        let mut store = ParticleStore::default();
        for particle in particles {
            store.insert(*particle).unwrap();
        }
        store
    }

    #[test]
    fn sanitises_sizes() {
        assert_eq!(SurfaceSize::new(-1.0, f64::NAN), SurfaceSize::default());
        assert!(SurfaceSize::new(0.0, 10.0).is_degenerate());
        assert!(!SurfaceSize::new(1.0, 10.0).is_degenerate());
    }

    #[test]
    fn clears_then_draws_each_particle() {
        let store = store_with(&[
            Particle::new(DVec2::new(10.0, 20.0), DVec2::ZERO, 5.0),
            Particle::new(DVec2::new(100.0, 50.0), DVec2::ZERO, 7.0),
        ]);
        let colours = ColourTable::build();
        let mut offset = RollingOffset::default();
        let mut recorder = Recorder::default();
        let size = SurfaceSize::new(1536.0, 100.0);

        render_frame(&store, &colours, &mut offset, size, &mut recorder);

        let frame = recorder.take_frame();
        assert_eq!(frame.commands.len(), 5);
        assert_eq!(
            frame.commands[0],
            DrawCommand::Clear {
                width: 1536.0,
                height: 100.0
            }
        );

        let mut circles = Vec::new();
        for pair in frame.commands[1..].chunks(2) {
            let DrawCommand::SetFill(colour) = pair[0] else {
                panic!("Expected a fill colour before every circle");
            };
            let DrawCommand::FillCircle { centre, radius } = pair[1] else {
                panic!("Expected a circle after every fill colour");
            };
            circles.push((colour, centre, radius));
        }
        circles.sort_by(|left, right| left.1 .0.total_cmp(&right.1 .0));

        assert_eq!(circles[0], ((255, 10, 0), (10.0, 20.0), 5.0));
        assert_eq!(circles[1], ((255, 100, 0), (100.0, 50.0), 7.0));
    }

    #[test]
    fn advances_rolling_offset_once_per_frame() {
        let store = store_with(&[Particle::new(DVec2::new(0.0, 0.0), DVec2::ZERO, 5.0)]);
        let colours = ColourTable::build();
        let mut offset = RollingOffset::default();
        let mut recorder = Recorder::default();
        let size = SurfaceSize::new(1536.0, 100.0);

        render_frame(&store, &colours, &mut offset, size, &mut recorder);
        render_frame(&store, &colours, &mut offset, size, &mut recorder);
        assert_eq!(offset.value(), 2);

        let frame = recorder.take_frame();
        assert_eq!(frame.commands[1], DrawCommand::SetFill((255, 1, 0)));
    }

    #[test]
    fn zero_width_surface_draws_white() {
        let store = store_with(&[Particle::new(DVec2::new(3.0, 4.0), DVec2::ZERO, 5.0)]);
        let colours = ColourTable::build();
        let mut offset = RollingOffset::default();
        let mut recorder = Recorder::default();

        render_frame(
            &store,
            &colours,
            &mut offset,
            SurfaceSize::new(0.0, 0.0),
            &mut recorder,
        );

        let frame = recorder.take_frame();
        assert_eq!(frame.commands[1], DrawCommand::SetFill((255, 255, 255)));
    }
}
