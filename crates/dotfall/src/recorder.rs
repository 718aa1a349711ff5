//! A drawing context that doesn't draw anything, it just remembers what it was asked to draw.
//! It's what powers the headless mode, where the host does the actual painting.

use color_eyre::eyre::Result;
use glam::DVec2;

use dotfall_protocol::{DrawCommand, Frame};

use crate::colour_cycle::ColourEntry;
use crate::renderer::{DrawingContext, SurfaceSize};

/// Records draw commands for a single frame.
#[derive(Debug, Default)]
pub struct Recorder {
    /// The size given by the most recent clear.
    size: SurfaceSize,
    /// Everything since the most recent clear.
    commands: Vec<DrawCommand>,
}

impl Recorder {
    /// Hand over the recorded frame, leaving the recorder empty.
    #[must_use]
    #[expect(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Surface sizes are always finite and non-negative"
    )]
    pub fn take_frame(&mut self) -> Frame {
        Frame::builder()
            .width(self.size.width.round() as u32)
            .height(self.size.height.round() as u32)
            .commands(std::mem::take(&mut self.commands))
            .build()
    }

    /// Whether anything has been recorded since the last frame was taken.
    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl DrawingContext for Recorder {
    /// Clearing throws away everything drawn so far, just like a real canvas.
    fn clear(&mut self, size: SurfaceSize) {
        self.size = size;
        self.commands.clear();
        self.commands.push(DrawCommand::Clear {
            width: size.width,
            height: size.height,
        });
    }

    fn set_fill(&mut self, colour: ColourEntry) {
        self.commands.push(DrawCommand::SetFill(colour.as_tuple()));
    }

    fn fill_circle(&mut self, centre: DVec2, radius: f64) -> Result<()> {
        if !centre.is_finite() || !radius.is_finite() || radius <= 0.0 {
            color_eyre::eyre::bail!("Degenerate circle at {centre} with radius {radius}");
        }

        self.commands.push(DrawCommand::FillCircle {
            centre: (centre.x, centre.y),
            radius,
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clearing_starts_a_new_frame() {
        let mut recorder = Recorder::default();
        recorder.clear(SurfaceSize::new(10.0, 10.0));
        recorder.set_fill(crate::colour_cycle::FALLBACK);
        recorder.clear(SurfaceSize::new(20.0, 30.0));

        let frame = recorder.take_frame();
        assert_eq!(frame.width, 20);
        assert_eq!(frame.height, 30);
        assert_eq!(
            frame.commands,
            vec![DrawCommand::Clear {
                width: 20.0,
                height: 30.0
            }]
        );
        assert!(recorder.is_empty());
    }

    #[test]
    fn refuses_degenerate_circles() {
        let mut recorder = Recorder::default();
        assert!(recorder.fill_circle(DVec2::ZERO, 0.0).is_err());
        assert!(recorder.fill_circle(DVec2::new(f64::NAN, 1.0), 3.0).is_err());
        assert!(recorder.is_empty());
    }
}
