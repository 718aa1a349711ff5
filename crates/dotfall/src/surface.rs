//! Paint dots onto a surface of terminal cells.
//!
//! Every cell holds 2 "pixels", one above the other, using the UTF-8 half blocks ("▀", "▄").
//! The engine doesn't know about any of this though, it just sees a canvas whose size is the
//! number of pixels multiplied by the surface's `scale`.

use color_eyre::eyre::bail;
use color_eyre::eyre::ContextCompat as _;
use color_eyre::eyre::Result;
use glam::DVec2;
use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Position as TermwizPosition;

use crate::colour_cycle::ColourEntry;
use crate::renderer::{DrawingContext, SurfaceSize};

/// An RGBA colour
pub type Colour = (f32, f32, f32, f32);

/// A default pure white.
pub const WHITE: Colour = (1.0, 1.0, 1.0, 1.0);

/// `Surface`
#[derive(Clone)]
pub struct Surface {
    /// An identifier for the surface, it's mostly useful for logging.
    pub id: String,
    /// The terminal's width
    pub width: usize,
    /// The terminal's height
    pub height: usize,
    /// How many simulation pixels fit into a single terminal pixel.
    pub scale: f64,
    /// The colour used for the next filled circle.
    fill: Colour,
    /// A surface of terminal cells
    pub surface: termwiz::surface::Surface,
}

impl Surface {
    /// Instantiate
    #[must_use]
    pub fn new(id: String, width: usize, height: usize, scale: f64) -> Self {
        Self {
            id,
            width,
            height,
            scale,
            fill: WHITE,
            surface: termwiz::surface::Surface::new(width, height),
        }
    }

    /// The size of the surface as the engine sees it.
    #[must_use]
    #[expect(
        clippy::as_conversions,
        clippy::cast_precision_loss,
        reason = "Terminals are never big enough to lose precision"
    )]
    pub fn pixel_size(&self) -> SurfaceSize {
        SurfaceSize::new(
            self.width as f64 * self.scale,
            (self.height * 2) as f64 * self.scale,
        )
    }

    /// Change the number of terminal columns and rows. Everything already drawn is lost.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.surface = termwiz::surface::Surface::new(width, height);
    }

    /// Add a pixel ("▀", "▄") to the surface.
    ///
    /// The rule is that we default to rendering any pair of colours using the upper half block.
    /// Therefore that the upper "pixel" is rendered with the cell's foreground and the lower
    /// "pixel" is rendered with the cell's background colour.
    ///
    /// However, there is one edge case that requires this to be inverted: when an empty cell
    /// needs a pixel in the lower half. It is impossible to do this with an upper half block
    /// *whilst retaining the ANSI-coded default background colour*.
    pub fn add_pixel(&mut self, x: usize, y: usize, colour: Colour) -> Result<()> {
        let (col, row) = self.coords_to_tty(x, y)?;
        self.surface.add_change(TermwizChange::CursorPosition {
            x: TermwizPosition::Absolute(col),
            y: TermwizPosition::Absolute(row),
        });

        let cell = self.get_cell_at(col, row)?;
        let is_empty_upper = cell.str() != "▀";
        let is_upper_half = y.rem_euclid(2) == 0;
        let is_lower_half = !is_upper_half;
        let is_adding_to_bottom_of_empty_upper = is_empty_upper && is_lower_half;

        let mut fg_colour = if is_upper_half {
            Self::make_fg_colour(colour)
        } else {
            TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(
                cell.attrs().foreground(),
            ))
        };

        #[expect(
            clippy::useless_let_if_seq,
            reason = "I think the verbosity is useful here"
        )]
        let mut bg_colour = if is_upper_half {
            TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(
                cell.attrs().background(),
            ))
        } else {
            Self::make_bg_colour(colour)
        };

        if is_adding_to_bottom_of_empty_upper {
            fg_colour = Self::make_fg_colour(colour);
            bg_colour = TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(
                cell.attrs().background(),
            ));
        }

        // A pixel on top of a cell that only has a lower-half colour.
        let is_converting_lower_to_full = is_upper_half && cell.str() == "▄";
        if is_converting_lower_to_full {
            fg_colour = Self::make_fg_colour(colour);
            bg_colour = TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(
                cell.attrs().foreground(),
            ));
        }

        self.surface.add_changes(vec![fg_colour, bg_colour]);
        if is_adding_to_bottom_of_empty_upper {
            self.surface.add_change("▄");
        } else {
            self.surface.add_change("▀");
        }

        Ok(())
    }

    /// Make a Termwiz colour attribute
    #[must_use]
    pub const fn make_colour_attribute(colour: Colour) -> termwiz::color::ColorAttribute {
        termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(termwiz::color::SrgbaTuple(
            colour.0, colour.1, colour.2, colour.3,
        ))
    }

    /// Make a Termwiz background colour
    #[must_use]
    pub const fn make_bg_colour(colour: Colour) -> TermwizChange {
        let colour_attribute = Self::make_colour_attribute(colour);
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(colour_attribute))
    }

    /// Make a Termwiz foreground colour
    #[must_use]
    pub const fn make_fg_colour(colour: Colour) -> TermwizChange {
        let colour_attribute = Self::make_colour_attribute(colour);
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(colour_attribute))
    }

    /// Safely convert pixel coordinates to TTY col/row
    fn coords_to_tty(&self, x: usize, y: usize) -> Result<(usize, usize)> {
        let col = x;
        let row = y.div_euclid(2);
        if col >= self.width {
            bail!("Tried to add pixel to column: {col}")
        }
        if row >= self.height {
            bail!("Tried to add pixel to row: {row}")
        }
        Ok((col, row))
    }

    /// Get the cell at the given column and row.
    fn get_cell_at(&mut self, col: usize, row: usize) -> Result<termwiz::cell::Cell> {
        let cells = self.surface.screen_cells();
        let cell = cells
            .get(row)
            .context("No cell row")?
            .get(col)
            .context("No cell column")?;
        Ok(cell.clone())
    }

    /// The range of pixel indices that a span of simulation space covers, clipped to `0..limit`.
    /// `None` when the span is entirely off the surface.
    #[expect(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "The values are clamped to the surface before converting"
    )]
    fn clip(from: f64, to: f64, limit: usize) -> Option<std::ops::RangeInclusive<usize>> {
        let last = limit.checked_sub(1)? as f64;
        let start = from.floor().max(0.0);
        let end = to.floor().min(last);
        if start > end {
            return None;
        }
        Some(start as usize..=end as usize)
    }
}

impl DrawingContext for Surface {
    /// The size is always our own, so it's only used to sanity check what the engine thinks.
    fn clear(&mut self, size: SurfaceSize) {
        if size != self.pixel_size() {
            tracing::trace!("'{}' surface cleared with a stale size: {size:?}", self.id);
        }
        self.surface = termwiz::surface::Surface::new(self.width, self.height);
    }

    fn set_fill(&mut self, colour: ColourEntry) {
        self.fill = colour.as_srgba();
    }

    /// Paints every pixel whose centre is inside the circle. Circles smaller than a single pixel
    /// still paint the pixel they're in.
    #[expect(
        clippy::as_conversions,
        clippy::cast_precision_loss,
        reason = "Pixel indices are always small"
    )]
    fn fill_circle(&mut self, centre: DVec2, radius: f64) -> Result<()> {
        if !centre.is_finite() || !radius.is_finite() || radius <= 0.0 || self.scale <= 0.0 {
            bail!("Degenerate circle at {centre} with radius {radius}");
        }

        let centre = centre / self.scale;
        let radius = radius / self.scale;

        let pixel_rows = self.height * 2;
        let columns = Self::clip(centre.x - radius, centre.x + radius, self.width);
        let rows = Self::clip(centre.y - radius, centre.y + radius, pixel_rows);
        let (Some(columns), Some(rows)) = (columns, rows) else {
            bail!("Circle at {centre} is off the surface");
        };

        let mut painted = 0_usize;
        for y in rows {
            for x in columns.clone() {
                let pixel_centre = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);
                if pixel_centre.distance_squared(centre) <= radius * radius {
                    self.add_pixel(x, y, self.fill)?;
                    painted += 1;
                }
            }
        }

        if painted == 0 {
            let covering = Self::clip(centre.x, centre.x, self.width)
                .zip(Self::clip(centre.y, centre.y, pixel_rows))
                .map(|(column, row)| (*column.start(), *row.start()));
            if let Some((x, y)) = covering {
                self.add_pixel(x, y, self.fill)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[expect(
    clippy::indexing_slicing,
    clippy::unwrap_used,
    clippy::shadow_unrelated,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;

    const GREY: Colour = (0.5, 0.5, 0.5, 1.0);
    const RED: Colour = (1.0, 0.0, 0.0, 1.0);

    fn surface(width: usize, height: usize) -> Surface {
        Surface::new("test".into(), width, height, 1.0)
    }

    fn painted_cells(surface: &mut Surface) -> usize {
        surface
            .surface
            .screen_cells()
            .iter()
            .flat_map(|line| line.iter())
            .filter(|cell| cell.str() != " ")
            .count()
    }

    #[test]
    fn add_new_pixels() {
        let mut surface = surface(2, 2);

        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), " ");
        assert_eq!(
            cell.attrs().foreground(),
            termwiz::color::ColorAttribute::Default
        );

        surface.add_pixel(0, 0, WHITE).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), "▀");
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(WHITE)
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );

        surface.add_pixel(1, 2, WHITE).unwrap();
        let cell = &surface.surface.screen_cells()[1][1];
        assert_eq!(cell.str(), "▀");

        let result = surface.add_pixel(1, 4, WHITE).unwrap_err();
        assert_eq!(
            format!("{}", result.root_cause()),
            "Tried to add pixel to row: 2"
        );
    }

    #[test]
    fn add_pixel_at_bottom_of_empty_cell() {
        let mut surface = surface(1, 1);

        surface.add_pixel(0, 1, WHITE).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), "▄");
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(WHITE)
        );
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn convert_cell_from_bottom_to_full() {
        let mut surface = surface(1, 1);

        surface.add_pixel(0, 1, WHITE).unwrap();
        surface.add_pixel(0, 0, RED).unwrap();
        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), "▀");
        assert_eq!(
            cell.attrs().foreground(),
            Surface::make_colour_attribute(RED)
        );
        assert_eq!(
            cell.attrs().background(),
            Surface::make_colour_attribute(WHITE)
        );
    }

    #[test]
    fn add_pixels_on_or_near_other_pixels() {
        let mut surface = surface(2, 1);
        surface.add_pixel(0, 0, WHITE).unwrap();

        let fg = Surface::make_colour_attribute(WHITE);
        let bg = Surface::make_colour_attribute(GREY);

        surface.add_pixel(0, 1, GREY).unwrap();
        let cells = surface.surface.screen_cells();
        let first_cell = cells[0][0].clone();
        assert_eq!(first_cell.str(), "▀");
        assert_eq!(first_cell.attrs().foreground(), fg);
        assert_eq!(first_cell.attrs().background(), bg);
    }

    #[test]
    fn pixel_size_is_scaled() {
        let surface = Surface::new("test".into(), 10, 5, 8.0);
        assert_eq!(surface.pixel_size(), SurfaceSize::new(80.0, 80.0));
    }

    #[test]
    fn fills_a_circle() {
        let mut surface = surface(10, 5);
        surface.set_fill(crate::colour_cycle::FALLBACK);
        surface.fill_circle(DVec2::new(5.0, 5.0), 2.0).unwrap();

        let cells = surface.surface.screen_cells();
        assert_eq!(cells[2][5].str(), "▀");
        assert_eq!(cells[0][0].str(), " ");
        assert_eq!(cells[2][9].str(), " ");
    }

    #[test]
    fn tiny_circles_still_show_up() {
        let mut surface = Surface::new("test".into(), 4, 4, 8.0);
        surface.fill_circle(DVec2::new(12.0, 12.0), 1.0).unwrap();
        assert_eq!(painted_cells(&mut surface), 1);
    }

    #[test]
    fn circles_are_clipped_to_the_surface() {
        let mut surface = surface(4, 2);
        surface.fill_circle(DVec2::new(0.0, 4.0), 100.0).unwrap();
        assert_eq!(painted_cells(&mut surface), 8);

        let off_surface = surface.fill_circle(DVec2::new(50.0, 50.0), 2.0);
        assert!(off_surface.is_err());
    }

    #[test]
    fn clearing_wipes_everything() {
        let mut surface = surface(4, 2);
        surface.fill_circle(DVec2::new(2.0, 2.0), 2.0).unwrap();
        surface.clear(surface.pixel_size());
        assert_eq!(painted_cells(&mut surface), 0);
    }

    #[test]
    fn empty_surface_never_panics() {
        let mut surface = surface(0, 0);
        assert!(surface.pixel_size().is_degenerate());
        assert!(surface.fill_circle(DVec2::new(1.0, 1.0), 3.0).is_err());
    }
}
