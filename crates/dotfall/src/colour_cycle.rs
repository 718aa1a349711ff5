//! A precomputed rainbow, and how to pick a colour from it for a point on the surface.
//!
//! The rainbow is one full rotation of hue with saturation and value held at maximum. It's
//! walked in six phases, each of which ramps exactly one of the red, green or blue channels up
//! or down over 256 steps.

/// The number of steps in each phase of the rainbow.
const STEPS_PER_PHASE: usize = 256;

/// The total number of colours in one full traversal of the rainbow.
pub const TABLE_LENGTH: usize = STEPS_PER_PHASE * Phase::ALL.len();

/// Used whenever a lookup can't resolve to an entry in the table. For example when the surface
/// has no width.
pub const FALLBACK: ColourEntry = ColourEntry {
    r: u8::MAX,
    g: u8::MAX,
    b: u8::MAX,
};

/// A single 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "An RGB triple isn't going to grow any more channels"
)]
pub struct ColourEntry {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl ColourEntry {
    /// Convert to the normalised RGBA that the terminal surface draws with.
    #[must_use]
    pub fn as_srgba(self) -> crate::surface::Colour {
        let rgb: palette::Srgb<f32> = palette::Srgb::new(self.r, self.g, self.b).into_format();
        (rgb.red, rgb.green, rgb.blue, 1.0)
    }

    /// Convert to the colour used by the headless protocol.
    #[must_use]
    pub const fn as_tuple(self) -> dotfall_protocol::Colour {
        (self.r, self.g, self.b)
    }
}

/// The six legs of the hue wheel, in the order they're walked.
#[derive(Debug, Clone, Copy)]
enum Phase {
    /// Red to yellow
    GreenRising,
    /// Yellow to green
    RedFalling,
    /// Green to cyan
    BlueRising,
    /// Cyan to blue
    GreenFalling,
    /// Blue to magenta
    RedRising,
    /// Magenta back to red
    BlueFalling,
}

impl Phase {
    /// Every phase, in rainbow order.
    const ALL: [Self; 6] = [
        Self::GreenRising,
        Self::RedFalling,
        Self::BlueRising,
        Self::GreenFalling,
        Self::RedRising,
        Self::BlueFalling,
    ];

    /// The colour at the given step into this phase.
    const fn colour(self, step: u8) -> ColourEntry {
        let rising = step;
        let falling = u8::MAX - step;
        let (r, g, b) = match self {
            Self::GreenRising => (u8::MAX, rising, 0),
            Self::RedFalling => (falling, u8::MAX, 0),
            Self::BlueRising => (0, u8::MAX, rising),
            Self::GreenFalling => (0, falling, u8::MAX),
            Self::RedRising => (rising, 0, u8::MAX),
            Self::BlueFalling => (u8::MAX, 0, falling),
        };
        ColourEntry { r, g, b }
    }
}

/// A frame counter that slides the rainbow across the surface. Always kept within the bounds of
/// the colour table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollingOffset(usize);

impl RollingOffset {
    /// The current offset.
    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }

    /// Move the rainbow along by one step.
    pub const fn advance(&mut self) {
        self.0 = (self.0 + 1) % TABLE_LENGTH;
    }
}

/// One complete rainbow, computed once and never changed.
#[derive(Debug, Clone)]
pub struct ColourTable {
    /// The colours, in rainbow order.
    entries: Vec<ColourEntry>,
}

impl ColourTable {
    /// Walk all the phases of the rainbow.
    #[must_use]
    pub fn build() -> Self {
        let entries = Phase::ALL
            .into_iter()
            .flat_map(|phase| (0..=u8::MAX).map(move |step| phase.colour(step)))
            .collect();
        Self { entries }
    }

    /// The number of colours in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no colours at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the colour at a raw table index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<ColourEntry> {
        self.entries.get(index).copied()
    }

    /// Map a horizontal position on the surface to a colour. The whole rainbow is stretched over
    /// the width of the surface and then shifted along by the rolling offset.
    ///
    /// Never fails. Anything that can't be resolved to an entry, like a surface with no width,
    /// gives [`FALLBACK`].
    #[must_use]
    #[expect(
        clippy::as_conversions,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "The location is floored, finite and reduced into the table's range first"
    )]
    pub fn lookup_for_offset(
        &self,
        x: f64,
        surface_width: f64,
        rolling_offset: usize,
    ) -> ColourEntry {
        let length = self.len();
        if length == 0 {
            return FALLBACK;
        }

        let step = length as f64 / surface_width;
        let location = (step * x).floor();
        if !location.is_finite() {
            return FALLBACK;
        }

        // `rem_euclid()` keeps locations to the left of the surface positive.
        let wrapped_location = location.rem_euclid(length as f64) as usize;
        let index = (wrapped_location + rolling_offset % length) % length;
        self.get(index).unwrap_or(FALLBACK)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests aren't so strict")]
mod test {
    use super::*;

    const fn rgb(r: u8, g: u8, b: u8) -> ColourEntry {
        ColourEntry { r, g, b }
    }

    #[test]
    fn full_rainbow_length() {
        let table = ColourTable::build();
        assert_eq!(table.len(), 1536);
        assert_eq!(TABLE_LENGTH, 1536);
    }

    #[test]
    fn starts_at_red() {
        let table = ColourTable::build();
        assert_eq!(table.get(0), Some(rgb(255, 0, 0)));
        assert_eq!(table.get(1), Some(rgb(255, 1, 0)));
    }

    #[test]
    fn phase_boundaries() {
        let table = ColourTable::build();
        assert_eq!(table.get(255), Some(rgb(255, 255, 0)));
        assert_eq!(table.get(256), Some(rgb(255, 255, 0)));
        assert_eq!(table.get(512 + 255), Some(rgb(0, 255, 255)));
        assert_eq!(table.get(1024 + 255), Some(rgb(255, 0, 255)));
        assert_eq!(table.get(1535), Some(rgb(255, 0, 0)));
        assert_eq!(table.get(1536), None);
    }

    #[test]
    fn rainbow_is_continuous() {
        let table = ColourTable::build();
        for index in 0..table.len() {
            let current = table.get(index).unwrap();
            let next = table.get((index + 1) % table.len()).unwrap();
            assert!(current.r.abs_diff(next.r) <= 1, "red jumps at {index}");
            assert!(current.g.abs_diff(next.g) <= 1, "green jumps at {index}");
            assert!(current.b.abs_diff(next.b) <= 1, "blue jumps at {index}");
        }
    }

    #[test]
    fn every_entry_is_fully_saturated() {
        let table = ColourTable::build();
        for index in 0..table.len() {
            let entry = table.get(index).unwrap();
            let channels = [entry.r, entry.g, entry.b];
            assert!(channels.contains(&255), "no max channel at {index}");
            assert!(channels.contains(&0), "no min channel at {index}");
        }
    }

    #[test]
    fn lookup_stretches_rainbow_over_width() {
        let table = ColourTable::build();
        assert_eq!(table.lookup_for_offset(10.0, 1536.0, 0), rgb(255, 10, 0));
        assert_eq!(table.lookup_for_offset(10.0, 768.0, 0), rgb(255, 20, 0));
        assert_eq!(table.lookup_for_offset(10.0, 768.0, 5), rgb(255, 25, 0));
    }

    #[test]
    fn lookup_is_periodic_in_offset() {
        let table = ColourTable::build();
        for (x, width, offset) in [
            (0.0, 100.0, 0),
            (33.3, 640.0, 17),
            (-12.0, 80.0, 1535),
            (9_999.0, 3.0, 123_456),
        ] {
            assert_eq!(
                table.lookup_for_offset(x, width, offset),
                table.lookup_for_offset(x, width, offset + TABLE_LENGTH),
            );
        }
    }

    #[test]
    fn lookup_wraps_negative_positions() {
        let table = ColourTable::build();
        let colour = table.lookup_for_offset(-1.0, 1536.0, 0);
        assert_eq!(Some(colour), table.get(1535));
    }

    #[test]
    fn lookup_on_zero_width_surface_is_white() {
        let table = ColourTable::build();
        assert_eq!(table.lookup_for_offset(0.0, 0.0, 0), FALLBACK);
        assert_eq!(table.lookup_for_offset(12.0, 0.0, 7), FALLBACK);
        assert_eq!(table.lookup_for_offset(f64::NAN, 100.0, 0), FALLBACK);
    }

    #[test]
    fn rolling_offset_wraps() {
        let mut offset = RollingOffset::default();
        for _ in 0..TABLE_LENGTH - 1 {
            offset.advance();
        }
        assert_eq!(offset.value(), TABLE_LENGTH - 1);
        offset.advance();
        assert_eq!(offset.value(), 0);
    }

    #[test]
    fn converts_to_terminal_colour() {
        let colour = rgb(255, 0, 255).as_srgba();
        assert_eq!(colour, (1.0, 0.0, 1.0, 1.0));
        assert_eq!(rgb(1, 2, 3).as_tuple(), (1, 2, 3));
    }
}
