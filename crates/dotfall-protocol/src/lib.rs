//! These are all the types that a host needs to drive dotfall's headless surface.
//!
//! The host sends [`ControlMessages`] as JSON, one per line, on dotfall's STDIN. Dotfall replies
//! with one [`OutputMessages`] per line on its STDOUT for every frame it renders. The host is
//! then free to paint the draw commands onto whatever it likes, a browser canvas for example.

#![expect(clippy::pub_use, reason = "This seems to come from the `bon` crate")]

use snafu::ResultExt as _;

/// An RGB colour. Every channel is in the range `0..=255`.
pub type Colour = (u8, u8, u8);

/// A single instruction for the host's 2D drawing context. They must be applied in order.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DrawCommand {
    /// Clear the rectangle spanning from the origin to the given size.
    Clear {
        /// Width of the cleared region.
        width: f64,
        /// Height of the cleared region.
        height: f64,
    },
    /// Set the colour used by all following fills.
    SetFill(Colour),
    /// Fill a circle using the most recently set fill colour.
    FillCircle {
        /// The centre of the circle. [0, 0] is in the top-left.
        centre: (f64, f64),
        /// The radius of the circle.
        radius: f64,
    },
}

/// Everything needed to paint one frame of the animation.
#[derive(serde::Serialize, serde::Deserialize, bon::Builder, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Frame {
    /// The width of the surface that the frame was rendered for.
    pub width: u32,
    /// The height of the surface that the frame was rendered for.
    pub height: u32,
    /// The ordered draw commands.
    #[builder(default)]
    pub commands: Vec<DrawCommand>,
}

/// The various kinds of messages that a host can send to dotfall.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ControlMessages {
    /// Start, or restart, the animation. Any existing dots are cleared.
    Start,
    /// Stop the animation. All dots vanish immediately.
    Stop,
    /// The host's drawing surface has changed size.
    Resize {
        /// The new width in pixels.
        width: u32,
        /// The new height in pixels.
        height: u32,
    },
}

/// All the message kinds that dotfall can send to the host.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum OutputMessages {
    /// A rendered frame.
    Frame(Frame),
}

/// Errors when reading or writing protocol lines.
#[derive(Debug, snafu::Snafu)]
#[non_exhaustive]
pub enum ProtocolError {
    #[snafu(display("Couldn't parse control message: {line}"))]
    /// The host sent a line that isn't a known control message.
    Decode {
        /// The offending line.
        line: String,
        /// The parent error type
        source: serde_json::Error,
    },

    #[snafu(display("Couldn't serialise output message"))]
    /// An output message couldn't be turned into JSON.
    Encode {
        /// The parent error type
        source: serde_json::Error,
    },
}

impl ControlMessages {
    /// Parse a single line of JSON sent by the host.
    ///
    /// # Errors
    /// When the line isn't a valid control message.
    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(line.trim()).context(DecodeSnafu { line })
    }
}

impl OutputMessages {
    /// Serialise to a single line of JSON, without the trailing newline.
    ///
    /// # Errors
    /// When serialisation fails.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).context(EncodeSnafu)
    }
}

#[expect(
    clippy::default_numeric_fallback,
    clippy::unwrap_used,
    reason = "Tests aren't so strict"
)]
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn output_frame() {
        let expected = serde_json::json!(
            {
                "frame": {
                    "width": 80,
                    "height": 48,
                    "commands": [
                        { "clear": { "width": 80.0, "height": 48.0 } },
                        { "set_fill": [255, 6, 0] },
                        { "fill_circle": { "centre": [40.0, 47.5], "radius": 12.0 } },
                    ],
                }
            }
        );

        let frame = Frame::builder()
            .width(80)
            .height(48)
            .commands(vec![
                DrawCommand::Clear {
                    width: 80.0,
                    height: 48.0,
                },
                DrawCommand::SetFill((255, 6, 0)),
                DrawCommand::FillCircle {
                    centre: (40.0, 47.5),
                    radius: 12.0,
                },
            ])
            .build();
        let output = OutputMessages::Frame(frame);

        assert_eq!(expected.to_string(), output.to_line().unwrap());
    }

    #[test]
    fn empty_frame_defaults_to_no_commands() {
        let frame = Frame::builder().width(1).height(2).build();
        assert!(frame.commands.is_empty());
    }

    #[test]
    fn input_start_and_stop() {
        assert_eq!(
            ControlMessages::from_line("\"start\"").unwrap(),
            ControlMessages::Start
        );
        assert_eq!(
            ControlMessages::from_line("  \"stop\"\n").unwrap(),
            ControlMessages::Stop
        );
    }

    #[test]
    fn input_resize() {
        let line = serde_json::json!(
            {
                "resize": {
                    "width": 640,
                    "height": 480,
                }
            }
        )
        .to_string();

        assert_eq!(
            ControlMessages::from_line(&line).unwrap(),
            ControlMessages::Resize {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn input_garbage() {
        let error = ControlMessages::from_line("{\"explode\": true}").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Couldn't parse control message: {\"explode\": true}"
        );
    }
}
