//! Run without a terminal. An external host controls the animation with JSON lines on STDIN and
//! receives every rendered frame as a JSON line on STDOUT.
//!
//! The host is in charge of the whole lifecycle, so nothing happens until it sends `"start"`,
//! and the surface has no size until the host sends its first `resize`.

use color_eyre::eyre::Result;
use tokio::io::{AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};

use dotfall_protocol::{ControlMessages, OutputMessages};

use crate::config::main::Config;
use crate::engine::{Engine, Schedule};
use crate::recorder::Recorder;
use crate::renderer::SurfaceSize;
use crate::run::FrameClock;

/// Everything that's needed to turn control messages into frames.
struct Headless<W: AsyncWrite + Unpin> {
    /// All the animation state.
    engine: Engine,
    /// Collects the draw commands of a single frame.
    recorder: Recorder,
    /// Whether the engine wants another frame.
    is_scheduled: bool,
    /// Where frames are sent.
    output: W,
}

/// Run until the host closes our STDIN.
pub async fn run(config: &Config, seed: Option<u64>) -> Result<()> {
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut headless = Headless::new(seed, tokio::io::stdout());
    headless.run(input, FrameClock::new(config.frame_rate)).await
}

impl<W: AsyncWrite + Unpin> Headless<W> {
    /// Instantiate
    fn new(seed: Option<u64>, output: W) -> Self {
        Self {
            engine: Engine::new(SurfaceSize::default(), seed),
            recorder: Recorder::default(),
            is_scheduled: false,
            output,
        }
    }

    /// The main loop. Control messages are always listened to, frames are only rendered whilst
    /// the engine asks for them.
    async fn run<R: tokio::io::AsyncBufRead + Unpin>(
        &mut self,
        input: R,
        mut clock: FrameClock,
    ) -> Result<()> {
        tracing::debug!("Starting headless loop");
        let mut lines = input.lines();

        #[expect(
            clippy::integer_division_remainder_used,
            reason = "`tokio::select! generates this.`"
        )]
        loop {
            tokio::select! {
                () = clock.sleep_until_next_frame_tick(), if self.is_scheduled => {
                    let schedule = self.engine.frame(&mut self.recorder);
                    self.emit(schedule).await?;
                }
                maybe_line = lines.next_line() => {
                    let Some(line) = maybe_line? else {
                        break;
                    };
                    self.handle_line(&line).await?;
                }
            }
        }

        self.finish().await?;
        tracing::debug!("Exited headless loop");
        Ok(())
    }

    /// React to a single line from the host. Lines that aren't control messages are ignored.
    async fn handle_line(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let message = match ControlMessages::from_line(line) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!("Ignoring control message: {error}");
                return Ok(());
            }
        };

        tracing::debug!("Control message: {message:?}");
        match message {
            ControlMessages::Start => {
                let schedule = self.engine.start(&mut self.recorder);
                self.emit(schedule).await?;
            }
            ControlMessages::Stop => self.engine.stop(),
            ControlMessages::Resize { width, height } => {
                self.engine.set_size(SurfaceSize::new(width.into(), height.into()));
            }
            #[expect(clippy::wildcard_enum_match_arm, reason = "It's an external protocol")]
            _ => tracing::warn!("Unhandled control message: {message:?}"),
        }
        tracing::trace!("Engine is now {:?}", self.engine.lifecycle());

        Ok(())
    }

    /// The host has gone. If we were still running then stop, and make sure the host's last
    /// frame is an empty one.
    async fn finish(&mut self) -> Result<()> {
        self.engine.stop();
        if self.is_scheduled {
            let schedule = self.engine.frame(&mut self.recorder);
            self.emit(schedule).await?;
        }
        Ok(())
    }

    /// Send the most recently rendered frame to the host.
    async fn emit(&mut self, schedule: Schedule) -> Result<()> {
        self.is_scheduled = schedule == Schedule::Continue;

        let message = OutputMessages::Frame(self.recorder.take_frame());
        let mut line = message.to_line()?;
        line.push('\n');
        self.output.write_all(line.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "Tests aren't so strict"
)]
mod test {
    use dotfall_protocol::DrawCommand;
    use tokio::io::AsyncWriteExt as _;

    use super::*;

    async fn run_with(input: &str) -> Vec<dotfall_protocol::Frame> {
        let mut headless = Headless::new(Some(1), Vec::new());
        headless
            .run(input.as_bytes(), FrameClock::new(1000))
            .await
            .unwrap();

        frames(headless.output)
    }

    fn frames(output: Vec<u8>) -> Vec<dotfall_protocol::Frame> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| {
                let message: OutputMessages = serde_json::from_str(line).unwrap();
                let OutputMessages::Frame(frame) = message else {
                    panic!("Only frames are expected");
                };
                frame
            })
            .collect()
    }

    fn circles(frame: &dotfall_protocol::Frame) -> usize {
        frame
            .commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::FillCircle { .. }))
            .count()
    }

    #[tokio::test]
    async fn nothing_happens_without_start() {
        let frames = run_with("{\"resize\":{\"width\":100,\"height\":100}}\n").await;
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn start_emits_a_frame_straight_away() {
        let input = "{\"resize\":{\"width\":800,\"height\":600}}\n\"start\"\n";
        let frames = run_with(input).await;

        assert_eq!(frames[0].width, 800);
        assert_eq!(frames[0].height, 600);
        assert!(circles(&frames[0]) > 0);
    }

    #[tokio::test]
    async fn closing_input_ends_with_an_empty_frame() {
        let input = "{\"resize\":{\"width\":800,\"height\":600}}\n\"start\"\n";
        let frames = run_with(input).await;

        let last = frames.last().unwrap();
        assert_eq!(
            last.commands,
            vec![DrawCommand::Clear {
                width: 800.0,
                height: 600.0
            }]
        );
    }

    #[tokio::test]
    async fn garbage_is_ignored() {
        let input = "not json\n\n{\"resize\":{\"width\":10,\"height\":10}}\n\"start\"\n";
        let frames = run_with(input).await;
        assert_eq!(frames[0].width, 10);
    }

    #[tokio::test]
    async fn stop_whilst_stopped_emits_nothing() {
        let frames = run_with("\"stop\"\n\"stop\"\n").await;
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn frames_stop_after_the_clearing_frame() {
        let mut headless = Headless::new(Some(1), Vec::new());
        let (mut writer, reader) = tokio::io::duplex(1024);

        // 20fps, so that "stop" is read well before the first tick after "start".
        let driver = headless.run(tokio::io::BufReader::new(reader), FrameClock::new(20));
        let host = async move {
            writer
                .write_all(b"{\"resize\":{\"width\":200,\"height\":100}}\n\"start\"\n\"stop\"\n")
                .await
                .unwrap();
            // Several frame periods, any frames after halting would arrive in here.
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            drop(writer);
        };
        let (result, ()) = tokio::join!(driver, host);
        result.unwrap();

        let frames = frames(headless.output);
        assert_eq!(frames.len(), 2);
        assert!(circles(&frames[0]) > 0);
        assert_eq!(
            frames[1].commands,
            vec![DrawCommand::Clear {
                width: 200.0,
                height: 100.0
            }]
        );
    }
}
