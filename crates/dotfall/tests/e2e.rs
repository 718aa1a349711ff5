//! End to end tests
#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "Tests aren't so strict"
)]
mod e2e {
    use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _};

    use dotfall_protocol::{DrawCommand, Frame, OutputMessages};

    /// Generous, so that slow CI machines don't cause flakiness.
    const TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

    struct Dotfall {
        child: tokio::process::Child,
        stdin: Option<tokio::process::ChildStdin>,
        stdout: tokio::io::Lines<tokio::io::BufReader<tokio::process::ChildStdout>>,
        _config_directory: tempfile::TempDir,
    }

    impl Dotfall {
        // We use the minimum possible ENV to support reproducibility of tests.
        fn start() -> Self {
            let config_directory = tempfile::tempdir().unwrap();
            let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_dotfall"))
                .env_clear()
                .arg("--headless")
                .arg("--seed")
                .arg("42")
                .arg("--frame-rate")
                .arg("120")
                .arg("--config-dir")
                .arg(config_directory.path())
                .stdin(std::process::Stdio::piped())
                .stdout(std::process::Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .unwrap();

            let stdin = child.stdin.take();
            let stdout = tokio::io::BufReader::new(child.stdout.take().unwrap()).lines();
            Self {
                child,
                stdin,
                stdout,
                _config_directory: config_directory,
            }
        }

        async fn send(&mut self, message: &serde_json::Value) {
            let line = format!("{message}\n");
            let stdin = self.stdin.as_mut().unwrap();
            stdin.write_all(line.as_bytes()).await.unwrap();
            stdin.flush().await.unwrap();
        }

        async fn next_frame(&mut self) -> Option<Frame> {
            let line = tokio::time::timeout(TIMEOUT, self.stdout.next_line())
                .await
                .unwrap()
                .unwrap()?;
            let message: OutputMessages = serde_json::from_str(&line).unwrap();
            let OutputMessages::Frame(frame) = message else {
                panic!("Unexpected output: {line}");
            };
            Some(frame)
        }

        async fn close(mut self) -> Vec<Frame> {
            drop(self.stdin.take());

            let mut remaining = Vec::new();
            while let Some(frame) = self.next_frame().await {
                remaining.push(frame);
            }

            let status = tokio::time::timeout(TIMEOUT, self.child.wait())
                .await
                .unwrap()
                .unwrap();
            assert!(status.success());
            remaining
        }
    }

    fn circles(frame: &Frame) -> Vec<((f64, f64), f64)> {
        frame
            .commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::FillCircle { centre, radius } => Some((*centre, *radius)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fountain_runs_and_stops() {
        let mut dotfall = Dotfall::start();
        dotfall
            .send(&serde_json::json!({"resize": {"width": 800, "height": 600}}))
            .await;
        dotfall.send(&serde_json::json!("start")).await;

        let first = dotfall.next_frame().await.unwrap();
        assert_eq!(first.width, 800);
        assert_eq!(first.height, 600);
        assert_eq!(
            first.commands[0],
            DrawCommand::Clear {
                width: 800.0,
                height: 600.0
            }
        );
        assert!(!circles(&first).is_empty());

        let mut most_dots = 0;
        for _ in 0..60 {
            let frame = dotfall.next_frame().await.unwrap();
            let dots = circles(&frame);
            for (_, radius) in &dots {
                assert!((5.0..25.0).contains(radius));
            }
            most_dots = most_dots.max(dots.len());
        }
        assert!(most_dots >= 10);

        dotfall.send(&serde_json::json!("stop")).await;
        let remaining = dotfall.close().await;
        let last = remaining.last().unwrap();
        assert!(circles(last).is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn nothing_is_drawn_before_start() {
        let mut dotfall = Dotfall::start();
        dotfall
            .send(&serde_json::json!({"resize": {"width": 320, "height": 200}}))
            .await;
        dotfall.send(&serde_json::json!("not a message")).await;
        dotfall.send(&serde_json::json!("stop")).await;

        let frames = dotfall.close().await;
        assert!(frames.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resizing_whilst_running() {
        let mut dotfall = Dotfall::start();
        dotfall
            .send(&serde_json::json!({"resize": {"width": 400, "height": 300}}))
            .await;
        dotfall.send(&serde_json::json!("start")).await;
        dotfall.next_frame().await.unwrap();

        dotfall
            .send(&serde_json::json!({"resize": {"width": 1000, "height": 500}}))
            .await;

        let mut resized = None;
        for _ in 0..120 {
            let frame = dotfall.next_frame().await.unwrap();
            if frame.width == 1000 {
                resized = Some(frame);
                break;
            }
        }
        let resized = resized.unwrap();
        assert_eq!(resized.height, 500);

        dotfall.close().await;
    }
}
