//! Main entrypoint for running dotfall

use clap::Parser as _;
use color_eyre::eyre::{ContextCompat as _, Result};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

use crate::cli_args::CliArgs;
use crate::config::main::Config;

/// Microseconds in a second.
const ONE_MICROSECOND: u64 = 1_000_000;

/// Messages between the STDIN thread and the render loop.
#[derive(Clone, Debug)]
pub enum Protocol {
    /// The entire application is exiting.
    End,
    /// Parsed input from STDIN.
    Input(termwiz::input::InputEvent),
}

/// Everything `main()` needs to know once dotfall has finished.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct Outcome {
    /// Where the logs were written, if anywhere.
    pub log_path: Option<std::path::PathBuf>,
}

/// Stands in for a display's refresh signal.
pub struct FrameClock {
    /// Target frames per second.
    frame_rate: u32,
    /// When the previous frame was due.
    last_frame_tick: std::time::Instant,
}

impl FrameClock {
    /// Instantiate
    #[must_use]
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate: frame_rate.max(1),
            last_frame_tick: std::time::Instant::now(),
        }
    }

    /// Wait until it's time for the next frame. If the previous frame took longer than a
    /// frame's worth of time then there's no waiting at all.
    pub async fn sleep_until_next_frame_tick(&mut self) {
        let target = ONE_MICROSECOND.wrapping_div(self.frame_rate.into());
        let target_frame_rate_micro = std::time::Duration::from_micros(target);
        if let Some(wait) = target_frame_rate_micro.checked_sub(self.last_frame_tick.elapsed()) {
            tokio::time::sleep(wait).await;
        }
        self.last_frame_tick = std::time::Instant::now();
    }
}

/// Main entrypoint
pub async fn run() -> Result<Outcome> {
    let cli_args = CliArgs::parse();
    let (config, outcome) = setup(&cli_args)?;

    if cli_args.headless {
        crate::headless::run(&config, cli_args.seed).await?;
        return Ok(outcome);
    }

    let keybindings = config.keybindings()?;
    let (protocol_tx, _) = tokio::sync::broadcast::channel(64);
    let input_thread_handle = crate::input::Input::start(protocol_tx.clone());
    override_on_panic_behaviour();

    crate::terminal::run(&config, &keybindings, cli_args.seed, &protocol_tx).await?;
    broadcast_protocol_end(&protocol_tx);

    if input_thread_handle.is_finished() {
        // The STDIN loop blocks on reading, so it can't exit its loop by itself. Therefore we
        // should only join it if it finished due of its own error.
        input_thread_handle
            .join()
            .map_err(|err| color_eyre::eyre::eyre!("STDIN handle: {err:?}"))??;
    }

    tracing::trace!("Leaving dotfall's main `run()` function");
    Ok(outcome)
}

/// The default behaviour prints all panics to the CLI, which would mangle the user's terminal
/// whilst it's in raw mode. So log them instead.
fn override_on_panic_behaviour() {
    std::panic::set_hook(Box::new(|info| {
        let message = if let Some(message) = info.payload().downcast_ref::<String>() {
            message
        } else if let Some(message) = info.payload().downcast_ref::<&str>() {
            message
        } else {
            "Caught a panic with an unknown type."
        };
        let location = match info.location() {
            Some(location) => format!(
                "{}@{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
            None => "Unknown location".to_owned(),
        };
        tracing::error!("Caught panic ({}): {message:?}", location);
    }));
}

/// Signal all task/thread loops to exit.
///
/// We keep it in its own function because we need to handle the error separately. If the error
/// were to be bubbled with `?` as usual, there's a chance it would never be logged, because the
/// protocol end signal is itself what allows the central error handler to even be reached.
pub fn broadcast_protocol_end(protocol_tx: &tokio::sync::broadcast::Sender<Protocol>) {
    tracing::debug!("Broadcasting the protocol `End` message to all listeners");
    if protocol_tx.receiver_count() == 0 {
        return;
    }
    let result = protocol_tx.send(Protocol::End);
    if let Err(error) = result {
        tracing::error!("{error:?}");
    }
}

/// Load the config, apply any CLI overrides to it and start logging.
fn setup(cli_args: &CliArgs) -> Result<(Config, Outcome)> {
    let directory_result = Config::setup_directory(cli_args.config_dir.clone());
    let directory = match directory_result {
        Ok(directory) => directory,
        Err(directory_error) => {
            color_eyre::eyre::bail!("Error setting up config directory: {directory_error:?}");
        }
    };

    let mut config = match Config::load(&directory, &cli_args.main_config) {
        Ok(config) => config,
        Err(config_error) => {
            let path = directory.join(&cli_args.main_config);
            color_eyre::eyre::bail!(
                "Bad config file: {config_error:?}\n\nConfig path: {}",
                path.display()
            );
        }
    };

    if let Some(frame_rate) = cli_args.frame_rate {
        config.frame_rate = frame_rate;
    }
    if let Some(log_path) = cli_args.log_path.clone() {
        config.log_path = log_path;
    }
    if let Some(log_level) = cli_args.log_level.clone() {
        config.log_level = log_level;
    }

    let log_path = setup_logging(&config)?;

    tracing::info!("Starting dotfall");
    tracing::debug!("Loaded config: {config:?}");

    Ok((config, Outcome { log_path }))
}

/// Setup logging. Logs always go to a file, because both STDOUT and the terminal are in use.
fn setup_logging(config: &Config) -> Result<Option<std::path::PathBuf>> {
    let are_log_filters_manually_set = std::env::var("DOTFALL_LOG").is_ok();
    let level_as_string = format!("{:?}", config.log_level).to_lowercase();

    let is_loggable = !matches!(config.log_level, crate::config::main::LogLevel::Off)
        || are_log_filters_manually_set;
    if !is_loggable {
        return Ok(None);
    }

    let path = config.log_path.clone();
    let directory = path.parent().context("Couldn't get log path's parent")?;
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(&path)?;

    let filters = if are_log_filters_manually_set {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("error".parse()?)
            .with_env_var("DOTFALL_LOG")
            .from_env_lossy()
    } else {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("off".parse()?)
            .parse_lossy("")
            .add_directive(format!("dotfall={level_as_string}").parse()?)
    };

    let logfile_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_filter(filters);
    tracing_subscriber::registry().with(logfile_layer).init();

    Ok(Some(path))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn frame_clock_waits_for_the_next_tick() {
        let mut clock = FrameClock::new(50);
        clock.sleep_until_next_frame_tick().await;
        let start = std::time::Instant::now();
        clock.sleep_until_next_frame_tick().await;
        assert!(start.elapsed() >= std::time::Duration::from_millis(15));
    }

    #[tokio::test]
    async fn frame_clock_does_not_wait_when_behind() {
        let mut clock = FrameClock::new(50);
        std::thread::sleep(std::time::Duration::from_millis(30));
        let start = std::time::Instant::now();
        clock.sleep_until_next_frame_tick().await;
        assert!(start.elapsed() < std::time::Duration::from_millis(15));
    }
}
