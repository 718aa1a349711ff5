//! All the CLI arguments for dotfall

/// A fountain of rainbow dots for your terminal.
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
#[non_exhaustive]
pub struct CliArgs {
    /// Path to the config directory. Defaults to your system's standard config location.
    #[arg(long)]
    pub config_dir: Option<std::path::PathBuf>,

    /// Name of the main config file inside the config directory.
    #[arg(long, default_value = crate::config::main::DEFAULT_CONFIG_FILE_NAME)]
    pub main_config: String,

    /// Override the log level from the config file.
    #[arg(long, value_enum)]
    pub log_level: Option<crate::config::main::LogLevel>,

    /// Override the log file path from the config file.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,

    /// Override the target frame rate from the config file.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub frame_rate: Option<u32>,

    /// Don't draw to the terminal. Instead read JSON control messages from STDIN and write a
    /// JSON frame of draw commands to STDOUT for every rendered frame.
    #[arg(long)]
    pub headless: bool,

    /// Seed the random number generator, making every run identical.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests aren't so strict")]
mod test {
    use clap::Parser as _;

    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["dotfall"]).unwrap();
        assert_eq!(args.main_config, "dotfall.toml");
        assert!(!args.headless);
        assert!(args.seed.is_none());
    }

    #[test]
    fn overrides() {
        let args = CliArgs::try_parse_from([
            "dotfall",
            "--headless",
            "--seed",
            "7",
            "--frame-rate",
            "30",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert!(args.headless);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.frame_rate, Some(30));
        assert_eq!(args.log_level, Some(crate::config::main::LogLevel::Debug));
    }

    #[test]
    fn zero_frame_rate_is_refused() {
        assert!(CliArgs::try_parse_from(["dotfall", "--frame-rate", "0"]).is_err());
    }
}
