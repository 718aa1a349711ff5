//! All of the user config for dotfall.

use color_eyre::eyre::ContextCompat as _;
use color_eyre::eyre::Result;

/// A copy of the default config file. It gets copied to the user's config folder the first time
/// they start dotfall.
static DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

/// The name of the main config file when the user doesn't choose one.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "dotfall.toml";

/// The valid log levels. Based on our `tracing` crate.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LogLevel {
    /// Error
    Error,
    /// Warnings
    Warn,
    /// Info
    Info,
    /// Debug
    Debug,
    /// Trace
    Trace,
    /// No logging
    Off,
}

/// Managing user config.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
#[non_exhaustive]
pub struct Config {
    /// The name of the drawing surface. It's only used for identification, the surface itself
    /// is always the whole terminal.
    pub surface: String,
    /// Target frame rate
    pub frame_rate: u32,
    /// How many simulation pixels make up a single terminal pixel. Bigger numbers mean smaller
    /// looking dots.
    pub scale: f64,
    /// Whether to start the animation straight away.
    pub autostart: bool,
    /// The maximum log level
    pub log_level: LogLevel,
    /// The location of the log file.
    pub log_path: std::path::PathBuf,
    /// Keybindings
    pub keybindings: super::input::KeybindingsRaw,
}

impl Default for Config {
    fn default() -> Self {
        let log_directory = match dirs::state_dir() {
            Some(directory) => directory,
            None => std::path::PathBuf::new().join("./"),
        };
        let log_path = log_directory.join("dotfall").join("dotfall.log");

        Self {
            surface: "dotfall".into(),
            frame_rate: 60,
            scale: 8.0,
            autostart: true,
            log_level: LogLevel::Off,
            log_path,
            keybindings: super::input::KeybindingsRaw::new(),
        }
    }
}

impl Config {
    /// Get the stable location of dotfall's config directory on the user's system.
    pub fn default_directory() -> Result<std::path::PathBuf> {
        Ok(dirs::config_dir()
            .context("Couldn't get standard config directory")?
            .join("dotfall"))
    }

    /// Figure out where our config is being stored, and create the directory if needed.
    pub fn setup_directory(
        maybe_custom_path: Option<std::path::PathBuf>,
    ) -> Result<std::path::PathBuf> {
        let path = match maybe_custom_path {
            None => Self::default_directory()?,
            Some(path) => path,
        };

        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Load the main config. The default config is written out first if the user doesn't
    /// have one yet.
    pub fn load(directory: &std::path::Path, file_name: &str) -> Result<Self> {
        let config_path = directory.join(file_name);
        let is_default_config = file_name == DEFAULT_CONFIG_FILE_NAME;
        if is_default_config && !config_path.exists() {
            std::fs::write(&config_path, DEFAULT_CONFIG)?;
        }

        tracing::info!("Loading the main dotfall config from: {config_path:?}");
        let result = std::fs::read_to_string(&config_path);
        match result {
            Ok(data) => {
                tracing::trace!("Using config file:\n{data}");
                let config = toml::from_str::<Self>(&data)?;
                config.validate()?;
                Ok(config)
            }
            Err(err) => {
                color_eyre::eyre::bail!("Couldn't load config at {config_path:?}: {err}");
            }
        }
    }

    /// Values that parse fine but that we can't do anything sensible with.
    fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            color_eyre::eyre::bail!("`frame_rate` must be more than 0");
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            color_eyre::eyre::bail!("`scale` must be a positive number");
        }
        Ok(())
    }

    /// Parse the shipped default config.
    fn parse_default_config() -> Result<Self> {
        Ok(toml::from_str::<Self>(DEFAULT_CONFIG)?)
    }

    /// The user's keybindings layered on top of the default ones.
    pub fn keybindings(&self) -> Result<super::input::KeybindingsAsEvents> {
        let defaults = Self::parse_default_config()?;
        super::input::merge_keybindings(&defaults.keybindings, &self.keybindings)
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::float_cmp,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;
    use crate::config::input::KeybindingAction;

    #[test]
    fn shipped_config_is_valid() {
        let config = Config::parse_default_config().unwrap();
        config.validate().unwrap();
        assert_eq!(config.surface, "dotfall");
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.scale, 8.0);
        assert!(config.autostart);
        assert_eq!(config.keybindings.len(), 4);
    }

    #[test]
    fn first_run_writes_default_config() {
        let directory = tempfile::tempdir().unwrap();
        let config = Config::load(directory.path(), DEFAULT_CONFIG_FILE_NAME).unwrap();

        let written = std::fs::read_to_string(directory.path().join(DEFAULT_CONFIG_FILE_NAME));
        assert_eq!(written.unwrap(), DEFAULT_CONFIG);
        assert_eq!(config.frame_rate, 60);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(
            directory.path().join("custom.toml"),
            "frame_rate = 24\n[keybindings.toggle]\nkey = \"t\"\n",
        )
        .unwrap();

        let config = Config::load(directory.path(), "custom.toml").unwrap();
        assert_eq!(config.frame_rate, 24);
        assert_eq!(config.scale, 8.0);
        assert_eq!(config.log_level, LogLevel::Off);

        let keybindings = config.keybindings().unwrap();
        assert_eq!(keybindings.len(), 4);
        assert_eq!(
            keybindings.get(&KeybindingAction::Toggle).unwrap().key,
            termwiz::input::KeyCode::Char('t')
        );
    }

    #[test]
    fn missing_custom_config_is_an_error() {
        let directory = tempfile::tempdir().unwrap();
        assert!(Config::load(directory.path(), "nope.toml").is_err());
    }

    #[test]
    fn nonsense_values_are_rejected() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(directory.path().join("zero.toml"), "frame_rate = 0\n").unwrap();
        assert!(Config::load(directory.path(), "zero.toml").is_err());

        std::fs::write(directory.path().join("scale.toml"), "scale = -1.0\n").unwrap();
        assert!(Config::load(directory.path(), "scale.toml").is_err());
    }

    #[test]
    fn custom_directory_is_created() {
        let directory = tempfile::tempdir().unwrap();
        let nested = directory.path().join("a").join("b");
        let path = Config::setup_directory(Some(nested.clone())).unwrap();
        assert_eq!(path, nested);
        assert!(nested.is_dir());
    }
}
