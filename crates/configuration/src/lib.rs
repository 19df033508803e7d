use crate::error::ConfigError;
use std::path::{Path, PathBuf};

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{LoggingSettings, ServerSettings, Settings, StorageSettings};

/// The settings file read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tradelab.toml";

/// Prefix of the environment variables overriding file settings,
/// e.g. `TRADELAB__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "TRADELAB";

/// Loads the application settings.
///
/// Sources are layered: built-in defaults, then the TOML file at `path` (or
/// `tradelab.toml`; a missing file is tolerated), then `TRADELAB__*`
/// environment variables. The result is validated before it is returned.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let builder = config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8081)?
        .set_default("storage.data_dir", "data")?
        .set_default("logging.level", "info")?
        .set_default("logging.file_prefix", "tradelab.log")?
        .add_source(config::File::from(file).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Settings` struct
    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;
    tracing::debug!(file = %file.display(), "Settings loaded.");

    Ok(settings)
}

/// Command-line overrides applied on top of the loaded settings.
#[cfg_attr(feature = "clap", derive(clap::Args))]
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the settings file.
    #[cfg_attr(feature = "clap", arg(long))]
    pub config: Option<PathBuf>,

    /// Overrides `storage.data_dir`.
    #[cfg_attr(feature = "clap", arg(long))]
    pub data_dir: Option<PathBuf>,

    /// Overrides `server.port`.
    #[cfg_attr(feature = "clap", arg(long))]
    pub port: Option<u16>,
}

impl ConfigArgs {
    /// Loads the settings file named by `--config` and applies the remaining flags.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut settings = load_settings(self.config.as_deref())?;
        if let Some(data_dir) = &self.data_dir {
            settings.storage.data_dir = data_dir.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.storage.data_dir, PathBuf::from("data"));
        assert_eq!(settings.logging.level, "info");
        assert!(settings.logging.directory.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tradelab.toml");
        fs::write(
            &path,
            "[server]\nport = 9100\n\n[storage]\ndata_dir = \"/var/lib/tradelab\"\n\n[logging]\ndirectory = \"logs\"\n",
        )
        .unwrap();
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.storage.data_dir, PathBuf::from("/var/lib/tradelab"));
        assert_eq!(settings.logging.directory, Some(PathBuf::from("logs")));
        assert_eq!(
            settings.listen_addr().unwrap().to_string(),
            "0.0.0.0:9100"
        );
    }

    #[test]
    fn zero_port_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tradelab.toml");
        fs::write(&path, "[server]\nport = 0\n").unwrap();
        assert!(matches!(
            load_settings(Some(&path)),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn args_override_loaded_settings() {
        let dir = tempdir().unwrap();
        let args = ConfigArgs {
            config: Some(dir.path().join("absent.toml")),
            data_dir: Some(dir.path().to_path_buf()),
            port: Some(7000),
        };
        let settings = args.load().unwrap();
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.storage.data_dir, dir.path());
    }
}
