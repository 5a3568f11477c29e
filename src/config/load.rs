use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `REPRISE__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("REPRISE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.search.limit == 0 {
            return Err("search.limit must be >= 1".to_string());
        }
        if self.controls.skip_seconds == 0 {
            return Err("controls.skip_seconds must be >= 1".to_string());
        }
        if self.ui.poll_interval_ms == 0 {
            return Err("ui.poll_interval_ms must be >= 1".to_string());
        }
        Ok(())
    }

    /// Directories to scan; `~/Music` when none are configured.
    pub fn music_dirs(&self) -> Vec<PathBuf> {
        if !self.library.music_dirs.is_empty() {
            return self.library.music_dirs.clone();
        }
        home_dir()
            .map(|h| vec![h.join("Music")])
            .unwrap_or_default()
    }

    pub fn demo_dir(&self) -> Option<PathBuf> {
        self.library
            .demo_dir
            .clone()
            .or_else(|| data_dir().map(|d| d.join("demo")))
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        self.library
            .store_path
            .clone()
            .or_else(|| data_dir().map(|d| d.join("library.json")))
    }

    pub fn download_dir(&self) -> Option<PathBuf> {
        self.download
            .dir
            .clone()
            .or_else(|| home_dir().map(|h| h.join("Music").join("reprise")))
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log
            .path
            .clone()
            .or_else(|| state_dir().map(|d| d.join("reprise.log")))
    }
}

/// Resolve the config path from `REPRISE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("REPRISE_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/reprise/config.toml`
/// or `~/.config/reprise/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join("reprise").join("config.toml"))
}

/// `$XDG_DATA_HOME/reprise` or `~/.local/share/reprise`.
pub fn data_dir() -> Option<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share").map(|d| d.join("reprise"))
}

/// `$XDG_STATE_HOME/reprise` or `~/.local/state/reprise`.
pub fn state_dir() -> Option<PathBuf> {
    xdg_dir("XDG_STATE_HOME", ".local/state").map(|d| d.join("reprise"))
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(xdg) = env::var_os(var) {
        Some(PathBuf::from(xdg))
    } else {
        home_dir().map(|h| h.join(home_fallback))
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
