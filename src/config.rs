mod config_validator;
pub mod raw_config;

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

pub use config_validator::{
    MAX_COPY_POLL_INTERVAL_MS, MAX_COPY_POLL_TRIES, MAX_PASTE_SETTLE_MS, MIN_COPY_POLL_TRIES,
};
pub use raw_config::RawConfig;
use recaps_core::{registry::LayoutRegistry, workflow::RewriteTiming};
use serde::{Deserialize, Deserializer, Serialize};

const APP_DIR: &str = "Recaps";
const CONFIG_FILE: &str = "config.toml";

/// Persisted user settings.
///
/// Layout roles are stored by display name, so they survive reordering of the installed layout
/// list but not renaming of a layout.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Config {
    pub main: Option<String>,
    pub paired: Option<String>,

    pub copy_poll_tries: u32,
    pub copy_poll_interval_ms: u32,
    pub paste_settle_ms: u32,

    pub show_tray_icon: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main: None,
            paired: None,
            copy_poll_tries: 10,
            copy_poll_interval_ms: 30,
            paste_settle_ms: 100,
            show_tray_icon: true,
        }
    }
}

pub fn config_path() -> io::Result<PathBuf> {
    let appdata = std::env::var_os("APPDATA")
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "APPDATA is not set"))?;

    Ok(PathBuf::from(appdata).join(APP_DIR).join(CONFIG_FILE))
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    std::fs::create_dir_all(dir)
}

fn confy_err(e: confy::ConfyError) -> io::Error {
    io::Error::other(e)
}

/// Loads the configuration, creating the file with defaults when it does not exist yet.
pub fn load() -> io::Result<Config> {
    let path = config_path()?;
    ensure_parent_dir(&path)?;

    confy::load_path(&path).map_err(confy_err)
}

pub fn save(cfg: &Config) -> io::Result<()> {
    cfg.validate()
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

    let path = config_path()?;
    ensure_parent_dir(&path)?;
    confy::store_path(path, cfg).map_err(confy_err)
}

/// Loads the configuration for runtime use.
///
/// A missing, unreadable or invalid file yields the defaults. The application stays usable
/// even when the file was edited by hand.
pub fn load_or_default() -> Config {
    match load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(msg = "config_load_failed_using_defaults", error = %e);
            Config::default()
        }
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = String;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let cfg = Self {
            main: raw.main.filter(|s| !s.is_empty()),
            paired: raw.paired.filter(|s| !s.is_empty()),
            copy_poll_tries: raw.copy_poll_tries,
            copy_poll_interval_ms: raw.copy_poll_interval_ms,
            paste_settle_ms: raw.paste_settle_ms,
            show_tray_icon: raw.show_tray_icon,
        };

        cfg.validate()?;
        Ok(cfg)
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawConfig::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl Config {
    pub fn rewrite_timing(&self) -> RewriteTiming {
        RewriteTiming {
            copy_poll_tries: self.copy_poll_tries,
            copy_poll_interval: Duration::from_millis(u64::from(self.copy_poll_interval_ms)),
            paste_settle: Duration::from_millis(u64::from(self.paste_settle_ms)),
        }
    }

    /// Copies the current roles of `registry` into the persisted names.
    ///
    /// Returns `true` when a name changed.
    pub fn remember_roles(&mut self, registry: &LayoutRegistry) -> bool {
        let Some((main, paired)) = registry.persisted_names() else {
            return false;
        };

        let changed =
            self.main.as_deref() != Some(main) || self.paired.as_deref() != Some(paired);

        self.main = Some(main.to_owned());
        self.paired = Some(paired.to_owned());
        changed
    }
}
