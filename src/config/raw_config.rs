use serde::Deserialize;

use super::Config;

/// On disk shape of [`Config`] before validation. Missing keys take their default values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub main: Option<String>,
    pub paired: Option<String>,
    pub copy_poll_tries: u32,
    pub copy_poll_interval_ms: u32,
    pub paste_settle_ms: u32,
    pub show_tray_icon: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        let Config {
            main,
            paired,
            copy_poll_tries,
            copy_poll_interval_ms,
            paste_settle_ms,
            show_tray_icon,
        } = Config::default();

        Self {
            main,
            paired,
            copy_poll_tries,
            copy_poll_interval_ms,
            paste_settle_ms,
            show_tray_icon,
        }
    }
}
