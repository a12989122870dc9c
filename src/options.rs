/// Switch that starts the application without a notification area icon.
pub const NO_ICON_ARG: &str = "--no-icon";

/// Spelling accepted by earlier releases.
const LEGACY_NO_ICON_ARG: &str = "-no_icon";

/// Command line options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupOptions {
    pub no_icon: bool,
}

impl StartupOptions {
    /// Parses the arguments that follow the program name. Unknown arguments are ignored.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();

        for arg in args {
            match arg.as_ref() {
                NO_ICON_ARG | LEGACY_NO_ICON_ARG => options.no_icon = true,
                other => tracing::debug!(msg = "unknown_argument_ignored", arg = other),
            }
        }

        options
    }

    /// Whether the tray icon is shown, given the persisted preference.
    #[must_use]
    pub fn show_tray_icon(self, show_by_config: bool) -> bool {
        show_by_config && !self.no_icon
    }
}
