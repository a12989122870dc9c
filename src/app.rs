//! Per-window application state.

use crate::platform::win::{controller::Controller, keyboard::HookThread};

/// State stored in the user data of the hidden controller window.
///
/// Created in `WM_CREATE`, freed in `WM_NCDESTROY`. Only the UI thread touches it.
pub struct AppState {
    pub controller: Controller,
    pub hook: Option<HookThread>,

    pub show_tray_icon: bool,
    /// Message id broadcast by the shell after Explorer restarts.
    pub taskbar_created: u32,
    /// Set while the popup menu or the help box runs a nested message loop.
    pub modal_shown: bool,
}

impl AppState {
    pub fn new(controller: Controller, show_tray_icon: bool, taskbar_created: u32) -> Self {
        Self {
            controller,
            hook: None,
            show_tray_icon,
            taskbar_created,
            modal_shown: false,
        }
    }
}
