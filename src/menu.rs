//! Tray menu model: command identifiers, entry layout and the help text.
//!
//! The menu is described here as plain data so that its shape can be checked without a
//! desktop session. `platform::win::tray` renders it with the Win32 menu API.

use recaps_core::registry::{MAX_LAYOUTS, RegistryMenu};

pub const ID_ABOUT: u32 = 2000;
pub const ID_EXIT: u32 = 2001;
pub const ID_MAIN_LANG: u32 = 2002;
pub const ID_LANG: u32 = ID_MAIN_LANG + MAX_LAYOUTS as u32;

pub const APP_TITLE: &str = "Recaps";
pub const HELP_TITLE: &str = "Recaps 0.8 - Retake your Capslock!";
pub const HELP_MESSAGE: &str = "Recaps allows you to quickly switch the current\n\
language using the Capslock key.\n\n\
Capslock changes between the chosen pair of keyboard languages.\n\
Alt+Capslock changes the chosen pair of keyboard languages.\n\
Ctrl+Capslock fixes text you typed in the wrong language.\n\
* If both Ctrl keys (left and right) are pressed, only the selected text will be fixed.\n\
Shift+Capslock is the old Capslock that lets you type in CAPITAL.";
pub const ALREADY_RUNNING_MESSAGE: &str = "Recaps is already running.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    Help,
    Exit,
    SelectMain(usize),
    SelectPaired(usize),
}

impl TrayCommand {
    #[must_use]
    pub fn id(self) -> u32 {
        match self {
            Self::Help => ID_ABOUT,
            Self::Exit => ID_EXIT,
            Self::SelectMain(idx) => ID_MAIN_LANG + idx as u32,
            Self::SelectPaired(idx) => ID_LANG + idx as u32,
        }
    }

    /// Decodes the identifier returned by the popup menu. Zero (menu dismissed) and
    /// out of range values yield `None`.
    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        let layouts = MAX_LAYOUTS as u32;
        match id {
            ID_ABOUT => Some(Self::Help),
            ID_EXIT => Some(Self::Exit),
            id if (ID_MAIN_LANG..ID_MAIN_LANG + layouts).contains(&id) => {
                Some(Self::SelectMain((id - ID_MAIN_LANG) as usize))
            }
            id if (ID_LANG..ID_LANG + layouts).contains(&id) => {
                Some(Self::SelectPaired((id - ID_LANG) as usize))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayMenuEntry {
    Command {
        id: u32,
        label: String,
        checked: bool,
    },
    Submenu {
        label: String,
        entries: Vec<TrayMenuEntry>,
    },
    Separator,
}

impl TrayMenuEntry {
    fn command(cmd: TrayCommand, label: impl Into<String>, checked: bool) -> Self {
        Self::Command {
            id: cmd.id(),
            label: label.into(),
            checked,
        }
    }
}

/// Full context menu: help, the main language submenu, one entry per pair, exit.
#[must_use]
pub fn tray_menu(menu: &RegistryMenu) -> Vec<TrayMenuEntry> {
    let main_entries = menu
        .main_items
        .iter()
        .map(|c| TrayMenuEntry::command(TrayCommand::SelectMain(c.index), &c.label, c.checked))
        .collect();

    let mut entries = vec![
        TrayMenuEntry::command(TrayCommand::Help, "Help...", false),
        TrayMenuEntry::Separator,
        TrayMenuEntry::Submenu {
            label: "Main language".to_owned(),
            entries: main_entries,
        },
        TrayMenuEntry::Separator,
    ];

    entries.extend(menu.pair_items.iter().map(|c| {
        TrayMenuEntry::command(TrayCommand::SelectPaired(c.index), &c.label, c.checked)
    }));

    if !menu.pair_items.is_empty() {
        entries.push(TrayMenuEntry::Separator);
    }
    entries.push(TrayMenuEntry::command(TrayCommand::Exit, "Exit", false));

    entries
}
