//! Hotkey chord classification for the low level keyboard hook.
//!
//! The hook callback feeds every keyboard event through [`classify`]. Only a real (non
//! injected) key-down of the hotkey can produce an action; everything else passes through to
//! the next hook in the chain.

/// Caps Lock.
pub const HOTKEY_VK: u32 = 0x14;

/// Action requested by the hook thread, consumed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputActionEvent {
    SwitchLayout,
    SwitchPair,
    ConvertAllText,
    ConvertSelectedText,
}

impl InputActionEvent {
    /// Stable encoding carried in the WPARAM of the action message.
    #[must_use]
    pub const fn as_raw(self) -> usize {
        match self {
            Self::SwitchLayout => 1,
            Self::SwitchPair => 2,
            Self::ConvertAllText => 3,
            Self::ConvertSelectedText => 4,
        }
    }

    #[must_use]
    pub const fn from_raw(raw: usize) -> Option<Self> {
        match raw {
            1 => Some(Self::SwitchLayout),
            2 => Some(Self::SwitchPair),
            3 => Some(Self::ConvertAllText),
            4 => Some(Self::ConvertSelectedText),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SwitchLayout => "switch_layout",
            Self::SwitchPair => "switch_pair",
            Self::ConvertAllText => "convert_all_text",
            Self::ConvertSelectedText => "convert_selected_text",
        }
    }
}

/// Modifier keys held at the moment the hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierState {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub left_ctrl: bool,
    pub right_ctrl: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub vk: u32,
    pub key_down: bool,
    pub injected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookVerdict {
    PassThrough,
    /// Suppress the key and post `action` to the controller.
    Handled {
        action: InputActionEvent,
        /// Synthesize a key-up of the hotkey right after suppressing the key-down, so the
        /// target window never sees a bare Alt press/release that would open its menu bar.
        compensate_keyup: bool,
    },
}

impl HookVerdict {
    #[must_use]
    pub const fn is_handled(self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    #[must_use]
    pub const fn action(self) -> Option<InputActionEvent> {
        match self {
            Self::Handled { action, .. } => Some(action),
            Self::PassThrough => None,
        }
    }
}

/// Classifies one keyboard event. Alt takes precedence over Ctrl, Ctrl over Shift.
#[must_use]
pub fn classify(event: KeyEvent, mods: ModifierState) -> HookVerdict {
    if event.vk != HOTKEY_VK || !event.key_down || event.injected {
        return HookVerdict::PassThrough;
    }

    let action = if mods.alt {
        InputActionEvent::SwitchPair
    } else if mods.ctrl {
        if mods.left_ctrl && mods.right_ctrl {
            InputActionEvent::ConvertSelectedText
        } else {
            InputActionEvent::ConvertAllText
        }
    } else if mods.shift {
        // Shift+Caps Lock keeps its original meaning.
        return HookVerdict::PassThrough;
    } else {
        InputActionEvent::SwitchLayout
    };

    HookVerdict::Handled {
        action,
        compensate_keyup: action == InputActionEvent::SwitchPair,
    }
}
