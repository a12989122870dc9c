//! Synthesized keyboard input sent to the focused window.

use recaps_core::{hook::HOTKEY_VK, workflow::KeyInjector};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT,
    KEYEVENTF_KEYUP, SendInput, VIRTUAL_KEY, VK_CONTROL, VK_MENU, VK_SHIFT,
};

/// Virtual key code for the A key, used by Ctrl+A.
const VK_A_KEY: VIRTUAL_KEY = VIRTUAL_KEY(0x41);
/// Virtual key code for the C key, used by Ctrl+C.
const VK_C_KEY: VIRTUAL_KEY = VIRTUAL_KEY(0x43);
/// Virtual key code for the V key, used by Ctrl+V.
const VK_V_KEY: VIRTUAL_KEY = VIRTUAL_KEY(0x56);

/// Clipboard chords for the rewrite workflow.
///
/// Each chord goes to whatever window has keyboard focus, so callers make sure the target
/// window is focused before calling.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Keys;

impl KeyInjector for Win32Keys {
    fn copy(&mut self) -> bool {
        send_ctrl_combo(VK_C_KEY)
    }

    fn paste(&mut self) -> bool {
        send_ctrl_combo(VK_V_KEY)
    }

    fn select_all(&mut self) -> bool {
        send_ctrl_combo(VK_A_KEY)
    }
}

/// Whether `vk` is physically held right now.
///
/// Reads the asynchronous key state, so it also reflects keys that the low level hook has not
/// passed on yet.
pub fn is_key_down(vk: VIRTUAL_KEY) -> bool {
    unsafe { GetAsyncKeyState(i32::from(vk.0)) < 0 }
}

/// Taps `vk` with Ctrl held.
///
/// The user usually still holds Ctrl from the Ctrl+Caps Lock chord. In that case Ctrl is not
/// pressed again, and it is not released either, so the physical key stays consistent.
///
/// Returns `true` if all input events were successfully sent.
pub fn send_ctrl_combo(vk: VIRTUAL_KEY) -> bool {
    let mut seq = KeySequence::new();
    if !is_key_down(VK_CONTROL) && !seq.down(VK_CONTROL) {
        return false;
    }
    KeySequence::tap(vk)
}

/// Presses and releases Alt+Shift, the default layout switching hotkey.
///
/// Used for windows that ignore `WM_INPUTLANGCHANGEREQUEST`. Both keys are released in reverse
/// order when the sequence is dropped, even if the second press fails.
///
/// Returns `true` if both key down events were sent.
pub fn send_alt_shift() -> bool {
    let mut seq = KeySequence::new();
    seq.down(VK_MENU) && seq.down(VK_SHIFT)
}

/// Sends the key-up of the hotkey whose key-down the hook swallowed.
///
/// Without it the target sees Alt go down and up with nothing in between and activates its
/// menu bar.
///
/// Returns `true` if the event was successfully sent.
pub fn send_hotkey_keyup() -> bool {
    send_key(VIRTUAL_KEY(HOTKEY_VK as u16), true)
}

/// A small RAII helper that tracks pressed keys and releases them on drop.
///
/// Intended for modifier keys (Ctrl, Shift, Alt). If `down` succeeds, the key is
/// recorded and will be released in reverse order when the sequence is dropped.
pub struct KeySequence {
    pressed: Vec<VIRTUAL_KEY>,
}

impl KeySequence {
    /// Creates an empty key sequence.
    pub fn new() -> Self {
        Self {
            pressed: Vec::new(),
        }
    }

    /// Sends a key down event and records the key for automatic release.
    ///
    /// Returns `true` if the event was successfully sent.
    pub fn down(&mut self, vk: VIRTUAL_KEY) -> bool {
        send_key(vk, false).then(|| self.pressed.push(vk)).is_some()
    }

    /// Taps a key (down then up).
    ///
    /// Returns `true` if both events were successfully sent.
    pub fn tap(vk: VIRTUAL_KEY) -> bool {
        send_key(vk, false) && send_key(vk, true)
    }
}

impl Default for KeySequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeySequence {
    fn drop(&mut self) {
        for vk in self.pressed.drain(..).rev() {
            let _ = send_key(vk, true);
        }
    }
}

/// Size of `INPUT` as the `i32` that `SendInput` expects.
fn input_struct_size_i32() -> Option<i32> {
    i32::try_from(std::mem::size_of::<INPUT>()).ok()
}

/// Sends a single virtual key event via `SendInput`.
///
/// Returns `true` if `SendInput` reports that the event was inserted.
fn send_key(vk: VIRTUAL_KEY, key_up: bool) -> bool {
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: if key_up {
                    KEYEVENTF_KEYUP
                } else {
                    KEYBD_EVENT_FLAGS::default()
                },
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };

    let Some(input_size) = input_struct_size_i32() else {
        return false;
    };

    let sent = unsafe { SendInput(&[input], input_size) };
    sent == 1
}
