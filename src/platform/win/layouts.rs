//! Installed keyboard layouts and per-window layout switching.

use std::{ffi::c_void, ptr::null_mut, thread, time::Duration};

use recaps_core::{
    actions::FocusedWindow,
    layout::{KeyOutput, KeyStateVector, KeyStroke, KeyboardLayouts, LayoutId},
    registry::LayoutEntry,
};
use windows::Win32::{
    Foundation::{HWND, LPARAM, WPARAM},
    Globalization::{GetLocaleInfoW, LOCALE_SLANGUAGE},
    UI::{
        Input::KeyboardAndMouse::{
            GetKeyboardLayout, GetKeyboardLayoutList, HKL, ToUnicodeEx, VkKeyScanExW,
        },
        WindowsAndMessaging::{
            GA_ROOTOWNER, GUITHREADINFO, GetAncestor, GetClassNameW, GetGUIThreadInfo,
            GetWindowThreadProcessId, PostMessageW, WM_INPUTLANGCHANGEREQUEST,
        },
    },
};

use super::input;

/// Root owner classes of windows that silently ignore `WM_INPUTLANGCHANGEREQUEST`. They only
/// react to the layout switching hotkey.
const HOTKEY_ONLY_WINDOW_CLASSES: [&str; 3] = ["tSkMainForm", "TConversationForm", "OpusApp"];

const LAYOUT_CHANGE_POLLS: u32 = 10;
const LAYOUT_CHANGE_POLL_INTERVAL: Duration = Duration::from_millis(30);

/// `ToUnicodeEx` flag: translate without touching the kernel dead key state.
const TOUNICODE_KEEP_KEYBOARD_STATE: u32 = 0x4;

fn hkl(id: LayoutId) -> HKL {
    HKL(id.0 as *mut c_void)
}

fn layout_id(hkl: HKL) -> LayoutId {
    LayoutId(hkl.0 as isize)
}

/// Live view of the layouts loaded into the desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Layouts;

impl KeyboardLayouts for Win32Layouts {
    fn installed(&self) -> Vec<LayoutId> {
        installed_layouts().into_iter().map(layout_id).collect()
    }

    fn scan_char(&self, ch: u16, layout: LayoutId) -> Option<KeyStroke> {
        KeyStroke::from_scan_result(unsafe { VkKeyScanExW(ch, hkl(layout)) })
    }

    fn translate(&self, vk: u8, keys: &KeyStateVector, layout: LayoutId) -> KeyOutput {
        let mut buf = [0u16; 10];
        let rc = unsafe {
            ToUnicodeEx(
                u32::from(vk),
                0,
                &keys.0,
                &mut buf,
                TOUNICODE_KEEP_KEYBOARD_STATE,
                Some(hkl(layout)),
            )
        };

        match rc {
            n if n < 0 => KeyOutput::DeadKey,
            0 => KeyOutput::Nothing,
            n => {
                let len = usize::try_from(n).unwrap_or(0).min(buf.len());
                KeyOutput::Text(buf[..len].to_vec())
            }
        }
    }
}

/// Enumerates installed keyboard layouts for the current desktop.
///
/// Returns an empty vector when enumeration fails or yields no results.
fn installed_layouts() -> Vec<HKL> {
    let n = unsafe { GetKeyboardLayoutList(None) };
    let Ok(layout_count) = usize::try_from(n) else {
        return Vec::new();
    };
    if layout_count == 0 {
        return Vec::new();
    }

    let mut layouts = vec![HKL(null_mut()); layout_count];

    let n2 = unsafe { GetKeyboardLayoutList(Some(layouts.as_mut_slice())) };
    let Ok(filled) = usize::try_from(n2) else {
        return Vec::new();
    };

    layouts.truncate(filled);
    layouts
}

/// Installed layouts with their display names, in OS order.
pub fn layout_entries() -> Vec<LayoutEntry> {
    installed_layouts()
        .into_iter()
        .map(|h| {
            let id = layout_id(h);
            LayoutEntry {
                id,
                name: language_name(id.language_id()),
            }
        })
        .collect()
}

/// Localized name of the language, as shown in the regional settings.
fn language_name(lang: u16) -> String {
    // MAKELCID(lang, SORT_DEFAULT)
    let lcid = u32::from(lang);
    let mut buf = [0u16; 128];

    let n = unsafe { GetLocaleInfoW(lcid, LOCALE_SLANGUAGE, Some(&mut buf[..])) };
    match usize::try_from(n) {
        // The count includes the terminating NUL.
        Ok(len) if len > 1 => String::from_utf16_lossy(&buf[..len - 1]),
        _ => format!("{lang:04X}"),
    }
}

/// Window owning the keyboard focus in the foreground thread, or its active window when no
/// control has focus.
fn focused_window() -> Option<HWND> {
    let mut info = GUITHREADINFO {
        cbSize: std::mem::size_of::<GUITHREADINFO>() as u32,
        ..Default::default()
    };

    if unsafe { GetGUIThreadInfo(0, &mut info) }.is_err() {
        return None;
    }

    [info.hwndFocus, info.hwndActive]
        .into_iter()
        .find(|h| !h.0.is_null())
}

/// The window that owned the keyboard focus when it was looked up.
#[derive(Debug, Clone, Copy)]
pub struct Win32Window {
    hwnd: HWND,
}

impl Win32Window {
    pub fn focused() -> Option<Self> {
        focused_window().map(|hwnd| Self { hwnd })
    }
}

impl FocusedWindow for Win32Window {
    type Error = windows::core::Error;

    fn layout(&self) -> LayoutId {
        window_layout(self.hwnd)
    }

    fn request_layout(&mut self, target: LayoutId, attempts: usize) -> windows::core::Result<()> {
        switch_layout(self.hwnd, target, attempts)
    }
}

/// Layout currently active in the thread owning `hwnd`.
fn window_layout(hwnd: HWND) -> LayoutId {
    unsafe {
        let tid = GetWindowThreadProcessId(hwnd, None);
        layout_id(GetKeyboardLayout(tid))
    }
}

fn class_name(hwnd: HWND) -> Option<String> {
    let mut buf = [0u16; 256];
    let len = unsafe { GetClassNameW(hwnd, &mut buf) };
    let len = usize::try_from(len).ok().filter(|&l| l > 0)?;
    Some(String::from_utf16_lossy(&buf[..len]))
}

fn needs_hotkey_switch(hwnd: HWND) -> bool {
    let root = unsafe { GetAncestor(hwnd, GA_ROOTOWNER) };
    if root.0.is_null() {
        return false;
    }

    class_name(root).is_some_and(|class| HOTKEY_ONLY_WINDOW_CLASSES.contains(&class.as_str()))
}

/// Activates `target` in the window `hwnd`.
///
/// `attempts` bounds the Alt+Shift presses used for windows that ignore layout change requests;
/// the installed layout count is enough to reach any layout.
fn switch_layout(
    hwnd: HWND,
    target: LayoutId,
    attempts: usize,
) -> windows::core::Result<()> {
    if needs_hotkey_switch(hwnd) {
        switch_with_hotkey(hwnd, target, attempts);
        return Ok(());
    }

    post_layout_change(hwnd, target)
}

fn switch_with_hotkey(hwnd: HWND, target: LayoutId, attempts: usize) {
    for attempt in 0..attempts {
        let current = window_layout(hwnd);
        if current == target {
            break;
        }

        if !input::send_alt_shift() {
            tracing::warn!(msg = "alt_shift_rejected", attempt);
            break;
        }

        if !wait_for_layout_change(hwnd, current) {
            tracing::debug!(msg = "layout_change_timed_out", attempt);
        }
    }
}

fn wait_for_layout_change(hwnd: HWND, previous: LayoutId) -> bool {
    for _ in 0..LAYOUT_CHANGE_POLLS {
        if window_layout(hwnd) != previous {
            return true;
        }
        thread::sleep(LAYOUT_CHANGE_POLL_INTERVAL);
    }
    false
}

/// Posts a layout change request message to `hwnd`. The `hkl` is passed through `LPARAM`.
fn post_layout_change(hwnd: HWND, target: LayoutId) -> windows::core::Result<()> {
    unsafe {
        PostMessageW(
            Some(hwnd),
            WM_INPUTLANGCHANGEREQUEST,
            WPARAM(0),
            LPARAM(target.0),
        )
    }
}
