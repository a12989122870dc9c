//! Low level keyboard hook running on its own thread.
//!
//! The hook callback must return quickly or the OS drops it, so it only classifies the event
//! and posts the resulting action to the controller window. All real work happens on the UI
//! thread.

use std::{
    sync::{
        atomic::{AtomicIsize, Ordering},
        mpsc,
    },
    thread::{self, JoinHandle},
};

use recaps_core::hook::{
    HOTKEY_VK, HookVerdict, InputActionEvent, KeyEvent, ModifierState, classify,
};
use windows::{
    Win32::{
        Foundation::{HWND, LPARAM, LRESULT, WPARAM},
        System::Threading::{
            GetCurrentThread, GetCurrentThreadId, SetThreadPriority, THREAD_PRIORITY_TIME_CRITICAL,
        },
        UI::{
            Input::KeyboardAndMouse::{VK_CONTROL, VK_LCONTROL, VK_MENU, VK_RCONTROL, VK_SHIFT},
            WindowsAndMessaging::{
                CallNextHookEx, DispatchMessageW, GetMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT,
                LLKHF_INJECTED, MSG, PM_NOREMOVE, PeekMessageW, PostMessageW, PostThreadMessageW,
                SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, WH_KEYBOARD_LL, WM_APP,
                WM_KEYDOWN, WM_SYSKEYDOWN, WM_USER,
            },
        },
    },
    core::{Error, HRESULT, Result},
};

use super::input;
use crate::utils::helpers;

/// Posted to the controller window. `WPARAM` carries [`InputActionEvent::as_raw`].
pub const WM_APP_LANG_ACTION: u32 = WM_APP + 1;

/// Thread message that ends the hook thread's message loop.
const WM_HOOK_THREAD_EXIT: u32 = WM_APP;

/// Handle of the installed hook, `0` while none is installed. Read by the callback to chain
/// to the next hook.
static HOOK_HANDLE: AtomicIsize = AtomicIsize::new(0);
/// Controller window receiving [`WM_APP_LANG_ACTION`], `0` while no hook thread runs.
static MAIN_HWND: AtomicIsize = AtomicIsize::new(0);

fn main_hwnd() -> Option<HWND> {
    let raw = MAIN_HWND.load(Ordering::Relaxed);
    (raw != 0).then(|| HWND(raw as *mut _))
}

fn current_hook() -> Option<HHOOK> {
    let h = HOOK_HANDLE.load(Ordering::Relaxed);
    (h != 0).then(|| HHOOK(h as *mut _))
}

/// Modifier state at the time the callback runs. The low level hook sees keys before the
/// system updates the synchronous key state, so the asynchronous state is used.
fn current_modifiers() -> ModifierState {
    ModifierState {
        alt: input::is_key_down(VK_MENU),
        ctrl: input::is_key_down(VK_CONTROL),
        shift: input::is_key_down(VK_SHIFT),
        left_ctrl: input::is_key_down(VK_LCONTROL),
        right_ctrl: input::is_key_down(VK_RCONTROL),
    }
}

/// Hands `action` to the UI thread. Never blocks.
fn post_action(action: InputActionEvent) {
    let Some(hwnd) = main_hwnd() else {
        return;
    };

    let posted = unsafe {
        PostMessageW(
            Some(hwnd),
            WM_APP_LANG_ACTION,
            WPARAM(action.as_raw()),
            LPARAM(0),
        )
    };
    if let Err(e) = posted {
        tracing::warn!(msg = "action_post_failed", action = action.as_str(), error = ?e);
    }
}

/// `WH_KEYBOARD_LL` callback.
///
/// # Safety
///
/// Called by the OS on the hook thread. For `HC_ACTION`, `lparam` points to a valid
/// `KBDLLHOOKSTRUCT` for the duration of the call.
///
/// Returns `LRESULT(1)` to swallow a handled hotkey, otherwise chains to the next hook.
extern "system" fn proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let hook = current_hook();

    if code != HC_ACTION.cast_signed() {
        return unsafe { CallNextHookEx(hook, code, wparam, lparam) };
    }

    let kb = unsafe { &*(lparam.0 as *const KBDLLHOOKSTRUCT) };
    if kb.vkCode != HOTKEY_VK {
        return unsafe { CallNextHookEx(hook, code, wparam, lparam) };
    }

    let msg = u32::try_from(wparam.0).unwrap_or_default();
    let event = KeyEvent {
        vk: kb.vkCode,
        key_down: msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN,
        injected: kb.flags.0 & LLKHF_INJECTED.0 != 0,
    };

    match classify(event, current_modifiers()) {
        HookVerdict::PassThrough => unsafe { CallNextHookEx(hook, code, wparam, lparam) },
        HookVerdict::Handled {
            action,
            compensate_keyup,
        } => {
            tracing::trace!(msg = "hotkey_handled", action = action.as_str());
            post_action(action);
            if compensate_keyup && !input::send_hotkey_keyup() {
                tracing::warn!(msg = "hotkey_keyup_rejected");
            }
            LRESULT(1)
        }
    }
}

/// Owner of the hook thread. Dropping it stops the thread.
///
/// Only one instance may exist at a time: the hook handle and target window are process wide.
pub struct HookThread {
    thread_id: u32,
    handle: Option<JoinHandle<()>>,
}

impl HookThread {
    /// Spawns the hook thread and waits until the hook is installed.
    ///
    /// Actions are posted to `hwnd`. The thread's message queue exists before this returns, so
    /// a [`stop`](Self::stop) issued right away is never lost.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the thread cannot be spawned or `SetWindowsHookExW` fails.
    pub fn start(hwnd: HWND) -> Result<Self> {
        MAIN_HWND.store(hwnd.0 as isize, Ordering::Relaxed);

        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("recaps-keyboard-hook".to_owned())
            .spawn(move || hook_thread_main(&ready_tx))
            .map_err(helpers::io_to_win)?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                tracing::info!(msg = "keyboard_hook_installed", thread_id);
                Ok(Self {
                    thread_id,
                    handle: Some(handle),
                })
            }
            Ok(Err(code)) => {
                let _ = handle.join();
                Err(Error::from_hresult(code))
            }
            Err(_) => {
                let _ = handle.join();
                Err(Error::new(
                    HRESULT(0x8000_4005_u32.cast_signed()),
                    "keyboard hook thread exited before reporting readiness",
                ))
            }
        }
    }

    /// Asks the thread to leave its message loop, then waits for it.
    ///
    /// The hook is removed by the thread itself before it exits. Calling `stop` twice is a
    /// no-op.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        let posted = unsafe {
            PostThreadMessageW(self.thread_id, WM_HOOK_THREAD_EXIT, WPARAM(0), LPARAM(0))
        };
        if let Err(e) = posted {
            tracing::warn!(msg = "hook_thread_exit_post_failed", error = ?e);
        }

        if handle.join().is_err() {
            tracing::warn!(msg = "hook_thread_panicked");
        }
        MAIN_HWND.store(0, Ordering::Relaxed);
        tracing::info!(msg = "keyboard_hook_stopped");
    }
}

impl Drop for HookThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the hook thread: installs the hook, reports readiness, pumps messages until the
/// exit message arrives, then removes the hook.
fn hook_thread_main(ready: &mpsc::Sender<std::result::Result<u32, HRESULT>>) {
    unsafe {
        if let Err(e) = SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_TIME_CRITICAL) {
            tracing::debug!(msg = "hook_thread_priority_not_raised", error = ?e);
        }

        // Creates the thread's message queue so that the exit message cannot be lost.
        let mut msg = MSG::default();
        let _ = PeekMessageW(&raw mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);

        let hook = match SetWindowsHookExW(WH_KEYBOARD_LL, Some(proc), None, 0) {
            Ok(h) => h,
            Err(e) => {
                let _ = ready.send(Err(e.code()));
                return;
            }
        };
        HOOK_HANDLE.store(hook.0 as isize, Ordering::Relaxed);

        let _ = ready.send(Ok(GetCurrentThreadId()));

        loop {
            let r = GetMessageW(&raw mut msg, None, 0, 0);
            if r.0 == -1 {
                tracing::warn!(msg = "hook_thread_get_message_failed", error = ?helpers::last_error());
                break;
            }
            if r.0 == 0 || (msg.hwnd.0.is_null() && msg.message == WM_HOOK_THREAD_EXIT) {
                break;
            }
            let _ = TranslateMessage(&raw const msg);
            DispatchMessageW(&raw const msg);
        }

        HOOK_HANDLE.store(0, Ordering::Relaxed);
        if let Err(e) = UnhookWindowsHookEx(hook) {
            tracing::warn!(msg = "unhook_failed", error = ?e);
        }
    }
}
