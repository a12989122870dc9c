//! Hidden controller window and its message loop.
//!
//! The window never becomes visible. It receives the actions posted by the keyboard hook
//! thread, the tray icon callbacks and the shell's `TaskbarCreated` broadcast, and owns the
//! [`AppState`] through its user data.

pub mod clipboard;
pub mod controller;
pub mod input;
pub mod keyboard;
pub mod layouts;
pub mod state;
pub mod tray;
mod tray_dispatch;
mod window;

use recaps_core::hook::InputActionEvent;
use windows::{
    Win32::{
        Foundation::{HWND, LPARAM, LRESULT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::WindowsAndMessaging::{
            CREATESTRUCTW, DefWindowProcW, DestroyWindow, GWLP_USERDATA, MB_ICONINFORMATION,
            MB_OK, PostMessageW, PostQuitMessage, RegisterWindowMessageW, SetWindowLongPtrW,
            WM_CLOSE, WM_CREATE, WM_DESTROY, WM_NCDESTROY,
        },
    },
    core::{PCWSTR, Result, w},
};

use self::{
    controller::Controller,
    keyboard::{HookThread, WM_APP_LANG_ACTION},
    state::{with_state_mut, with_state_mut_do},
    tray::WM_APP_TRAY,
    window::{create_main_window, message_loop, register_main_class, unregister_main_class},
};
use crate::{
    app::AppState,
    config::{self, Config},
    menu::{HELP_MESSAGE, HELP_TITLE, TrayCommand, tray_menu},
    options::StartupOptions,
    utils::helpers,
};

/// Handed to `WM_CREATE` through `lpCreateParams`.
struct CreateParams {
    config: Option<Config>,
    show_tray_icon: bool,
}

/// Loads the settings, creates the controller window and pumps messages until the user
/// picks Exit.
///
/// Called from `main` once the single instance guard is held.
pub fn run(options: StartupOptions) -> Result<()> {
    let config = config::load_or_default();
    let show_tray_icon = options.show_tray_icon(config.show_tray_icon);
    tracing::info!(msg = "startup", show_tray_icon, no_icon = options.no_icon);

    let mut params = CreateParams {
        config: Some(config),
        show_tray_icon,
    };

    let class_name = w!("RECAPS");
    let hinstance = unsafe { GetModuleHandleW(PCWSTR::null())? }.into();

    register_main_class(class_name, hinstance)?;

    let result = create_main_window(
        class_name,
        hinstance,
        (&raw mut params).cast::<core::ffi::c_void>().cast_const(),
    )
    .and_then(|_hwnd| message_loop());

    unregister_main_class(class_name, hinstance);
    tracing::info!(msg = "shutdown", ok = result.is_ok());
    result
}

/// Builds the state, shows the icon and starts the hook. Returning `-1` aborts window creation,
/// which surfaces as an error from `CreateWindowExW`.
fn on_create(hwnd: HWND, lparam: LPARAM) -> LRESULT {
    let params = unsafe {
        let cs = lparam.0 as *const CREATESTRUCTW;
        cs.as_ref()
            .and_then(|cs| (cs.lpCreateParams as *mut CreateParams).as_mut())
    };
    let Some(params) = params else {
        tracing::error!(msg = "create_params_missing");
        return LRESULT(-1);
    };

    let config = params.config.take().unwrap_or_default();
    let taskbar_created = unsafe { RegisterWindowMessageW(w!("TaskbarCreated")) };
    let state = Box::new(AppState::new(
        Controller::new(config),
        params.show_tray_icon,
        taskbar_created,
    ));

    // Leak the Box so the state lives as long as the window; WM_NCDESTROY reclaims it.
    // Attached before the hook thread exists.
    unsafe {
        SetWindowLongPtrW(hwnd, GWLP_USERDATA, Box::into_raw(state) as isize);
    }

    let hook = match HookThread::start(hwnd) {
        Ok(hook) => hook,
        Err(e) => {
            tracing::error!(msg = "keyboard_hook_failed", error = ?e);
            helpers::notify_fatal("Failed to install the keyboard hook.", &e);
            on_ncdestroy(hwnd);
            return LRESULT(-1);
        }
    };

    with_state_mut_do(hwnd, |state| {
        state.hook = Some(hook);
        if state.show_tray_icon {
            if let Err(e) = tray::ensure_icon(hwnd) {
                tracing::warn!(msg = "tray_icon_add_failed", error = ?e);
            }
        }
    });

    LRESULT(0)
}

fn on_destroy(hwnd: HWND) {
    with_state_mut_do(hwnd, |state| {
        if state.show_tray_icon {
            tray::remove_icon(hwnd);
        }
        if let Some(mut hook) = state.hook.take() {
            hook.stop();
        }
        state.controller.shutdown();
    });

    unsafe { PostQuitMessage(0) };
}

fn on_ncdestroy(hwnd: HWND) {
    unsafe {
        let p = SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) as *mut AppState;
        if !p.is_null() {
            drop(Box::from_raw(p));
        }
    }
}

fn on_lang_action(hwnd: HWND, wparam: WPARAM) {
    let Some(action) = InputActionEvent::from_raw(wparam.0) else {
        tracing::warn!(msg = "unknown_lang_action", raw = wparam.0);
        return;
    };

    with_state_mut_do(hwnd, |state| state.controller.handle_action(action));
}

/// Explorer restarted and dropped every notification icon.
fn on_taskbar_created(hwnd: HWND) {
    with_state_mut_do(hwnd, |state| {
        if state.show_tray_icon {
            if let Err(e) = tray::ensure_icon(hwnd) {
                tracing::warn!(msg = "tray_icon_readd_failed", error = ?e);
            }
        }
    });
}

fn is_taskbar_created(hwnd: HWND, msg: u32) -> bool {
    with_state_mut(hwnd, |state| state.taskbar_created != 0 && msg == state.taskbar_created)
        .unwrap_or(false)
}

fn on_tray(hwnd: HWND, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if with_state_mut(hwnd, |state| state.modal_shown).unwrap_or(true) {
        return LRESULT(0);
    }
    tray_dispatch::handle_tray_message(hwnd, wparam, lparam)
}

fn set_modal_shown(hwnd: HWND, shown: bool) {
    with_state_mut_do(hwnd, |state| state.modal_shown = shown);
}

/// Shows the tray popup and runs the picked command.
///
/// The popup runs a nested message loop, so the state is not borrowed while it is open.
pub(crate) fn show_tray_menu(hwnd: HWND) {
    let entries = with_state_mut(hwnd, |state| {
        state.modal_shown = true;
        state.controller.reload_layouts();
        tray_menu(&state.controller.registry().menu())
    });
    let Some(entries) = entries else {
        return;
    };

    let picked = tray::show_context_menu(hwnd, &entries);
    set_modal_shown(hwnd, false);

    match picked {
        Ok(id) => {
            if let Some(command) = TrayCommand::from_id(id) {
                run_tray_command(hwnd, command);
            }
        }
        Err(e) => tracing::warn!(msg = "tray_menu_failed", error = ?e),
    }
}

fn run_tray_command(hwnd: HWND, command: TrayCommand) {
    tracing::debug!(msg = "tray_command", command = ?command);

    match command {
        TrayCommand::Help => show_help(hwnd),
        TrayCommand::Exit => unsafe {
            let _ = PostMessageW(Some(hwnd), WM_CLOSE, WPARAM(0), LPARAM(0));
        },
        TrayCommand::SelectMain(idx) => {
            with_state_mut_do(hwnd, |state| state.controller.select_main(idx));
        }
        TrayCommand::SelectPaired(idx) => {
            with_state_mut_do(hwnd, |state| state.controller.select_paired(idx));
        }
    }
}

pub(crate) fn show_help(hwnd: HWND) {
    set_modal_shown(hwnd, true);
    helpers::message_box(HELP_MESSAGE, HELP_TITLE, MB_OK | MB_ICONINFORMATION);
    set_modal_shown(hwnd, false);
}

/// The window procedure. Unhandled messages go to the default procedure.
pub extern "system" fn wndproc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_CREATE => on_create(hwnd, lparam),
        WM_APP_LANG_ACTION => {
            on_lang_action(hwnd, wparam);
            LRESULT(0)
        }
        WM_APP_TRAY => on_tray(hwnd, wparam, lparam),
        WM_CLOSE => {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            on_destroy(hwnd);
            LRESULT(0)
        }
        WM_NCDESTROY => {
            on_ncdestroy(hwnd);
            unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
        }
        _ if is_taskbar_created(hwnd, msg) => {
            on_taskbar_created(hwnd);
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}
