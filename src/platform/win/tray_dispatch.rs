use windows::Win32::{
    Foundation::{HWND, LPARAM, LRESULT, WPARAM},
    UI::WindowsAndMessaging::{WM_CONTEXTMENU, WM_MOUSEMOVE, WM_RBUTTONUP},
};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum TrayEvent {
    RightClick,
    Unknown,
}

fn tray_event_from_lparam(raw: u32) -> TrayEvent {
    let msg = raw & 0xFFFF;

    match msg {
        WM_RBUTTONUP | WM_CONTEXTMENU => TrayEvent::RightClick,
        _ => TrayEvent::Unknown,
    }
}

pub fn handle_tray_message(hwnd: HWND, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let raw = lparam.0 as u32;
    let lo = raw & 0xFFFF;

    if lo == WM_MOUSEMOVE {
        return LRESULT(0);
    }

    let event = tray_event_from_lparam(raw);

    tracing::debug!(
        msg = "wm_app_tray",
        wparam = wparam.0,
        lo = lo,
        event = ?event
    );

    match event {
        TrayEvent::RightClick => super::show_tray_menu(hwnd),
        TrayEvent::Unknown => {}
    }

    LRESULT(0)
}
