use windows::{
    Win32::{
        Foundation::{HINSTANCE, HWND, LPARAM, POINT, WPARAM},
        UI::{
            Shell::{
                NIF_ICON, NIF_MESSAGE, NIF_SHOWTIP, NIF_TIP, NIM_ADD, NIM_DELETE, NIM_MODIFY,
                NIM_SETVERSION, NOTIFY_ICON_MESSAGE, NOTIFYICON_VERSION_4, NOTIFYICONDATAW,
                Shell_NotifyIconW,
            },
            WindowsAndMessaging::{
                AppendMenuW, CreatePopupMenu, DestroyMenu, GWLP_HINSTANCE, GetCursorPos,
                GetWindowLongPtrW, HICON, HMENU, IDI_APPLICATION, IMAGE_ICON, LR_SHARED,
                LoadIconW, LoadImageW, MF_CHECKED, MF_POPUP, MF_SEPARATOR, MF_STRING,
                MENU_ITEM_FLAGS, PostMessageW, SetForegroundWindow, TPM_BOTTOMALIGN,
                TPM_NONOTIFY, TPM_RETURNCMD, TPM_RIGHTALIGN, TPM_RIGHTBUTTON, TrackPopupMenu,
                WM_APP, WM_NULL,
            },
        },
    },
    core::{PCWSTR, Result},
};

use crate::{
    menu::{APP_TITLE, TrayMenuEntry},
    utils::helpers,
};

/// Callback message of the notification area icon.
pub const WM_APP_TRAY: u32 = WM_APP;
const TRAY_UID: u32 = 1;

fn fill_wide(dst: &mut [u16], s: &str) {
    if let Some((last, body)) = dst.split_last_mut() {
        for (d, ch) in body
            .iter_mut()
            .zip(s.encode_utf16().chain(std::iter::repeat(0)))
        {
            *d = ch;
        }
        *last = 0;
    }
}

fn shell_notify(action: NOTIFY_ICON_MESSAGE, nid: &NOTIFYICONDATAW, what: &str) -> Result<()> {
    unsafe {
        if Shell_NotifyIconW(action, nid).as_bool() {
            Ok(())
        } else {
            Err(windows::core::Error::new(
                windows::core::HRESULT(0x8000_4005_u32.cast_signed()),
                format!("Shell_NotifyIconW returned FALSE: {what}"),
            ))
        }
    }
}

fn base_tray_nid(hwnd: HWND) -> Result<NOTIFYICONDATAW> {
    Ok(NOTIFYICONDATAW {
        cbSize: u32::try_from(core::mem::size_of::<NOTIFYICONDATAW>())?,
        hWnd: hwnd,
        uID: TRAY_UID,
        ..Default::default()
    })
}

/// Adds the icon, or refreshes it when the shell already knows it.
pub fn ensure_icon(hwnd: HWND) -> Result<()> {
    let mut nid = base_tray_nid(hwnd)?;
    nid.uCallbackMessage = WM_APP_TRAY;
    nid.uFlags = NIF_MESSAGE | NIF_ICON | NIF_TIP | NIF_SHOWTIP;
    nid.hIcon = unsafe { default_icon(hwnd) }?;
    fill_wide(&mut nid.szTip, APP_TITLE);

    if !unsafe { Shell_NotifyIconW(NIM_ADD, &raw const nid) }.as_bool() {
        shell_notify(NIM_MODIFY, &nid, "ensure_icon: NIM_MODIFY after NIM_ADD failure")?;
    }

    nid.Anonymous.uVersion = NOTIFYICON_VERSION_4;
    shell_notify(NIM_SETVERSION, &nid, "ensure_icon: NIM_SETVERSION")
}

pub fn remove_icon(hwnd: HWND) {
    let Ok(nid) = base_tray_nid(hwnd) else {
        return;
    };
    unsafe {
        let _ = Shell_NotifyIconW(NIM_DELETE, &raw const nid);
    }
}

unsafe fn window_hinstance(hwnd: HWND) -> HINSTANCE {
    let raw = unsafe { GetWindowLongPtrW(hwnd, GWLP_HINSTANCE) };
    HINSTANCE(raw as *mut core::ffi::c_void)
}

/// Icon resource 1 of the executable, or the stock application icon.
unsafe fn default_icon(hwnd: HWND) -> Result<HICON> {
    let hinst = unsafe { window_hinstance(hwnd) };

    let embedded = unsafe {
        LoadImageW(
            Some(hinst),
            // MAKEINTRESOURCEW(1)
            PCWSTR(std::ptr::without_provenance(1)),
            IMAGE_ICON,
            0,
            0,
            LR_SHARED,
        )
    };

    match embedded {
        Ok(h) => Ok(HICON(h.0)),
        Err(_) => unsafe { LoadIconW(None, IDI_APPLICATION) },
    }
}

fn append_entries(hmenu: HMENU, entries: &[TrayMenuEntry]) -> Result<()> {
    for entry in entries {
        match entry {
            TrayMenuEntry::Separator => unsafe {
                AppendMenuW(hmenu, MF_SEPARATOR, 0, PCWSTR::null())?;
            },
            TrayMenuEntry::Command { id, label, checked } => {
                let flags = if *checked {
                    MF_STRING | MF_CHECKED
                } else {
                    MF_STRING
                };
                append_item(hmenu, flags, *id as usize, label)?;
            }
            TrayMenuEntry::Submenu { label, entries } => {
                let sub = unsafe { CreatePopupMenu() }?;
                if let Err(e) = append_entries(sub, entries) {
                    unsafe {
                        let _ = DestroyMenu(sub);
                    }
                    return Err(e);
                }
                // The parent owns the submenu from here on.
                append_item(hmenu, MF_STRING | MF_POPUP, sub.0 as usize, label)?;
            }
        }
    }
    Ok(())
}

fn append_item(hmenu: HMENU, flags: MENU_ITEM_FLAGS, id: usize, label: &str) -> Result<()> {
    let wide = helpers::to_wide(label);
    unsafe { AppendMenuW(hmenu, flags, id, PCWSTR(wide.as_ptr())) }
}

fn show_popup_menu_at_cursor(hwnd: HWND, hmenu: HMENU) -> u32 {
    let mut pt = POINT { x: 0, y: 0 };
    let _ = unsafe { GetCursorPos(&raw mut pt) };

    let _ = unsafe { SetForegroundWindow(hwnd) };

    let result = unsafe {
        TrackPopupMenu(
            hmenu,
            TPM_RETURNCMD | TPM_NONOTIFY | TPM_BOTTOMALIGN | TPM_RIGHTALIGN | TPM_RIGHTBUTTON,
            pt.x,
            pt.y,
            Some(0),
            hwnd,
            None,
        )
    };

    // Makes the menu close when the user clicks elsewhere.
    let _ = unsafe { PostMessageW(Some(hwnd), WM_NULL, WPARAM(0), LPARAM(0)) };

    result.0 as u32
}

/// Shows the context menu at the cursor and returns the chosen command id, `0` when the menu
/// was dismissed.
///
/// Runs a nested modal loop; the caller must not hold the window state across this call.
pub fn show_context_menu(hwnd: HWND, entries: &[TrayMenuEntry]) -> Result<u32> {
    let hmenu = unsafe { CreatePopupMenu() }?;

    if let Err(e) = append_entries(hmenu, entries) {
        unsafe {
            let _ = DestroyMenu(hmenu);
        }
        return Err(e);
    }

    let cmd = show_popup_menu_at_cursor(hwnd, hmenu);
    unsafe {
        let _ = DestroyMenu(hmenu);
    }
    Ok(cmd)
}
