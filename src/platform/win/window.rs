use windows::{
    Win32::{
        Foundation::{HINSTANCE, HWND},
        UI::WindowsAndMessaging::{
            CreateWindowExW, DispatchMessageW, GetMessageW, MSG, RegisterClassExW,
            TranslateMessage, UnregisterClassW, WINDOW_EX_STYLE, WINDOW_STYLE, WNDCLASSEXW,
        },
    },
    core::{PCWSTR, Result, w},
};

use crate::utils::helpers;

pub(crate) fn register_main_class(class_name: PCWSTR, hinstance: HINSTANCE) -> Result<()> {
    let wc = WNDCLASSEXW {
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        lpfnWndProc: Some(super::wndproc),
        lpszClassName: class_name,
        hInstance: hinstance,
        ..Default::default()
    };

    unsafe {
        if RegisterClassExW(&raw const wc) == 0 {
            return Err(helpers::last_error());
        }
    }
    Ok(())
}

pub(crate) fn unregister_main_class(class_name: PCWSTR, hinstance: HINSTANCE) {
    unsafe {
        let _ = UnregisterClassW(class_name, Some(hinstance));
    }
}

/// Creates the invisible top level window that receives hook actions, tray callbacks and the
/// shell's `TaskbarCreated` broadcast. Message-only windows do not get broadcasts, so a
/// regular zero sized window that is never shown is used instead.
///
/// `create_param` is handed to `WM_CREATE` through `CREATESTRUCTW::lpCreateParams`.
pub(crate) fn create_main_window(
    class_name: PCWSTR,
    hinstance: HINSTANCE,
    create_param: *const core::ffi::c_void,
) -> Result<HWND> {
    unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            class_name,
            w!("Recaps"),
            WINDOW_STYLE(0),
            0,
            0,
            0,
            0,
            None,
            None,
            Some(hinstance),
            Some(create_param),
        )
    }
}

pub(crate) fn message_loop() -> Result<()> {
    unsafe {
        let mut msg = MSG::default();
        loop {
            let r = GetMessageW(&raw mut msg, None, 0, 0);
            if r.0 == -1 {
                return Err(helpers::last_error());
            }
            if r.0 == 0 {
                break;
            }
            let _ = TranslateMessage(&raw const msg);
            DispatchMessageW(&raw const msg);
        }
    }
    Ok(())
}
