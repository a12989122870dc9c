//! Helper routines for interacting with the Windows API: lifting the last OS error, wide
//! string conversion, message boxes and the single instance guard.

use windows::{
    Win32::{
        Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, GetLastError, HANDLE},
        System::Threading::CreateMutexW,
        UI::WindowsAndMessaging::{
            MB_ICONERROR, MB_ICONINFORMATION, MB_OK, MESSAGEBOX_STYLE, MessageBoxW,
        },
    },
    core::{Error, HRESULT, PCWSTR, Result, w},
};

use crate::menu::{ALREADY_RUNNING_MESSAGE, APP_TITLE};

/// Retrieve the last OS error as a `windows::core::Error`.
pub fn last_error() -> Error {
    Error::from_hresult(HRESULT::from_win32(unsafe { GetLastError() }.0))
}

pub fn io_to_win(e: std::io::Error) -> Error {
    Error::new(HRESULT(0x8000_4005_u32.cast_signed()), e.to_string())
}

/// NUL terminated UTF-16 copy of `s`.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// RAII guard holding the named single instance mutex.
pub struct SingleInstanceGuard(HANDLE);

impl Drop for SingleInstanceGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// Acquire the single instance mutex.
///
/// Returns `Ok(None)` when another instance already owns it.
pub fn single_instance_guard() -> Result<Option<SingleInstanceGuard>> {
    unsafe {
        let h = CreateMutexW(None, false, w!("recaps-D3E743A3-E0F9-47f5-956A-CD15C6548789"))?;

        if GetLastError() == ERROR_ALREADY_EXISTS {
            let _ = CloseHandle(h);
            return Ok(None);
        }

        Ok(Some(SingleInstanceGuard(h)))
    }
}

/// Blocking message box owned by no window.
pub fn message_box(text: &str, title: &str, style: MESSAGEBOX_STYLE) {
    let text = to_wide(text);
    let title = to_wide(title);
    unsafe {
        let _ = MessageBoxW(
            None,
            PCWSTR(text.as_ptr()),
            PCWSTR(title.as_ptr()),
            style,
        );
    }
}

pub fn notify_already_running() {
    message_box(ALREADY_RUNNING_MESSAGE, APP_TITLE, MB_OK | MB_ICONINFORMATION);
}

pub fn notify_fatal(text: &str, e: &Error) {
    message_box(&format!("{text}\n\n{e}"), APP_TITLE, MB_OK | MB_ICONERROR);
}
