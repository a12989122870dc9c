use windows::Win32::{
    Foundation::HWND,
    UI::WindowsAndMessaging::{GWLP_USERDATA, GetWindowLongPtrW},
};

use crate::app::AppState;

/// Runs `f` on the state attached to `hwnd`. `None` before `WM_CREATE` and after
/// `WM_NCDESTROY`.
///
/// `f` must not pump messages (menus, message boxes): a nested dispatch would alias the state.
pub(crate) fn with_state_mut<R>(hwnd: HWND, f: impl FnOnce(&mut AppState) -> R) -> Option<R> {
    unsafe {
        let p = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut AppState;
        (!p.is_null()).then(|| f(&mut *p))
    }
}

pub(crate) fn with_state_mut_do(hwnd: HWND, f: impl FnOnce(&mut AppState)) {
    let _ = with_state_mut(hwnd, f);
}
