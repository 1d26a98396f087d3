//! Window-style helper for overlay windows.

use windows::Win32::Foundation::HWND;
use windows::Win32::UI::WindowsAndMessaging::{
    GetWindowLongW, SetWindowLongW, GWL_EXSTYLE, WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT,
};

/// Makes `hwnd` click-through and keeps it out of the Alt+Tab switcher.
///
/// Overlay windows that render on top of everything must not steal the input
/// they are visualizing, so they get `WS_EX_TRANSPARENT` (mouse events fall
/// through to whatever is underneath) and `WS_EX_TOOLWINDOW` (hidden from the
/// task switcher). One-shot; unrelated to the event pipeline.
pub fn set_window_click_through(hwnd: HWND) {
    unsafe {
        let style = GetWindowLongW(hwnd, GWL_EXSTYLE);
        let extra = (WS_EX_TRANSPARENT.0 | WS_EX_TOOLWINDOW.0) as i32;
        SetWindowLongW(hwnd, GWL_EXSTYLE, style | extra);
    }
}
