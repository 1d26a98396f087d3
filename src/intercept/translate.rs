//! Translation of raw hook parameters into [`InterceptKeyEvent`]s.
//!
//! The functions here are pure: the hook procedures read the volatile parts
//! (the `KBDLLHOOKSTRUCT` and the global modifier state) at the FFI boundary
//! and pass plain integers in. The Win32 message constants are mirrored as
//! local constants so this module compiles off-Windows.
//!
//! Translation never fails. Raw messages that do not map to a known event
//! shape resolve to [`KeyDirection::Unknown`] (keyboard) or no event at all
//! (mouse); the hook procedure still forwards them down the hook chain.

use super::event::{
    InterceptKeyEvent, KeyDirection, Modifiers, MOUSE_LEFT, MOUSE_MIDDLE, MOUSE_RIGHT,
};

pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MOUSEWHEEL: u32 = 0x020A;

/// Left and right Alt virtual-key codes.
pub const VK_LMENU: u32 = 0xA4;
pub const VK_RMENU: u32 = 0xA5;

/// Builds a keyboard event from a low-level keyboard hook invocation.
///
/// `WM_SYSKEY*` messages are raised when a key goes down or up while Alt is
/// held (Alt+F4 and friends), so they force `alt = true` and carry the
/// transition in the message itself. The exception is the Alt key's own
/// press/release, which arrives as a system-key message too and must not be
/// counted as an Alt combo.
pub fn translate_keyboard(wparam: u32, vk_code: u32, modifiers: Modifiers) -> InterceptKeyEvent {
    let mut alt = modifiers.alt;
    let mut direction = match wparam {
        WM_KEYDOWN => KeyDirection::Down,
        WM_KEYUP => KeyDirection::Up,
        _ => KeyDirection::Unknown,
    };

    if vk_code != VK_LMENU && vk_code != VK_RMENU {
        match wparam {
            WM_SYSKEYDOWN => {
                alt = true;
                direction = KeyDirection::Down;
            }
            WM_SYSKEYUP => {
                alt = true;
                direction = KeyDirection::Up;
            }
            _ => {}
        }
    }

    InterceptKeyEvent::keyboard(vk_code, direction, Modifiers { alt, ..modifiers })
}

/// Builds a mouse event from a low-level mouse hook invocation.
///
/// Only button-down transitions produce events; movement, wheel and button-up
/// messages yield `None` and the hook procedure forwards them untouched.
pub fn translate_mouse(wparam: u32) -> Option<InterceptKeyEvent> {
    let mut buttons = 0;
    if wparam == WM_LBUTTONDOWN {
        buttons |= MOUSE_LEFT;
    }
    if wparam == WM_RBUTTONDOWN {
        buttons |= MOUSE_RIGHT;
    }
    if wparam == WM_MBUTTONDOWN {
        buttons |= MOUSE_MIDDLE;
    }
    if buttons == 0 {
        return None;
    }
    Some(InterceptKeyEvent::mouse(buttons))
}
