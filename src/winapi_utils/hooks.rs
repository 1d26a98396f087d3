//! Low-level hook installation and the hook procedures.
//!
//! [`SystemHooks`] owns the two hook handles for the whole Active lifetime of
//! the stream and is the only place that mutates them, always under its lock.
//! The hook procedures are plain `extern "system"` function items, so the
//! classic "callback freed while the OS still calls it" hazard cannot arise:
//! function items live for the life of the process.
//!
//! # Important
//! - The procedures run synchronously in the Windows input pipeline; a slow
//!   or blocking callback makes the OS time out and silently unhook us.
//! - The installing thread must pump messages (see
//!   [`run_message_loop`](crate::winapi_utils::run_message_loop)).

use once_cell::sync::Lazy;
use std::sync::Mutex;

use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyState, VIRTUAL_KEY, VK_CONTROL, VK_MENU, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, SetWindowsHookExW, UnhookWindowsHookEx, HHOOK, HOOKPROC, KBDLLHOOKSTRUCT,
    WH_KEYBOARD_LL, WH_MOUSE_LL, WINDOWS_HOOK_ID,
};

use crate::intercept::event::Modifiers;
use crate::intercept::stream::{HookBackend, KeyStream};
use crate::intercept::translate::{translate_keyboard, translate_mouse};
use crate::HookError;

struct InstalledHooks {
    keyboard: HHOOK,
    mouse: HHOOK,
}

// HHOOK is a plain identifier handed out by the OS, not a pointer we
// dereference; moving it across threads is fine.
unsafe impl Send for InstalledHooks {}

/// [`HookBackend`] over the real Windows low-level hooks.
///
/// Exactly two hooks live while active, zero while idle. Install of the pair
/// is atomic from the caller's perspective: if the mouse hook is refused
/// after the keyboard hook succeeded, the keyboard hook is rolled back.
pub struct SystemHooks {
    handles: Mutex<Option<InstalledHooks>>,
}

impl SystemHooks {
    fn new() -> Self {
        Self {
            handles: Mutex::new(None),
        }
    }

    fn install(
        hook: &'static str,
        id: WINDOWS_HOOK_ID,
        procedure: HOOKPROC,
    ) -> Result<HHOOK, HookError> {
        let refused = |error: windows::core::Error| HookError::InstallRefused {
            hook,
            code: error.code().0,
        };
        let module = unsafe { GetModuleHandleW(None) }.map_err(refused)?;
        let handle =
            unsafe { SetWindowsHookExW(id, procedure, HINSTANCE(module.0), 0) }.map_err(refused)?;
        tracing::info!(hook, "low-level hook installed");
        Ok(handle)
    }

    /// Best effort: the OS reclaims hooks at process exit regardless.
    fn uninstall(hook: &'static str, handle: HHOOK) {
        match unsafe { UnhookWindowsHookEx(handle) } {
            Ok(()) => tracing::info!(hook, "low-level hook removed"),
            Err(error) => tracing::warn!(hook, ?error, "failed to remove hook"),
        }
    }
}

impl HookBackend for SystemHooks {
    fn activate(&self) -> Result<(), HookError> {
        let mut handles = self.handles.lock().expect("hook handles poisoned");
        if handles.is_some() {
            return Ok(());
        }
        let keyboard = Self::install("keyboard", WH_KEYBOARD_LL, Some(keyboard_hook_proc))?;
        let mouse = match Self::install("mouse", WH_MOUSE_LL, Some(mouse_hook_proc)) {
            Ok(handle) => handle,
            Err(error) => {
                Self::uninstall("keyboard", keyboard);
                return Err(error);
            }
        };
        *handles = Some(InstalledHooks { keyboard, mouse });
        Ok(())
    }

    fn deactivate(&self) {
        if let Some(installed) = self.handles.lock().expect("hook handles poisoned").take() {
            Self::uninstall("keyboard", installed.keyboard);
            Self::uninstall("mouse", installed.mouse);
        }
    }
}

static KEY_STREAM: Lazy<KeyStream<SystemHooks>> =
    Lazy::new(|| KeyStream::new(SystemHooks::new()));

/// The process-wide intercepted input stream.
///
/// Subscribing installs the hooks, disposing the last subscription removes
/// them; see [`KeyStream`].
pub fn key_stream() -> &'static KeyStream<SystemHooks> {
    &KEY_STREAM
}

/// Samples global modifier state at callback time.
///
/// The low-level hook message carries no modifier flags, so this is the best
/// available signal; it can race a very fast modifier change between message
/// post and hook invocation, which is an accepted platform limitation.
fn sampled_modifiers() -> Modifiers {
    // High bit set means the key is currently down.
    let down = |vk: VIRTUAL_KEY| (unsafe { GetKeyState(vk.0 as i32) } as u16) & 0x8000 != 0;
    Modifiers {
        alt: down(VK_MENU),
        control: down(VK_CONTROL),
        shift: down(VK_SHIFT),
    }
}

/// Low-level keyboard hook procedure.
///
/// # Safety
/// Called by Windows with `lparam` pointing at a `KBDLLHOOKSTRUCT` whenever
/// `code >= 0`; must never unwind.
unsafe extern "system" fn keyboard_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let vk_code = (*(lparam.0 as *const KBDLLHOOKSTRUCT)).vkCode;
        let mut event = translate_keyboard(wparam.0 as u32, vk_code, sampled_modifiers());
        KEY_STREAM.publish(&mut event);
        if event.handled() {
            // Swallow: the event reaches neither later hooks nor the
            // focused application.
            return LRESULT(1);
        }
    }
    CallNextHookEx(None, code, wparam, lparam)
}

/// Low-level mouse hook procedure.
///
/// Movement, wheel and button-up messages translate to no event and are
/// forwarded untouched.
///
/// # Safety
/// Called by Windows; must never unwind.
unsafe extern "system" fn mouse_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        if let Some(mut event) = translate_mouse(wparam.0 as u32) {
            KEY_STREAM.publish(&mut event);
            if event.handled() {
                return LRESULT(1);
            }
        }
    }
    CallNextHookEx(None, code, wparam, lparam)
}
