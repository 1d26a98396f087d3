//! keyhook - system-wide input interception for Windows.
//!
//! Installs the two low-level input hooks (`WH_KEYBOARD_LL` and `WH_MOUSE_LL`)
//! and exposes every global keyboard and mouse event, regardless of which
//! application has focus, as a single shared event stream. Subscribers may
//! mark an event handled to swallow it from the rest of the OS hook chain.
//!
//! The hooks are installed lazily when the first observer subscribes and
//! removed when the last subscription is disposed. Dispatch is synchronous on
//! the thread Windows delivers the hook callback to, so observers must be
//! fast and must never block.
//!
//! # Example
//! ```ignore
//! use keyhook::{key_stream, run_message_loop, EventKind};
//!
//! let _sub = key_stream().subscribe(|event| {
//!     if let EventKind::Keyboard { key, direction, .. } = event.kind {
//!         tracing::info!(key, ?direction, "key event");
//!     }
//! })?;
//!
//! // Low-level hooks require a message pump on the installing thread.
//! run_message_loop();
//! ```
//!
//! # Module layout
//! - [`intercept`]: portable core (event model, raw-message translation,
//!   multicast stream). Compiles and tests on any OS.
//! - [`winapi_utils`]: the unsafe Win32 boundary (hook procedures, hook
//!   installation, window helpers). Windows only.

pub mod intercept;

#[cfg(windows)]
pub mod winapi_utils;

pub use intercept::event::{
    EventKind, InterceptKeyEvent, KeyDirection, Modifiers, MOUSE_LEFT, MOUSE_MIDDLE, MOUSE_RIGHT,
};
pub use intercept::stream::{HookBackend, KeyStream, Subscription};

#[cfg(windows)]
pub use winapi_utils::{
    key_stream, post_quit_message, run_message_loop, set_window_click_through,
};

/// Errors surfaced by hook installation.
///
/// Failure to *remove* a hook is deliberately not represented here: the OS
/// reclaims hooks at process exit, so removal failures are logged and
/// otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    /// The OS refused to register a low-level hook (insufficient privilege,
    /// module handle resolution failure, ...).
    #[error("OS refused to install the low-level {hook} hook (os error {code})")]
    InstallRefused { hook: &'static str, code: i32 },
}
