//! The unsafe Win32 boundary.
//!
//! Hook installation and the hook procedures live here, together with the
//! message pump the hooks depend on and the overlay window-style helper.
//! Everything above this module is portable Rust.

pub mod hooks;
pub mod message_loop;
pub mod window;

pub use hooks::*;
pub use message_loop::*;
pub use window::*;
