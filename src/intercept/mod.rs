//! Portable interception core.
//!
//! Everything in this module is plain Rust with no FFI: the typed event
//! model, the translation of raw hook parameters into events, and the
//! reference-counted multicast stream. Only `winapi_utils` touches Win32,
//! which keeps this logic testable on any OS.

pub mod event;
pub mod stream;
pub mod translate;

pub use event::*;
pub use stream::*;
pub use translate::*;
