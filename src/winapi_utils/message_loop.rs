//! Message pump for the hook-owning thread.
//!
//! Low-level hooks are delivered through the message queue of the thread
//! that installed them; if that thread stops pumping, Windows times the
//! hooks out and silently removes them. Consumers subscribe first, then
//! park the installing thread in [`run_message_loop`].

use std::sync::atomic::{AtomicU32, Ordering};

use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, PostThreadMessageW, TranslateMessage, MSG, WM_QUIT,
};

/// Thread id of the running pump, for cross-thread quit signaling.
static PUMP_THREAD_ID: AtomicU32 = AtomicU32::new(0);

/// Pumps messages on the calling thread until [`post_quit_message`] is
/// called. Blocks.
pub fn run_message_loop() {
    PUMP_THREAD_ID.store(unsafe { GetCurrentThreadId() }, Ordering::SeqCst);
    tracing::debug!("message loop started");

    let mut msg = MSG::default();
    unsafe {
        // Returns 0 on WM_QUIT, -1 on error; both stop the pump.
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    tracing::debug!("message loop exited");
}

/// Asks the pump thread to exit its loop. Callable from any thread.
pub fn post_quit_message(exit_code: i32) {
    let thread_id = PUMP_THREAD_ID.load(Ordering::SeqCst);
    if thread_id == 0 {
        tracing::warn!("no message loop has run yet, nothing to quit");
        return;
    }
    let posted = unsafe {
        PostThreadMessageW(thread_id, WM_QUIT, WPARAM(exit_code as usize), LPARAM(0))
    };
    if let Err(error) = posted {
        tracing::error!(?error, thread_id, "failed to post WM_QUIT");
    }
}
