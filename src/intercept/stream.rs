//! Shared multicast stream of intercepted input events.
//!
//! The stream owns a reference-counted observer registry tied to a
//! [`HookBackend`]: the backend is activated (hooks installed) on the 0→1
//! subscriber transition and deactivated (hooks removed) on the 1→0
//! transition, so the process carries no hooks while nobody is listening.
//!
//! One mutex guards the registry, which serializes subscribe/dispose from
//! arbitrary threads against dispatch running on the OS callback thread.
//! Observers must therefore not call [`KeyStream::subscribe`] or
//! [`Subscription::dispose`] from inside a dispatch. A panicking observer is
//! contained: the panic is caught and logged, later observers still run, and
//! no unwind can reach the hook procedure's FFI boundary.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

use super::event::InterceptKeyEvent;
use crate::HookError;

/// The seam between the portable registry and the OS hooking layer.
///
/// `activate` is called exactly at the 0→1 subscriber transition and
/// `deactivate` exactly at 1→0. An `activate` error aborts the subscription
/// and must leave no hooks behind.
pub trait HookBackend {
    fn activate(&self) -> Result<(), HookError>;
    fn deactivate(&self);
}

type Observer = Box<dyn FnMut(&mut InterceptKeyEvent) + Send>;

struct Registry {
    next_id: u64,
    observers: Vec<(u64, Observer)>,
}

/// Multicast publisher of [`InterceptKeyEvent`]s with lazy hook activation.
pub struct KeyStream<B: HookBackend> {
    backend: B,
    registry: Mutex<Registry>,
}

impl<B: HookBackend> KeyStream<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            registry: Mutex::new(Registry {
                next_id: 0,
                observers: Vec::new(),
            }),
        }
    }

    /// Registers `observer` to receive every subsequently published event,
    /// in publication order, on the thread that publishes it.
    ///
    /// The first subscription installs the system hooks before returning; if
    /// installation fails the error propagates and the observer is not
    /// registered, so a later subscribe may retry.
    pub fn subscribe(
        &self,
        observer: impl FnMut(&mut InterceptKeyEvent) + Send + 'static,
    ) -> Result<Subscription<'_, B>, HookError> {
        let mut registry = self.lock_registry();
        if registry.observers.is_empty() {
            self.backend.activate()?;
        }
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.push((id, Box::new(observer)));
        tracing::debug!(id, observers = registry.observers.len(), "subscribed");
        Ok(Subscription {
            stream: self,
            id: Some(id),
        })
    }

    /// Delivers `event` to all current observers, in subscription order.
    ///
    /// Observers all see the same instance, so a `mark_handled` by an early
    /// observer is visible to later ones and to the caller afterwards. An
    /// observer panic is caught and logged; remaining observers still run.
    pub fn publish(&self, event: &mut InterceptKeyEvent) {
        let mut registry = self.lock_registry();
        for (id, observer) in registry.observers.iter_mut() {
            // An unwind here would cross the hook procedure's FFI boundary.
            if panic::catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                tracing::error!(id = *id, "observer panicked during dispatch");
            }
        }
    }

    /// The registry stays consistent even if an observer panicked while the
    /// lock was held, so poison is cleared rather than propagated.
    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn unsubscribe(&self, id: u64) {
        let mut registry = self.lock_registry();
        let before = registry.observers.len();
        registry.observers.retain(|(observer_id, _)| *observer_id != id);
        if registry.observers.len() == before {
            return;
        }
        tracing::debug!(id, observers = registry.observers.len(), "unsubscribed");
        if registry.observers.is_empty() {
            self.backend.deactivate();
        }
    }
}

/// Handle to one registered observer.
///
/// Dropping the handle unsubscribes; [`dispose`](Self::dispose) does the same
/// eagerly. Disposing the last subscription removes the system hooks
/// synchronously. Disposing twice is a no-op.
pub struct Subscription<'a, B: HookBackend> {
    stream: &'a KeyStream<B>,
    id: Option<u64>,
}

impl<B: HookBackend> Subscription<'_, B> {
    pub fn dispose(&mut self) {
        if let Some(id) = self.id.take() {
            self.stream.unsubscribe(id);
        }
    }
}

impl<B: HookBackend> Drop for Subscription<'_, B> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::event::{EventKind, KeyDirection, Modifiers};
    use crate::intercept::translate::{translate_keyboard, WM_KEYDOWN};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, Once};

    /// Routes the stream's debug/error logs through the test writer.
    fn init_tracing() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keyhook=debug")),
                )
                .with_test_writer()
                .try_init();
        });
    }

    /// In-memory stand-in for the OS hooking layer.
    #[derive(Default)]
    struct FakeBackend {
        installs: AtomicUsize,
        uninstalls: AtomicUsize,
        fail_next: AtomicBool,
    }

    impl FakeBackend {
        fn installed(&self) -> bool {
            self.installs.load(Ordering::SeqCst) > self.uninstalls.load(Ordering::SeqCst)
        }
    }

    impl HookBackend for FakeBackend {
        fn activate(&self) -> Result<(), HookError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(HookError::InstallRefused {
                    hook: "keyboard",
                    code: 5,
                });
            }
            self.installs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn deactivate(&self) {
            self.uninstalls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stream() -> KeyStream<FakeBackend> {
        init_tracing();
        KeyStream::new(FakeBackend::default())
    }

    fn key_a_down() -> InterceptKeyEvent {
        translate_keyboard(WM_KEYDOWN, 0x41, Modifiers::default())
    }

    #[test]
    fn test_hooks_install_on_first_subscribe_only() {
        let stream = stream();
        assert!(!stream.backend.installed());

        let _a = stream.subscribe(|_| {}).unwrap();
        assert!(stream.backend.installed());
        assert_eq!(stream.backend.installs.load(Ordering::SeqCst), 1);

        // A second subscriber must not install a second pair.
        let _b = stream.subscribe(|_| {}).unwrap();
        assert_eq!(stream.backend.installs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hooks_uninstall_on_last_dispose_only() {
        let stream = stream();
        let mut a = stream.subscribe(|_| {}).unwrap();
        let mut b = stream.subscribe(|_| {}).unwrap();

        a.dispose();
        assert!(stream.backend.installed());

        b.dispose();
        assert!(!stream.backend.installed());
        assert_eq!(stream.backend.uninstalls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispose_twice_is_noop() {
        let stream = stream();
        let mut a = stream.subscribe(|_| {}).unwrap();
        let _b = stream.subscribe(|_| {}).unwrap();

        a.dispose();
        a.dispose();

        // One observer still registered, so no uninstall happened.
        assert!(stream.backend.installed());
        assert_eq!(stream.backend.uninstalls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let stream = stream();
        {
            let _a = stream.subscribe(|_| {}).unwrap();
            assert!(stream.backend.installed());
        }
        assert!(!stream.backend.installed());
    }

    #[test]
    fn test_install_failure_propagates_and_leaves_idle() {
        let stream = stream();
        stream.backend.fail_next.store(true, Ordering::SeqCst);

        let err = stream.subscribe(|_| {}).err().expect("subscribe must fail");
        assert_eq!(
            err,
            HookError::InstallRefused {
                hook: "keyboard",
                code: 5
            }
        );
        assert!(!stream.backend.installed());

        // A later subscribe retries, succeeds, and actually receives events.
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_a = Arc::clone(&seen);
        let _a = stream
            .subscribe(move |_| {
                seen_a.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(stream.backend.installed());

        stream.publish(&mut key_a_down());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_observers_receive_events_in_subscription_order() {
        let stream = stream();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = Arc::clone(&order);
        let _a = stream
            .subscribe(move |event| {
                if let EventKind::Keyboard { key, direction, .. } = event.kind {
                    order_a.lock().unwrap().push(("a", key, direction));
                }
            })
            .unwrap();

        let order_b = Arc::clone(&order);
        let _b = stream
            .subscribe(move |event| {
                if let EventKind::Keyboard { key, direction, .. } = event.kind {
                    order_b.lock().unwrap().push(("b", key, direction));
                }
            })
            .unwrap();

        let mut event = key_a_down();
        stream.publish(&mut event);

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                ("a", 0x41, KeyDirection::Down),
                ("b", 0x41, KeyDirection::Down),
            ]
        );
        assert!(!event.handled());
    }

    #[test]
    fn test_handled_is_visible_to_later_observers_and_caller() {
        let stream = stream();

        let _a = stream.subscribe(|event| event.mark_handled()).unwrap();

        let b_saw_handled = Arc::new(AtomicBool::new(false));
        let b_flag = Arc::clone(&b_saw_handled);
        let _b = stream
            .subscribe(move |event| b_flag.store(event.handled(), Ordering::SeqCst))
            .unwrap();

        let mut event = key_a_down();
        stream.publish(&mut event);

        // Later observers still see the event, with the flag already set,
        // and the caller's post-dispatch check sees it too (that check is
        // what skips the forward-to-next-hook step).
        assert!(b_saw_handled.load(Ordering::SeqCst));
        assert!(event.handled());
    }

    #[test]
    fn test_panicking_observer_does_not_stop_dispatch() {
        let stream = stream();
        let _a = stream.subscribe(|_| panic!("observer bug")).unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_b = Arc::clone(&seen);
        let _b = stream
            .subscribe(move |_| {
                seen_b.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        // The panic must not unwind out of publish, and the observer after
        // the panicking one still receives the event.
        stream.publish(&mut key_a_down());
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        // The stream stays usable: the registry lock recovered, so new
        // subscriptions and further publishes work.
        let _c = stream.subscribe(|_| {}).unwrap();
        stream.publish(&mut key_a_down());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_publish_with_no_observers_is_noop() {
        let stream = stream();
        let mut event = key_a_down();
        stream.publish(&mut event);
        assert!(!event.handled());
    }

    #[test]
    fn test_unsubscribed_observer_stops_receiving() {
        let stream = stream();
        let count = Arc::new(AtomicUsize::new(0));

        let count_a = Arc::clone(&count);
        let mut a = stream
            .subscribe(move |_| {
                count_a.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let _b = stream.subscribe(|_| {}).unwrap();

        stream.publish(&mut key_a_down());
        a.dispose();
        stream.publish(&mut key_a_down());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
