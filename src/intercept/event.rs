//! Typed input events produced by the translation layer.

/// Bit flag for the left mouse button.
pub const MOUSE_LEFT: u32 = 1;
/// Bit flag for the right mouse button.
pub const MOUSE_RIGHT: u32 = 4;
/// Bit flag for the middle mouse button.
pub const MOUSE_MIDDLE: u32 = 16;

/// Whether a keyboard event is a press or a release.
///
/// `Unknown` covers raw messages that carry neither transition, e.g. a bare
/// Alt press delivered as a system-key message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
    Unknown,
}

/// Modifier key state sampled at translation time.
///
/// The low-level hook message does not carry modifier flags, so these are
/// read from global keyboard state when the callback fires. That read is
/// slightly racy against very fast modifier changes; this is an accepted
/// platform limitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub alt: bool,
    pub control: bool,
    pub shift: bool,
}

/// Payload of an intercepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Keyboard {
        /// Virtual-key code of the key.
        key: u32,
        direction: KeyDirection,
        alt: bool,
        control: bool,
        shift: bool,
    },
    Mouse {
        /// Bit flags: [`MOUSE_LEFT`] | [`MOUSE_RIGHT`] | [`MOUSE_MIDDLE`].
        /// The raw hook delivers one button per event.
        buttons: u32,
    },
}

/// One intercepted keyboard or mouse event.
///
/// All observers in a dispatch see the same instance, so an early observer's
/// [`mark_handled`](Self::mark_handled) is visible to later observers and to
/// the hook procedure, which swallows the event from the OS hook chain after
/// dispatch when the flag is set.
#[derive(Debug)]
pub struct InterceptKeyEvent {
    pub kind: EventKind,
    handled: bool,
}

impl InterceptKeyEvent {
    pub fn keyboard(key: u32, direction: KeyDirection, modifiers: Modifiers) -> Self {
        Self {
            kind: EventKind::Keyboard {
                key,
                direction,
                alt: modifiers.alt,
                control: modifiers.control,
                shift: modifiers.shift,
            },
            handled: false,
        }
    }

    pub fn mouse(buttons: u32) -> Self {
        Self {
            kind: EventKind::Mouse { buttons },
            handled: false,
        }
    }

    /// Requests suppression of this event. One-way; there is no unset.
    pub fn mark_handled(&mut self) {
        self.handled = true;
    }

    pub fn handled(&self) -> bool {
        self.handled
    }
}
