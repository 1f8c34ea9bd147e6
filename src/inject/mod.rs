//! Low-level desktop input: keys, pointer, clipboard and launchers.
//!
//! # Overview
//!
//! Plain ASCII text is typed key by key.  Anything else (accents, emoji,
//! non-Latin scripts) is unreliable as raw key events, so it goes through
//! the clipboard instead:
//!
//! 1. **Save** the current clipboard text ([`ClipboardSnapshot`]).
//! 2. **Set** the payload into the clipboard.
//! 3. **Paste** with Ctrl+V (⌘V on macOS).
//! 4. **Restore** the original clipboard when the snapshot drops.
//!
//! Every function here blocks; the dispatcher calls them from
//! `spawn_blocking`.

pub mod clipboard;
pub mod keyboard;
pub mod launcher;

pub use clipboard::ClipboardSnapshot;
pub use keyboard::InputDevice;
pub use launcher::{open, OpenTarget};

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// InjectError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),

    #[error("cannot control the pointer: {0}")]
    Pointer(String),

    #[error("cannot launch: {0}")]
    Launch(String),

    /// The request failed validation and nothing was sent to the OS.
    #[error("refused: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// Text entry
// ---------------------------------------------------------------------------

/// `true` when `text` can be typed as individual key events.
pub fn is_typeable(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_graphic() || matches!(c, ' ' | '\n' | '\t'))
}

/// Enter `text` into the focused window, typing ASCII directly and pasting
/// everything else.
pub fn enter_text(text: &str, delay: Duration) -> Result<(), InjectError> {
    let mut device = InputDevice::new()?;
    if is_typeable(text) {
        return device.type_chars(text, delay);
    }
    paste_text(&mut device, text, delay)
}

/// Clipboard paste with restore.
///
/// The restore is attempted on every exit path but its result is only
/// logged.
pub fn paste_text(device: &mut InputDevice, text: &str, delay: Duration) -> Result<(), InjectError> {
    let _restore = ClipboardSnapshot::take()?;
    clipboard::write_text(text)?;
    // Let the clipboard owner publish before the target window reads it.
    std::thread::sleep(delay);
    device.paste()?;
    // The target reads the clipboard asynchronously.
    std::thread::sleep(delay * 2);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_typeable() {
        assert!(is_typeable("hello, world! 42\n"));
        assert!(is_typeable(""));
    }

    #[test]
    fn non_ascii_goes_through_clipboard() {
        assert!(!is_typeable("café"));
        assert!(!is_typeable("สวัสดี"));
        assert!(!is_typeable("thumbs 👍"));
    }

    #[test]
    fn rejected_message() {
        let e = InjectError::Rejected("scheme 'file' is not allowed".into());
        assert_eq!(e.to_string(), "refused: scheme 'file' is not allowed");
    }
}
