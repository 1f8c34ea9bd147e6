//! Clipboard access backed by the `arboard` crate.
//!
//! Every call opens a short-lived [`arboard::Clipboard`]: the handle is not
//! `Send` on every platform and is cheap to create.

use arboard::Clipboard;

use super::InjectError;

/// Current plain-text clipboard content.
///
/// `Ok(None)` when the clipboard is empty or holds non-text data.
pub fn read_text() -> Result<Option<String>, InjectError> {
    let mut clipboard = open()?;
    Ok(clipboard.get_text().ok())
}

pub fn write_text(text: &str) -> Result<(), InjectError> {
    let mut clipboard = open()?;
    clipboard
        .set_text(text)
        .map_err(|e| InjectError::ClipboardSet(e.to_string()))
}

// ---------------------------------------------------------------------------
// ClipboardSnapshot
// ---------------------------------------------------------------------------

/// Saved clipboard text, written back when the snapshot is dropped.
///
/// ```no_run
/// use buddy_assistant::inject::{clipboard, ClipboardSnapshot};
///
/// let _restore = ClipboardSnapshot::take()?;
/// clipboard::write_text("temporary")?;
/// // ... paste ...
/// # Ok::<(), buddy_assistant::inject::InjectError>(())
/// ```
#[derive(Debug)]
pub struct ClipboardSnapshot {
    saved: Option<String>,
}

impl ClipboardSnapshot {
    pub fn take() -> Result<Self, InjectError> {
        Ok(Self {
            saved: read_text()?,
        })
    }

    pub fn saved(&self) -> Option<&str> {
        self.saved.as_deref()
    }
}

impl Drop for ClipboardSnapshot {
    fn drop(&mut self) {
        // Nothing to put back when the clipboard held no text.
        if let Some(text) = self.saved.take() {
            if let Err(e) = write_text(&text) {
                log::warn!("inject: clipboard restore failed: {e}");
            }
        }
    }
}

fn open() -> Result<Clipboard, InjectError> {
    Clipboard::new().map_err(|e| InjectError::ClipboardAccess(e.to_string()))
}
