//! Keyboard and pointer events backed by the `enigo` crate.
//!
//! Paste uses ⌘V on macOS and Ctrl+V elsewhere.  Typing sends one text
//! event per character; scrolling uses the vertical wheel, positive = down.
//!
//! [`Enigo`] is not `Send`; callers create one [`InputDevice`] per action
//! on the thread that uses it.

use std::time::Duration;

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use super::InjectError;

pub struct InputDevice {
    enigo: Enigo,
}

impl InputDevice {
    pub fn new() -> Result<Self, InjectError> {
        let enigo =
            Enigo::new(&Settings::default()).map_err(|e| InjectError::KeySimulation(e.to_string()))?;
        Ok(Self { enigo })
    }

    /// Send the platform paste shortcut to the focused window.
    pub fn paste(&mut self) -> Result<(), InjectError> {
        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        self.key(modifier, Direction::Press)?;
        let tapped = self.key(Key::Unicode('v'), Direction::Click);
        // Always release the modifier, even when the tap failed.
        let released = self.key(modifier, Direction::Release);
        tapped.and(released)
    }

    /// Type `text` one character at a time, pausing `delay` between
    /// characters.
    pub fn type_chars(&mut self, text: &str, delay: Duration) -> Result<(), InjectError> {
        for c in text.chars() {
            match c {
                '\n' => self.key(Key::Return, Direction::Click)?,
                '\t' => self.key(Key::Tab, Direction::Click)?,
                _ => self
                    .enigo
                    .text(&c.to_string())
                    .map_err(|e| InjectError::KeySimulation(e.to_string()))?,
            }
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        Ok(())
    }

    /// Scroll vertically by `lines`; negative scrolls up.
    pub fn scroll(&mut self, lines: i32) -> Result<(), InjectError> {
        self.enigo
            .scroll(lines, Axis::Vertical)
            .map_err(|e| InjectError::Pointer(e.to_string()))
    }

    /// Left-click, after moving to `at` when given.
    pub fn click(&mut self, at: Option<(i32, i32)>) -> Result<(), InjectError> {
        if let Some((x, y)) = at {
            self.enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(|e| InjectError::Pointer(e.to_string()))?;
        }
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| InjectError::Pointer(e.to_string()))
    }

    fn key(&mut self, key: Key, direction: Direction) -> Result<(), InjectError> {
        self.enigo
            .key(key, direction)
            .map_err(|e| InjectError::KeySimulation(e.to_string()))
    }
}
