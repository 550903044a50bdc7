pub mod keyboard;
pub mod window;

pub use keyboard::{KeyEvent, KeyState, Keycode, Keysym, ModMask};
pub use window::{WindowEvent, WindowId, WindowInfo};

/// Событие, пришедшее от X сервера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Key(KeyEvent),
    Window(WindowEvent),
}

impl From<KeyEvent> for DisplayEvent {
    fn from(event: KeyEvent) -> Self {
        DisplayEvent::Key(event)
    }
}

impl From<WindowEvent> for DisplayEvent {
    fn from(event: WindowEvent) -> Self {
        DisplayEvent::Window(event)
    }
}
