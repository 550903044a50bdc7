mod title;
mod window;
mod window_manager;

#[cfg(test)]
pub use self::window::GroupId;
pub use self::window::{Window, WindowList};
pub use self::window_manager::WindowManager;
