pub mod display;
pub mod key_binder;
pub mod keyboard_listener;
pub mod window_manager;

pub use display::create_display;
pub use key_binder::KeybindingEngine;
pub use window_manager::WindowManager;
