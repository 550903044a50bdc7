mod key_listener;
mod repeat_filter;

pub use self::key_listener::{Activation, KeyListener, KeyboardGrab};
pub use self::repeat_filter::RepeatFilter;
