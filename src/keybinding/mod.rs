//! Сочетания клавиш и их множество без конфликтов.
//!
//! Модуль не обращается к X серверу: коды клавиш разрешаются снаружи,
//! захват клавиш выполняет `services::key_binder`.

mod binding;
mod binding_set;

pub use binding::{KeySequence, Keybinding};
pub use binding_set::{BindingId, BindingSet, PartialMatch};
