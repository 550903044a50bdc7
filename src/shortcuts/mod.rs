//! Ярлыки окон: раскладка, генератор ярлыков, история и правила AWN.
//!
//! Ничего не знает об X сервере; захват клавиш живёт в `services`.

pub mod generator;
pub mod history;
pub mod layout;
pub mod rules;
pub mod shortcut;

pub use generator::{ShortcutGenerator, ShortcutOutcome};
pub use history::History;
pub use layout::LayoutKind;
pub use rules::Rules;
pub use shortcut::Shortcut;
