//! Сеанс X сервера: реальный (x11rb) и эмулируемый для dry-run и тестов.

mod dry_run;
mod r#trait;
mod x11;

#[cfg(test)]
pub use self::dry_run::DryRunDisplay;
pub use self::r#trait::{create_display, DisplayServer};
