use crate::events::ModMask;

/// Псевдонимы модификаторов в записи сочетаний (`Super+x`, `C+A+q`)
pub struct ModifierAlias;

impl ModifierAlias {
    /// Получить маску модификатора по имени или псевдониму (с учётом регистра)
    pub fn translate(name: &str) -> Option<ModMask> {
        match name {
            "Shift" | "S" => Some(ModMask::SHIFT),
            "Control" | "Ctrl" | "C" => Some(ModMask::CONTROL),
            "Mod1" | "Alt" | "A" => Some(ModMask::MOD1),
            "Mod4" | "Super" | "U" => Some(ModMask::MOD4),
            _ => None,
        }
    }
}
