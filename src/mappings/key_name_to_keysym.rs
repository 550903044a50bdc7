use crate::events::Keysym;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Имена клавиш X11 и их keysym
static KEY_NAMES: &[(&str, Keysym)] = &[
    // Буквенные клавиши
    ("a", 0x61),
    ("b", 0x62),
    ("c", 0x63),
    ("d", 0x64),
    ("e", 0x65),
    ("f", 0x66),
    ("g", 0x67),
    ("h", 0x68),
    ("i", 0x69),
    ("j", 0x6a),
    ("k", 0x6b),
    ("l", 0x6c),
    ("m", 0x6d),
    ("n", 0x6e),
    ("o", 0x6f),
    ("p", 0x70),
    ("q", 0x71),
    ("r", 0x72),
    ("s", 0x73),
    ("t", 0x74),
    ("u", 0x75),
    ("v", 0x76),
    ("w", 0x77),
    ("x", 0x78),
    ("y", 0x79),
    ("z", 0x7a),

    // Цифровые клавиши
    ("0", 0x30),
    ("1", 0x31),
    ("2", 0x32),
    ("3", 0x33),
    ("4", 0x34),
    ("5", 0x35),
    ("6", 0x36),
    ("7", 0x37),
    ("8", 0x38),
    ("9", 0x39),

    // Пунктуация (ряды раскладки)
    ("space", 0x0020),
    ("apostrophe", 0x0027),
    ("comma", 0x002c),
    ("minus", 0x002d),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("semicolon", 0x003b),
    ("equal", 0x003d),
    ("bracketleft", 0x005b),
    ("backslash", 0x005c),
    ("bracketright", 0x005d),
    ("grave", 0x0060),

    // Навигация/редакция
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Scroll_Lock", 0xff14),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Prior", 0xff55),
    ("Next", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Insert", 0xff63),
    ("Menu", 0xff67),
    ("Delete", 0xffff),

    // Функциональные клавиши
    ("F1", 0xffbe),
    ("F2", 0xffbf),
    ("F3", 0xffc0),
    ("F4", 0xffc1),
    ("F5", 0xffc2),
    ("F6", 0xffc3),
    ("F7", 0xffc4),
    ("F8", 0xffc5),
    ("F9", 0xffc6),
    ("F10", 0xffc7),
    ("F11", 0xffc8),
    ("F12", 0xffc9),

    // Модификаторы и блокировки
    ("Shift_L", 0xffe1),
    ("Shift_R", 0xffe2),
    ("Control_L", 0xffe3),
    ("Control_R", 0xffe4),
    ("Caps_Lock", 0xffe5),
    ("Alt_L", 0xffe9),
    ("Alt_R", 0xffea),
    ("Super_L", 0xffeb),
    ("Super_R", 0xffec),
    ("Num_Lock", 0xff7f),
];

static KEYSYM_TO_NAME: Lazy<HashMap<Keysym, &'static str>> = Lazy::new(|| {
    KEY_NAMES.iter().map(|&(name, keysym)| (keysym, name)).collect()
});

/// Преобразование имён клавиш в X11 keysym
/// Отвечает за трансляцию строковых имён клавиш из конфигурации и сочетаний
pub struct KeyNameToKeysym;

impl KeyNameToKeysym {
    /// Получить keysym клавиши по её имени (с учётом регистра, как в X11)
    pub fn translate(key_name: &str) -> Result<Keysym, String> {
        if let Some(&(_, keysym)) = KEY_NAMES.iter().find(|(name, _)| *name == key_name) {
            return Ok(keysym);
        }

        // Одиночный печатный ASCII символ совпадает со своим keysym (Latin-1)
        let mut chars = key_name.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_graphic() => Ok(c as Keysym),
            _ => Err(format!("Unknown key: {}", key_name)),
        }
    }

    /// Получить имя клавиши по keysym
    pub fn reverse_translate(keysym: Keysym) -> Option<&'static str> {
        KEYSYM_TO_NAME.get(&keysym).copied()
    }
}
