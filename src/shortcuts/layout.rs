use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Раскладка клавиатуры для выбора удобных ярлыков
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutKind {
    #[default]
    #[serde(rename = "QWERTY")]
    Qwerty,
    Dvorak,
}

impl LayoutKind {
    /// Три ряда по десять символов
    fn rows(&self) -> &'static str {
        match self {
            LayoutKind::Qwerty => "qwertyuiopasdfghjkl;zxcvbnm,./",
            LayoutKind::Dvorak => "',.pyfgcrlaoeuidhtns;qjkxbmwvz",
        }
    }
}

/// Геометрия 30 символьных клавиш раскладки
#[derive(Debug, Clone)]
pub struct KeyboardLayout {
    keys: Vec<char>,
    indexes: HashMap<char, usize>,
}

impl KeyboardLayout {
    pub const ROW_LEN: usize = 10;

    pub fn new(kind: LayoutKind) -> Self {
        let keys: Vec<char> = kind.rows().chars().collect();
        let indexes = keys.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self { keys, indexes }
    }

    pub fn keys(&self) -> &[char] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn index_of(&self, key: char) -> Option<usize> {
        self.indexes.get(&key).copied()
    }

    pub fn key_at(&self, index: usize) -> char {
        self.keys[index % self.keys.len()]
    }

    pub fn contains(&self, key: char) -> bool {
        self.indexes.contains_key(&key)
    }

    /// Буква, присутствующая в раскладке
    pub fn is_alpha(&self, key: char) -> bool {
        self.contains(key) && key.is_alphabetic()
    }

    /// +1, если клавиша в левой половине ряда, иначе -1: суффиксы идут
    /// от положения руки к дальнему краю ряда
    pub fn direction(&self, base: char) -> isize {
        match self.index_of(base) {
            Some(index) if index % Self::ROW_LEN < Self::ROW_LEN / 2 => 1,
            _ => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_have_thirty_keys() {
        for kind in [LayoutKind::Qwerty, LayoutKind::Dvorak] {
            let layout = KeyboardLayout::new(kind);
            assert_eq!(layout.len(), 30);
            assert_eq!(layout.indexes.len(), 30);
        }
    }

    #[test]
    fn test_index_lookup() {
        let layout = KeyboardLayout::new(LayoutKind::Qwerty);
        assert_eq!(layout.index_of('q'), Some(0));
        assert_eq!(layout.index_of('x'), Some(21));
        assert_eq!(layout.index_of('/'), Some(29));
        assert_eq!(layout.index_of('1'), None);
        assert_eq!(layout.key_at(30), 'q');
    }

    #[test]
    fn test_direction() {
        let layout = KeyboardLayout::new(LayoutKind::Qwerty);
        assert_eq!(layout.direction('q'), 1);
        assert_eq!(layout.direction('t'), 1);
        assert_eq!(layout.direction('y'), -1);
        assert_eq!(layout.direction('x'), 1);
        assert_eq!(layout.direction('m'), -1);
    }

    #[test]
    fn test_is_alpha() {
        let layout = KeyboardLayout::new(LayoutKind::Dvorak);
        assert!(layout.is_alpha('p'));
        assert!(!layout.is_alpha(';'));
        assert!(!layout.is_alpha('\''));
        assert!(!layout.is_alpha('7'));
    }
}
