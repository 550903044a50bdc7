use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// Состояние клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Код клавиши (X11 keycode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Keycode(pub u8);

impl Keycode {
    pub fn new(code: u8) -> Self {
        Self(code)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Keycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY_{}", self.0)
    }
}

/// Символ клавиши (X11 keysym)
pub type Keysym = u32;

/// Битовая маска модификаторов в кодировке X11
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModMask(pub u16);

impl ModMask {
    pub const NONE: ModMask = ModMask(0);
    pub const SHIFT: ModMask = ModMask(1 << 0);
    pub const LOCK: ModMask = ModMask(1 << 1);
    pub const CONTROL: ModMask = ModMask(1 << 2);
    pub const MOD1: ModMask = ModMask(1 << 3);
    pub const MOD2: ModMask = ModMask(1 << 4);
    pub const MOD3: ModMask = ModMask(1 << 5);
    pub const MOD4: ModMask = ModMask(1 << 6);
    pub const MOD5: ModMask = ModMask(1 << 7);

    /// Варианты захвата с CapsLock и NumLock
    pub const LOCK_VARIANTS: [ModMask; 4] = [
        ModMask(0),
        ModMask(1 << 4),
        ModMask(1 << 1),
        ModMask((1 << 4) | (1 << 1)),
    ];

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: ModMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Маска без CapsLock/NumLock и без битов кнопок мыши
    pub fn relevant(&self) -> ModMask {
        ModMask(self.0 & 0x00ff & !(Self::LOCK.0 | Self::MOD2.0))
    }

    pub fn to_vec(&self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.contains(Self::SHIFT) { result.push("Shift"); }
        if self.contains(Self::CONTROL) { result.push("Control"); }
        if self.contains(Self::MOD1) { result.push("Mod1"); }
        if self.contains(Self::MOD4) { result.push("Mod4"); }
        result
    }
}

impl BitOr for ModMask {
    type Output = ModMask;

    fn bitor(self, rhs: ModMask) -> ModMask {
        ModMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModMask {
    fn bitor_assign(&mut self, rhs: ModMask) {
        self.0 |= rhs.0;
    }
}

impl Not for ModMask {
    type Output = ModMask;

    fn not(self) -> ModMask {
        ModMask(!self.0)
    }
}

impl BitAnd for ModMask {
    type Output = ModMask;

    fn bitand(self, rhs: ModMask) -> ModMask {
        ModMask(self.0 & rhs.0)
    }
}

impl From<ModMask> for x11rb::protocol::xproto::ModMask {
    fn from(mask: ModMask) -> Self {
        mask.0.into()
    }
}

impl fmt::Display for ModMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = self.to_vec();
        if modifiers.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", modifiers.join("+"))
        }
    }
}

/// Событие клавиатуры от X сервера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: Keycode,
    pub state: KeyState,
    /// Модификаторы, удерживаемые в момент события (до него)
    pub modifiers: ModMask,
    /// Время X сервера
    pub time: u32,
}

impl KeyEvent {
    pub fn press(keycode: Keycode, modifiers: ModMask) -> Self {
        Self {
            keycode,
            state: KeyState::Pressed,
            modifiers,
            time: 0,
        }
    }

    pub fn release(keycode: Keycode, modifiers: ModMask) -> Self {
        Self {
            keycode,
            state: KeyState::Released,
            modifiers,
            time: 0,
        }
    }

    /// Получить уникальный идентификатор комбинации клавиш
    pub fn combination_id(&self) -> String {
        let modifiers = self.modifiers.relevant();
        if modifiers.is_empty() {
            format!("{}", self.keycode.value())
        } else {
            format!("{}+{}", modifiers, self.keycode.value())
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} (t={})", self.combination_id(), self.state, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevant_strips_locks() {
        let mask = ModMask::MOD4 | ModMask::MOD2 | ModMask::LOCK;
        assert_eq!(mask.relevant(), ModMask::MOD4);
        assert_eq!(ModMask(0x0140).relevant(), ModMask::MOD4);
    }

    #[test]
    fn test_contains() {
        let mask = ModMask::CONTROL | ModMask::MOD1;
        assert!(mask.contains(ModMask::CONTROL));
        assert!(mask.contains(ModMask::NONE));
        assert!(!mask.contains(ModMask::SHIFT | ModMask::CONTROL));
    }

    #[test]
    fn test_x11_mask_conversion() {
        use x11rb::protocol::xproto;

        let mask = xproto::ModMask::from(ModMask::MOD4 | ModMask::LOCK);
        assert_eq!(mask, xproto::ModMask::M4 | xproto::ModMask::LOCK);
        assert_eq!(u16::from(mask), 0x0042);
        assert_eq!((ModMask::MOD4 | ModMask::CONTROL) & !ModMask::CONTROL, ModMask::MOD4);
    }

    #[test]
    fn test_key_event_combination_id() {
        let plain = KeyEvent::press(Keycode::new(42), ModMask::NONE);
        let with_super = KeyEvent::press(Keycode::new(42), ModMask::MOD4 | ModMask::MOD2);

        assert_eq!(plain.combination_id(), "42");
        assert_eq!(with_super.combination_id(), "Mod4+42");
    }
}
