use crate::error::{Result, XatkError};
use crate::events::{Keycode, ModMask, WindowId};
use crate::mappings::ModifierAlias;
use smallvec::SmallVec;
use std::fmt;

/// Последовательность кодов клавиш сочетания (префикс + 1-2 клавиши ярлыка)
pub type KeySequence = SmallVec<[Keycode; 4]>;

/// Одно сочетание клавиш, привязанное к окну
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keybinding {
    modifiers: Vec<String>,
    modmask: ModMask,
    keys: Vec<String>,
    keycodes: KeySequence,
    cyclic: bool,
    target: WindowId,
}

impl Keybinding {
    /// Разобрать последовательность символов: сначала модификаторы, затем клавиши.
    ///
    /// `resolve` переводит имя клавиши в код на текущей клавиатуре.
    /// Циклическое сочетание срабатывает и на отпускание, поэтому две его
    /// последние клавиши обязаны различаться.
    pub fn parse<S, F>(symbols: &[S], resolve: F, target: WindowId, cyclic: bool) -> Result<Self>
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<Keycode>,
    {
        let symbols: Vec<&str> = symbols.iter().map(AsRef::as_ref).collect();
        let joined = symbols.join("+");

        let mut modmask = ModMask::NONE;
        let mut split = symbols.len();
        for (i, symbol) in symbols.iter().enumerate() {
            match ModifierAlias::translate(symbol) {
                Some(mask) => modmask |= mask,
                None => {
                    split = i;
                    break;
                }
            }
        }

        let (modifiers, keys) = symbols.split_at(split);
        if keys.is_empty() {
            return Err(XatkError::InvalidKey {
                keybinding: joined,
                key: None,
            });
        }

        let mut keycodes = KeySequence::new();
        for key in keys {
            match resolve(key) {
                Some(code) => keycodes.push(code),
                None => {
                    return Err(XatkError::InvalidKey {
                        keybinding: joined,
                        key: Some(key.to_string()),
                    })
                }
            }
        }

        if cyclic && keycodes.len() >= 2 && keycodes[keycodes.len() - 1] == keycodes[keycodes.len() - 2] {
            return Err(XatkError::DegenerateCyclic(joined));
        }

        Ok(Self {
            modifiers: modifiers.iter().map(|s| s.to_string()).collect(),
            modmask,
            keys: keys.iter().map(|s| s.to_string()).collect(),
            keycodes,
            cyclic,
            target,
        })
    }

    /// Сочетание прямо из кодов, минуя разбор имён
    #[cfg(test)]
    pub(crate) fn from_codes(modmask: ModMask, codes: &[u8], target: WindowId, cyclic: bool) -> Result<Self> {
        let names: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        let mut binding = Self::parse(&names, |name| name.parse().ok().map(Keycode), target, cyclic)?;
        binding.modmask = modmask;
        binding.modifiers = modmask.to_vec().iter().map(|s| s.to_string()).collect();
        Ok(binding)
    }

    pub fn modmask(&self) -> ModMask {
        self.modmask
    }

    #[cfg(test)]

    pub fn keycodes(&self) -> &[Keycode] {
        &self.keycodes
    }

    /// Код первой клавиши: именно он захватывается у X сервера
    pub fn first_keycode(&self) -> Keycode {
        self.keycodes[0]
    }

    #[cfg(test)]

    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    pub fn target(&self) -> WindowId {
        self.target
    }

    /// Нажатая последовательность ещё может дополниться до этого сочетания
    pub fn matches_partial(&self, keycodes: &[Keycode], modmask: ModMask) -> bool {
        self.modmask == modmask
            && keycodes.len() <= self.keycodes.len()
            && self.keycodes[..keycodes.len()] == *keycodes
    }

    pub fn matches_full(&self, keycodes: &[Keycode], modmask: ModMask) -> bool {
        self.modmask == modmask && *self.keycodes == *keycodes
    }

    /// Полное совпадение или совпадение без последней клавиши (одиночное нажатие)
    pub fn matches_cyclic(&self, keycodes: &[Keycode], modmask: ModMask) -> bool {
        self.cyclic
            && self.modmask == modmask
            && (*self.keycodes == *keycodes || self.keycodes[..self.keycodes.len() - 1] == *keycodes)
    }

    /// Могут ли два сочетания оказаться неразличимыми.
    ///
    /// Конфликтуют: `mod+a` и `mod+a`; `mod+ab` и `mod+abb`;
    /// `mod+a` (не циклическое) и `mod+ab` (циклическое).
    /// Не конфликтуют: `mod+a` и `mod2+a`; `mod+a` и `mod+ab`; `mod+ab` и `mod+abc`.
    pub fn collides_with(&self, other: &Keybinding) -> bool {
        if self.modmask != other.modmask {
            return false;
        }
        if self.keycodes == other.keycodes {
            return true;
        }

        let (long, short) = if self.keycodes.len() > other.keycodes.len() {
            (self, other)
        } else {
            (other, self)
        };
        let min_len = short.keycodes.len();

        if !short.cyclic && long.cyclic && long.keycodes[..long.keycodes.len() - 1] == *short.keycodes {
            return true;
        }

        long.keycodes.len() != min_len
            && long.keycodes[..min_len] == *short.keycodes
            && long.keycodes[min_len - 1] == long.keycodes[min_len]
    }
}

impl fmt::Display for Keybinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self
            .modifiers
            .iter()
            .chain(self.keys.iter())
            .map(String::as_str)
            .collect();
        write!(f, "{}", parts.join("+"))
    }
}
