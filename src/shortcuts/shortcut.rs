use std::fmt;

/// Ярлык окна: базовая клавиша и необязательный суффикс, 0-2 символа в нижнем регистре
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Shortcut {
    base: Option<char>,
    suffix: Option<char>,
}

impl Shortcut {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn base_only(base: char) -> Self {
        Self {
            base: Some(lower(base)),
            suffix: None,
        }
    }

    pub fn with_suffix(base: char, suffix: char) -> Self {
        Self {
            base: Some(lower(base)),
            suffix: Some(lower(suffix)),
        }
    }

    /// Разобрать строку длиной 0-2
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (None, _, _) => Some(Self::none()),
            (Some(base), None, _) => Some(Self::base_only(base)),
            (Some(base), Some(suffix), None) => Some(Self::with_suffix(base, suffix)),
            _ => None,
        }
    }

    pub fn base(&self) -> Option<char> {
        self.base
    }

    pub fn suffix(&self) -> Option<char> {
        self.suffix
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_none()
    }

    /// Ярлык лидера группы: только базовая клавиша
    pub fn is_base_only(&self) -> bool {
        self.base.is_some() && self.suffix.is_none()
    }

    #[cfg(test)]

    pub fn len(&self) -> usize {
        self.base.iter().chain(self.suffix.iter()).count()
    }

    /// Символы ярлыка как отдельные имена клавиш
    pub fn key_names(&self) -> Vec<String> {
        self.base
            .iter()
            .chain(self.suffix.iter())
            .map(|c| c.to_string())
            .collect()
    }
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(base) = self.base {
            write!(f, "{}", base)?;
        }
        if let Some(suffix) = self.suffix {
            write!(f, "{}", suffix)?;
        }
        Ok(())
    }
}
