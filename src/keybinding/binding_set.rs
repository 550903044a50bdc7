use crate::error::{Result, XatkError};
use crate::events::{Keycode, ModMask};
use std::fmt;

use super::binding::Keybinding;

/// Идентификатор сочетания внутри `BindingSet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Результат поиска по началу последовательности
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialMatch<'a> {
    None,
    Unique(BindingId, &'a Keybinding),
    Ambiguous,
}

/// Все активные сочетания. Никакие два из них не конфликтуют.
#[derive(Debug, Default)]
pub struct BindingSet {
    // Порядок вставки важен для циклического перебора
    entries: Vec<(BindingId, Keybinding)>,
    // Последнее сработавшее циклическое сочетание
    marker: Option<BindingId>,
    next_id: u64,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Keybinding)> {
        self.entries.iter().map(|(id, kb)| (*id, kb))
    }

    /// Добавить сочетание, если оно не конфликтует ни с одним из имеющихся
    pub fn add(&mut self, binding: Keybinding) -> Result<BindingId> {
        if let Some((_, existing)) = self.entries.iter().find(|(_, kb)| kb.collides_with(&binding)) {
            return Err(XatkError::Collision {
                binding: binding.to_string(),
                existing: existing.to_string(),
            });
        }

        self.next_id += 1;
        let id = BindingId(self.next_id);
        self.entries.push((id, binding));
        Ok(id)
    }

    pub fn remove(&mut self, id: BindingId) -> Option<Keybinding> {
        let position = self.entries.iter().position(|(i, _)| *i == id)?;
        if self.marker == Some(id) {
            self.marker = None;
        }
        Some(self.entries.remove(position).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.marker = None;
    }

    pub fn set_marker(&mut self, id: BindingId) {
        self.marker = Some(id);
    }

    pub fn reset_marker(&mut self) {
        self.marker = None;
    }

    #[cfg(test)]

    pub fn marker(&self) -> Option<BindingId> {
        self.marker
    }

    pub fn find_partial(&self, keycodes: &[Keycode], modmask: ModMask) -> PartialMatch<'_> {
        let mut found = PartialMatch::None;
        for (id, kb) in &self.entries {
            if kb.matches_partial(keycodes, modmask) {
                if let PartialMatch::Unique(..) = found {
                    return PartialMatch::Ambiguous;
                }
                found = PartialMatch::Unique(*id, kb);
            }
        }
        found
    }

    pub fn find_full(&self, keycodes: &[Keycode], modmask: ModMask) -> Option<(BindingId, &Keybinding)> {
        self.iter().find(|(_, kb)| kb.matches_full(keycodes, modmask))
    }

    /// Первое подходящее циклическое сочетание после маркера,
    /// иначе первое подходящее вообще
    pub fn find_cyclic(&self, keycodes: &[Keycode], modmask: ModMask) -> Option<(BindingId, &Keybinding)> {
        let mut first = None;
        let mut marker_found = false;
        for (id, kb) in self.iter() {
            if !kb.matches_cyclic(keycodes, modmask) {
                continue;
            }
            if first.is_none() {
                first = Some((id, kb));
            }
            if marker_found {
                return Some((id, kb));
            }
            if self.marker == Some(id) {
                marker_found = true;
            }
        }
        first
    }
}
