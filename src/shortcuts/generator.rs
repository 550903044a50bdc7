use super::history::History;
use super::layout::{KeyboardLayout, LayoutKind};
use super::shortcut::Shortcut;
use crate::services::window_manager::{Window, WindowList};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Результат подбора ярлыка
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutOutcome {
    Assigned(Shortcut),
    /// Свободных клавиш не осталось
    Exhausted,
}

/// Подбирает ярлыки окнам.
///
/// Первое окно группы получает базовую клавишу (по возможности букву из AWN),
/// остальные окна группы получают базу плюс суффикс, соседнюю клавишу
/// раскладки. Результат зависит только от аргументов и множества
/// запрещённых баз.
#[derive(Debug, Clone)]
pub struct ShortcutGenerator {
    layout: KeyboardLayout,
    forbidden: BTreeSet<char>,
    // Клавиши, которых нет на клавиатуре
    missing: BTreeSet<char>,
}

impl ShortcutGenerator {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            layout: KeyboardLayout::new(kind),
            forbidden: BTreeSet::new(),
            missing: BTreeSet::new(),
        }
    }

    /// Больше не предлагать `base` в этом запуске.
    /// Возвращает false, если клавиша уже была исключена.
    pub fn forbid(&mut self, base: char) -> bool {
        let inserted = self.forbidden.insert(base);
        if inserted {
            debug!("Базовая клавиша '{}' исключена", base);
        }
        inserted
    }

    /// Клавиши нет на текущей клавиатуре: не предлагать её ни базой, ни суффиксом.
    /// Возвращает false, если клавиша уже была исключена.
    pub fn forbid_key(&mut self, key: char) -> bool {
        let inserted = self.missing.insert(key);
        if inserted {
            debug!("Клавиша '{}' отсутствует на клавиатуре", key);
        }
        inserted
    }

    #[cfg(test)]

    pub fn is_forbidden(&self, base: char) -> bool {
        self.forbidden.contains(&base)
    }

    pub fn new_shortcut(&self, window: &Window, windows: &WindowList, history: &History) -> ShortcutOutcome {
        let group_shortcuts = windows.group_shortcuts(window.group, window.id);
        match group_shortcuts.first().and_then(Shortcut::base) {
            Some(base) => match self.next_suffix(base, &group_shortcuts) {
                Some(suffix) => ShortcutOutcome::Assigned(Shortcut::with_suffix(base, suffix)),
                None => ShortcutOutcome::Exhausted,
            },
            None => match self.new_base(window, windows, history) {
                Some(base) => ShortcutOutcome::Assigned(Shortcut::base_only(base)),
                None => ShortcutOutcome::Exhausted,
            },
        }
    }

    /// Обход раскладки от базы в сторону дальнего края ряда
    /// с переходом через конец; возврат к базе означает, что суффиксы кончились
    fn next_suffix(&self, base: char, shortcuts: &[Shortcut]) -> Option<char> {
        let start = self.layout.index_of(base)?;
        let used: HashSet<char> = shortcuts.iter().filter_map(Shortcut::suffix).collect();
        let len = self.layout.len() as isize;
        let dir = self.layout.direction(base);

        let mut index = start as isize;
        loop {
            index = (index + dir).rem_euclid(len);
            if index as usize == start {
                return None;
            }
            let candidate = self.layout.key_at(index as usize);
            if !used.contains(&candidate) && !self.missing.contains(&candidate) {
                return Some(candidate);
            }
        }
    }

    fn new_base(&self, window: &Window, windows: &WindowList, history: &History) -> Option<char> {
        let mut taken = windows.bases(window.id);
        taken.extend(self.forbidden.iter().copied());
        taken.extend(self.missing.iter().copied());

        if let Some(base) = history.get(&window.awn) {
            if !taken.contains(&base) {
                return Some(base);
            }
        }

        // Сначала клавиши, не запомненные в истории за другими AWN
        let mut avoided = taken.clone();
        avoided.extend(history.keys());

        self.free_base(&window.awn, &avoided)
            .or_else(|| self.free_base(&window.awn, &taken))
    }

    fn free_base(&self, awn: &str, taken: &HashSet<char>) -> Option<char> {
        awn.chars()
            .chain(self.layout.keys().iter().copied())
            .find(|c| self.layout.is_alpha(*c) && !taken.contains(c))
    }
}
