use crate::events::WindowId;
use crate::keybinding::BindingId;
use crate::shortcuts::Shortcut;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Идентификатор группы окон.
///
/// Группы из WM_HINTS используют id окна-лидера, уникальные группы
/// выдаются начиная с `UNIQUE_BASE`, чтобы не пересекаться с ними.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u64);

impl GroupId {
    const UNIQUE_BASE: u64 = 1 << 32;

    pub fn from_leader(leader: WindowId) -> Self {
        GroupId(leader.0 as u64)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Окно, которое отслеживает менеджер
#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    pub group: GroupId,
    /// Abstract window name: из него выбирается базовая клавиша
    pub awn: String,
    /// Заголовок окна без нашего оформления
    pub name: String,
    pub class: String,
    pub shortcut: Shortcut,
    /// Ярлык до перепривязки группы; заполнен только на время перепривязки
    pub previous_shortcut: Option<Shortcut>,
    pub binding: Option<BindingId>,
}

impl Window {
    pub fn new(id: WindowId, group: GroupId, awn: &str, name: String, class: String) -> Self {
        Self {
            id,
            group,
            awn: awn.to_lowercase(),
            name,
            class,
            shortcut: Shortcut::none(),
            previous_shortcut: None,
            binding: None,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {}, group: {}, awn: '{}', name: '{}', class: '{}', shortcut: '{}'",
            self.id, self.group, self.awn, self.name, self.class, self.shortcut
        )
    }
}

/// Все отслеживаемые окна, упорядоченные по id
#[derive(Debug, Default)]
pub struct WindowList {
    windows: BTreeMap<WindowId, Window>,
    last_unique_group: u64,
}

impl WindowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[cfg(test)]

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    #[cfg(test)]

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    pub fn insert(&mut self, window: Window) {
        self.windows.insert(window.id, window);
    }

    pub fn remove(&mut self, id: WindowId) -> Option<Window> {
        self.windows.remove(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> {
        self.windows.values()
    }

    /// Группа первого окна с таким AWN
    pub fn group_by_awn(&self, awn: &str) -> Option<GroupId> {
        self.iter().find(|w| w.awn == awn).map(|w| w.group)
    }

    /// Id окон группы по возрастанию
    pub fn group_members(&self, group: GroupId) -> Vec<WindowId> {
        self.iter().filter(|w| w.group == group).map(|w| w.id).collect()
    }

    /// Назначенные ярлыки группы, не считая окна `except`
    pub fn group_shortcuts(&self, group: GroupId, except: WindowId) -> Vec<Shortcut> {
        self.iter()
            .filter(|w| w.group == group && w.id != except && !w.shortcut.is_empty())
            .map(|w| w.shortcut)
            .collect()
    }

    /// Занятые базовые клавиши, не считая окна `except`
    pub fn bases(&self, except: WindowId) -> HashSet<char> {
        self.iter()
            .filter(|w| w.id != except)
            .filter_map(|w| w.shortcut.base())
            .collect()
    }

    pub fn has_awn(&self, awn: &str) -> bool {
        self.iter().any(|w| w.awn == awn)
    }

    pub fn unique_group(&mut self) -> GroupId {
        self.last_unique_group += 1;
        GroupId(GroupId::UNIQUE_BASE + self.last_unique_group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(id: u32, group: u64, awn: &str, shortcut: Shortcut) -> Window {
        let mut w = Window::new(WindowId(id), GroupId(group), awn, awn.to_string(), awn.to_string());
        w.shortcut = shortcut;
        w
    }

    #[test]
    fn test_group_queries() {
        let mut list = WindowList::new();
        list.insert(window(3, 1, "xterm", Shortcut::with_suffix('x', 'c')));
        list.insert(window(1, 1, "xterm", Shortcut::base_only('x')));
        list.insert(window(2, 2, "firefox", Shortcut::base_only('f')));
        list.insert(window(4, 1, "xterm", Shortcut::none()));

        assert_eq!(list.group_members(GroupId(1)), vec![WindowId(1), WindowId(3), WindowId(4)]);
        assert_eq!(list.group_shortcuts(GroupId(1), WindowId(3)), vec![Shortcut::base_only('x')]);
        assert_eq!(list.group_by_awn("firefox"), Some(GroupId(2)));
        assert_eq!(list.group_by_awn("gimp"), None);
        assert_eq!(list.bases(WindowId(2)), HashSet::from(['x']));
    }

    #[test]
    fn test_unique_groups_do_not_clash_with_leaders() {
        let mut list = WindowList::new();
        let a = list.unique_group();
        let b = list.unique_group();
        assert_ne!(a, b);
        assert!(a > GroupId::from_leader(WindowId(u32::MAX)));
    }

    #[test]
    fn test_awn_is_lowercased() {
        let w = Window::new(WindowId(1), GroupId(1), "XTerm", String::new(), String::new());
        assert_eq!(w.awn, "xterm");
    }
}
