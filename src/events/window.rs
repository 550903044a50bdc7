use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор окна X11
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Информация об окне, прочитанная у X сервера
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
    pub class: String,
    /// Лидер группы из WM_HINTS
    pub group_leader: Option<WindowId>,
}

impl WindowInfo {
    pub fn new(id: WindowId, title: String) -> Self {
        Self {
            id,
            title,
            class: String::new(),
            group_leader: None,
        }
    }

    pub fn with_class(mut self, class: String) -> Self {
        self.class = class;
        self
    }

    pub fn with_group_leader(mut self, leader: WindowId) -> Self {
        self.group_leader = Some(leader);
        self
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.class.is_empty() {
            write!(f, "\"{}\" [{}]", self.title, self.id)
        } else {
            write!(f, "\"{}\" ({}) [{}]", self.title, self.class, self.id)
        }
    }
}

/// Событие списка окон
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Изменился _NET_CLIENT_LIST
    ListChanged,
    /// Изменился _NET_WM_NAME или WM_NAME окна
    NameChanged(WindowId),
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowEvent::ListChanged => write!(f, "ListChanged"),
            WindowEvent::NameChanged(id) => write!(f, "NameChanged({})", id),
        }
    }
}
