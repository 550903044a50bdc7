use crate::config::{Config, GroupBy};
use crate::error::{Result, XatkError};
use crate::events::{DisplayEvent, WindowEvent, WindowId};
use crate::keybinding::BindingId;
use crate::services::key_binder::KeybindingEngine;
use crate::services::keyboard_listener::Activation;
use crate::shortcuts::{History, Rules, Shortcut, ShortcutGenerator, ShortcutOutcome};
use crate::xatk_error;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::title::TitleFormat;
use super::window::{GroupId, Window, WindowList};

/// Почему окно осталось без ярлыка, хотя клавиши ещё есть
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKind {
    InvalidKey,
    Collision,
}

/// Результат назначения ярлыка окну
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Assigned(Shortcut),
    Exhausted,
    Invalid(InvalidKind),
}

/// Следит за списком окон, назначает ярлыки и оформляет заголовки
pub struct WindowManager {
    config: Arc<Config>,
    engine: KeybindingEngine,
    generator: ShortcutGenerator,
    history: History,
    rules: Rules,
    windows: WindowList,
    title_format: Option<TitleFormat>,
    prefix: Vec<String>,
}

impl WindowManager {
    pub fn new(config: Arc<Config>, engine: KeybindingEngine, rules: Rules, history: History) -> Result<Self> {
        let title_format = config.title_format().map(TitleFormat::new).transpose()?;
        let prefix = config.prefix_symbols();
        info!(
            "Инициализация WindowManager: префикс {:?}, раскладка {:?}, группировка {:?}",
            prefix, config.settings.keyboard_layout, config.settings.group_windows_by
        );

        Ok(Self {
            generator: ShortcutGenerator::new(config.settings.keyboard_layout),
            config,
            engine,
            history,
            rules,
            windows: WindowList::new(),
            title_format,
            prefix,
        })
    }

    #[cfg(test)]

    pub fn windows(&self) -> &WindowList {
        &self.windows
    }

    #[cfg(test)]

    pub fn history(&self) -> &History {
        &self.history
    }

    #[cfg(test)]

    pub fn engine(&self) -> &KeybindingEngine {
        &self.engine
    }

    /// Назначить ярлыки уже открытым окнам
    pub fn start(&mut self) -> Result<()> {
        self.on_window_list_changed()?;
        info!("Отслеживается окон: {}", self.windows.len());
        Ok(())
    }

    pub fn handle_event(&mut self, event: DisplayEvent) -> Result<()> {
        match event {
            DisplayEvent::Key(key) => {
                if let Some(activation) = self.engine.handle_key_event(&key)? {
                    self.activate(activation);
                }
            }
            DisplayEvent::Window(WindowEvent::ListChanged) => self.on_window_list_changed()?,
            DisplayEvent::Window(WindowEvent::NameChanged(id)) => self.on_window_name_changed(id),
        }
        Ok(())
    }

    pub fn on_window_list_changed(&mut self) -> Result<()> {
        let current: BTreeSet<WindowId> = self.engine.display().window_list()?.into_iter().collect();
        let known: BTreeSet<WindowId> = self.windows.ids().collect();

        for &id in current.difference(&known) {
            debug!("Новое окно {}", id);
            if let Err(e) = self.on_window_create(id) {
                if e.is_fatal() {
                    return Err(e);
                }
                error!("Не удалось обработать новое окно {}: {}", id, e);
            }
        }

        let closed: Vec<WindowId> = known.difference(&current).copied().collect();
        if !closed.is_empty() {
            debug!("Закрыты окна: {:?}", closed);
            self.on_windows_close(&closed)?;
        }
        Ok(())
    }

    pub fn on_window_name_changed(&mut self, id: WindowId) {
        match self.windows.get(id) {
            Some(window) => {
                let shortcut = window.shortcut;
                self.update_window_name(id, shortcut);
            }
            // Уведомление может прийти уже после закрытия окна
            None => debug!("Изменился заголовок неотслеживаемого окна {}", id),
        }
    }

    fn on_window_create(&mut self, id: WindowId) -> Result<()> {
        let info = match self.engine.display().window_info(id) {
            Ok(info) => info,
            Err(XatkError::VanishedWindow(_)) => {
                warn!("Окно {} исчезло до чтения его свойств", id);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // Оформление, оставшееся от прошлого запуска
        let (name, stale) = self
            .title_format
            .as_ref()
            .and_then(|format| format.parse(&info.title))
            .unwrap_or_else(|| (info.title.clone(), Shortcut::none()));
        let awn = self.rules.awn(&info.class, &name);

        let group = match self.config.settings.group_windows_by {
            GroupBy::Group => info.group_leader.map(GroupId::from_leader),
            GroupBy::Awn => self.windows.group_by_awn(&awn),
            GroupBy::None => None,
        };
        let group = group.unwrap_or_else(|| self.windows.unique_group());
        let new_awn = !self.windows.has_awn(&awn);

        self.windows.insert(Window::new(id, group, &awn, name, info.class));
        let assignment = self.assign_shortcut(id)?;
        if let Some(window) = self.windows.get(id) {
            info!("Новое окно: {}", window);
        }

        if let Assignment::Assigned(shortcut) = assignment {
            if new_awn {
                if let Some(base) = shortcut.base() {
                    self.history.update(&awn, base);
                    self.save_history();
                }
            }
            self.update_window_name(id, stale);
            if let Err(e) = self.engine.display().listen_window_name(id) {
                warn!("Не удалось подписаться на заголовок окна {}: {}", id, e);
            }
        }
        Ok(())
    }

    fn on_windows_close(&mut self, ids: &[WindowId]) -> Result<()> {
        // Группы, потерявшие лидера, и их базовые клавиши
        let mut orphaned: BTreeMap<GroupId, char> = BTreeMap::new();

        for &id in ids {
            let Some(closed) = self.windows.remove(id) else {
                continue;
            };
            if let Some(binding) = closed.binding {
                self.unbind(binding);
            }
            info!("Окно '{}' ({}) отвязано от '{}'", closed.name, closed.id, closed.shortcut);
            if closed.shortcut.is_base_only() {
                if let Some(base) = closed.shortcut.base() {
                    orphaned.insert(closed.group, base);
                }
            }
        }

        for (group, base) in orphaned {
            if let Err(e) = self.rebind_group(group, base) {
                if e.is_fatal() {
                    return Err(e);
                }
                error!("Не удалось перепривязать группу {}: {}", group, e);
            }
        }
        Ok(())
    }

    /// Лидером становится окно с наименьшим id и сохраняет базовую клавишу,
    /// остальные окна группы получают ярлыки заново
    fn rebind_group(&mut self, group: GroupId, base: char) -> Result<()> {
        let members = self.windows.group_members(group);
        let Some((&leader, siblings)) = members.split_first() else {
            return Ok(());
        };

        for &id in &members {
            let binding = match self.windows.get_mut(id) {
                Some(window) => {
                    window.previous_shortcut = Some(window.shortcut);
                    window.shortcut = Shortcut::none();
                    window.binding.take()
                }
                None => None,
            };
            if let Some(binding) = binding {
                self.unbind(binding);
            }
        }

        let leader_shortcut = Shortcut::base_only(base);
        match self.bind(leader, leader_shortcut) {
            Ok(binding) => {
                if let Some(window) = self.windows.get_mut(leader) {
                    window.shortcut = leader_shortcut;
                    window.binding = Some(binding);
                }
            }
            Err(e) => {
                warn!("Не удалось оставить '{}' новому лидеру {}: {}", base, leader, e);
                self.assign_shortcut(leader)?;
            }
        }
        if let Some(window) = self.windows.get(leader) {
            if let Some(base) = window.shortcut.base() {
                let awn = window.awn.clone();
                self.history.update(&awn, base);
                self.save_history();
            }
        }
        self.finish_rebind(leader);

        for &sibling in siblings {
            self.assign_shortcut(sibling)?;
            self.finish_rebind(sibling);
        }
        Ok(())
    }

    fn finish_rebind(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(id) else {
            return;
        };
        let previous = window.previous_shortcut.take().unwrap_or_default();
        info!("Перепривязка: {} -> {}", previous, window.shortcut);
        self.update_window_name(id, previous);
    }

    /// Подобрать и захватить ярлык; занятые другой программой базы исключаются
    pub fn assign_shortcut(&mut self, id: WindowId) -> Result<Assignment> {
        loop {
            let window = self
                .windows
                .get(id)
                .ok_or_else(|| xatk_error!(internal, "Окно {} не отслеживается", id))?;

            let shortcut = match self.generator.new_shortcut(window, &self.windows, &self.history) {
                ShortcutOutcome::Assigned(shortcut) => shortcut,
                ShortcutOutcome::Exhausted => {
                    info!("Слишком много окон, слишком мало клавиш: {} без ярлыка", id);
                    return Ok(self.leave_unassigned(id, Assignment::Exhausted));
                }
            };

            match self.bind(id, shortcut) {
                Ok(binding) => {
                    if let Some(window) = self.windows.get_mut(id) {
                        window.shortcut = shortcut;
                        window.binding = Some(binding);
                        info!("Окно '{}' ({}) привязано к '{}'", window.awn, id, shortcut);
                    }
                    return Ok(Assignment::Assigned(shortcut));
                }
                Err(e) if e.forbids_base() => {
                    info!("{}", e);
                    let Some(base) = shortcut.base() else {
                        return Ok(self.leave_unassigned(id, Assignment::Exhausted));
                    };
                    if !self.generator.forbid(base) {
                        // База группы уже запрещена: другого ярлыка генератор не предложит
                        warn!("Ярлык '{}' для {} невозможен", shortcut, id);
                        return Ok(self.leave_unassigned(id, Assignment::Exhausted));
                    }
                }
                Err(XatkError::InvalidKey { keybinding, key }) => {
                    // Клавиши ярлыка нет на клавиатуре: исключить её и подобрать другую
                    let missing = key
                        .as_deref()
                        .filter(|key| shortcut.key_names().iter().any(|name| name == key))
                        .and_then(|key| key.chars().next());
                    match missing {
                        Some(missing) if self.generator.forbid_key(missing) => {
                            info!("Клавиши '{}' нет на клавиатуре, сочетание '{}' пропущено", missing, keybinding);
                        }
                        _ => {
                            warn!("Сочетание '{}': неверная клавиша {:?}", keybinding, key);
                            return Ok(self.leave_unassigned(id, Assignment::Invalid(InvalidKind::InvalidKey)));
                        }
                    }
                }
                Err(e @ XatkError::Collision { .. }) => {
                    error!("{}", e);
                    return Ok(self.leave_unassigned(id, Assignment::Invalid(InvalidKind::Collision)));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn leave_unassigned(&mut self, id: WindowId, outcome: Assignment) -> Assignment {
        if let Some(window) = self.windows.get_mut(id) {
            window.shortcut = Shortcut::none();
            window.binding = None;
        }
        outcome
    }

    fn bind(&mut self, id: WindowId, shortcut: Shortcut) -> Result<BindingId> {
        let symbols: Vec<String> = self
            .prefix
            .iter()
            .cloned()
            .chain(shortcut.key_names())
            .collect();
        let binding = self.engine.keybinding(&symbols, id, true)?;
        self.engine.bind(binding)
    }

    fn unbind(&mut self, binding: BindingId) {
        if let Err(e) = self.engine.unbind(binding) {
            warn!("Не удалось освободить сочетание {}: {}", binding, e);
        }
    }

    /// Вписать ярлык в заголовок окна.
    ///
    /// `previous` - ярлык, с которым заголовок мог быть оформлен раньше;
    /// собственное оформление снимается, чтобы не реагировать на свои же переименования.
    fn update_window_name(&mut self, id: WindowId, previous: Shortcut) {
        let Some(format) = &self.title_format else {
            return;
        };
        let title = match self.engine.display().window_name(id) {
            Ok(title) => title,
            Err(e) => {
                warn!("Не удалось прочитать заголовок окна {}: {}", id, e);
                return;
            }
        };
        let Some(window) = self.windows.get_mut(id) else {
            return;
        };

        let name = match format.strip(&title, &previous) {
            Some(name) if name == window.name && previous == window.shortcut => return,
            Some(name) => name,
            None => title.clone(),
        };
        if name != window.name {
            info!("Заголовок окна {} изменился: '{}' -> '{}'", id, window.name, name);
        }
        window.name = name;

        let decorated = if window.shortcut.is_empty() {
            window.name.clone()
        } else {
            format.decorate(&window.name, &window.shortcut)
        };
        if decorated != title {
            if let Err(e) = self.engine.display().set_window_name(id, &decorated) {
                warn!("Не удалось изменить заголовок окна {}: {}", id, e);
            }
        }
    }

    fn activate(&mut self, activation: Activation) {
        info!("Активация окна {} ({})", activation.target, activation.binding);
        let action = self.config.settings.desktop_action;
        if let Err(e) = self
            .engine
            .display()
            .activate_window(activation.target, action, activation.time)
        {
            warn!("Не удалось активировать окно {}: {}", activation.target, e);
        }
    }

    pub fn save_history(&self) {
        if let Err(e) = self.history.save() {
            error!("Не удалось записать историю: {}", e);
        }
    }

    /// Освободить все захваты и записать историю
    pub fn shutdown(&mut self) -> Result<()> {
        self.save_history();
        self.engine.unbind_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DesktopAction, RuleConfig, RuleProperty};
    use crate::events::{KeyEvent, ModMask};
    use crate::services::display::{DisplayServer, DryRunDisplay};

    fn manager_with(config: Config, display: &Arc<DryRunDisplay>) -> WindowManager {
        let rules = Rules::compile(&config.rules).unwrap();
        let engine = KeybindingEngine::new(display.clone());
        let history = History::new(config.history.length);
        WindowManager::new(Arc::new(config), engine, rules, history).unwrap()
    }

    fn manager(display: &Arc<DryRunDisplay>) -> WindowManager {
        manager_with(Config::default(), display)
    }

    fn shortcut_of(manager: &WindowManager, id: WindowId) -> String {
        manager.windows().get(id).unwrap().shortcut.to_string()
    }

    #[test]
    fn test_xterm_group_scenario() {
        let display = Arc::new(DryRunDisplay::new());
        let first = display.open_window("XTerm", "bash");
        let second = display.open_window("XTerm", "htop");
        let third = display.open_window("XTerm", "vim");
        let mut manager = manager(&display);
        manager.start().unwrap();

        assert_eq!(shortcut_of(&manager, first), "x");
        assert_eq!(shortcut_of(&manager, second), "xc");
        assert_eq!(shortcut_of(&manager, third), "xv");
        assert_eq!(display.title(first).unwrap(), "bash   /x/");
        assert_eq!(display.title(third).unwrap(), "vim   /xv/");
        assert_eq!(manager.history().get("xterm"), Some('x'));
        assert!(display.is_listened(second));
        // Вся группа на одной захваченной клавише
        assert_eq!(display.grab_count(), 1);
    }

    #[test]
    fn test_one_leader_per_group() {
        let display = Arc::new(DryRunDisplay::new());
        for (class, title) in [("XTerm", "a"), ("Firefox", "b"), ("XTerm", "c"), ("Firefox", "d"), ("Gimp", "e")] {
            display.open_window(class, title);
        }
        let mut manager = manager(&display);
        manager.start().unwrap();

        let mut groups: BTreeMap<GroupId, Vec<Shortcut>> = BTreeMap::new();
        for window in manager.windows().iter() {
            groups.entry(window.group).or_default().push(window.shortcut);
        }
        assert_eq!(groups.len(), 3);
        for shortcuts in groups.values() {
            let leaders: Vec<_> = shortcuts.iter().filter(|s| s.is_base_only()).collect();
            assert_eq!(leaders.len(), 1);
            let base = leaders[0].base();
            assert!(shortcuts.iter().all(|s| s.base() == base));
        }
    }

    #[test]
    fn test_leader_close_rebinds_group() {
        let display = Arc::new(DryRunDisplay::new());
        let leader = display.open_window("XTerm", "bash");
        let second = display.open_window("XTerm", "htop");
        let third = display.open_window("XTerm", "vim");
        let mut manager = manager(&display);
        manager.start().unwrap();

        display.close_window(leader);
        manager.handle_event(WindowEvent::ListChanged.into()).unwrap();

        assert_eq!(shortcut_of(&manager, second), "x");
        assert_eq!(shortcut_of(&manager, third), "xc");
        assert_eq!(display.title(second).unwrap(), "htop   /x/");
        assert_eq!(display.title(third).unwrap(), "vim   /xc/");
        assert!(manager.windows().iter().all(|w| w.previous_shortcut.is_none()));
        assert_eq!(manager.engine().bindings().len(), 2);
    }

    #[test]
    fn test_sibling_close_keeps_others() {
        let display = Arc::new(DryRunDisplay::new());
        let leader = display.open_window("XTerm", "bash");
        let second = display.open_window("XTerm", "htop");
        let third = display.open_window("XTerm", "vim");
        let mut manager = manager(&display);
        manager.start().unwrap();

        display.close_window(second);
        manager.on_window_list_changed().unwrap();

        assert_eq!(shortcut_of(&manager, leader), "x");
        assert_eq!(shortcut_of(&manager, third), "xv");
        assert_eq!(manager.engine().bindings().len(), 2);
    }

    #[test]
    fn test_grab_conflict_forbids_base() {
        let display = Arc::new(DryRunDisplay::new());
        display.occupy_key("x");
        let id = display.open_window("XTerm", "bash");
        let mut manager = manager(&display);
        manager.start().unwrap();

        assert_eq!(shortcut_of(&manager, id), "t");
        assert_eq!(display.title(id).unwrap(), "bash   /t/");
    }

    #[test]
    fn test_missing_key_is_replaced() {
        let display = Arc::new(DryRunDisplay::new());
        display.remove_key("x");
        let first = display.open_window("XTerm", "bash");
        let second = display.open_window("XTerm", "htop");
        let mut manager = manager(&display);
        manager.start().unwrap();

        assert_eq!(shortcut_of(&manager, first), "t");
        assert_eq!(shortcut_of(&manager, second), "ty");
        assert_eq!(display.title(first).unwrap(), "bash   /t/");
    }

    #[test]
    fn test_degenerate_cyclic_prefix_key() {
        let display = Arc::new(DryRunDisplay::new());
        let first = display.open_window("XTerm", "bash");
        let second = display.open_window("XTerm", "htop");
        let mut config = Config::default();
        config.settings.prefix = "Super+x".to_string();
        let mut manager = manager_with(config, &display);
        manager.start().unwrap();

        // Super+x+x недопустимо: база 'x' исключается
        assert_eq!(shortcut_of(&manager, first), "t");
        assert_eq!(shortcut_of(&manager, second), "ty");
        assert_eq!(display.grab_count(), 1);
    }

    #[test]
    fn test_group_suffix_on_forbidden_base_gives_up() {
        let display = Arc::new(DryRunDisplay::new());
        // 'c' и 'x' на одной клавише: Super+x+c вырождается
        display.alias_key("c", "x");
        let first = display.open_window("XTerm", "bash");
        let second = display.open_window("XTerm", "htop");
        let mut manager = manager(&display);
        manager.start().unwrap();

        assert_eq!(shortcut_of(&manager, first), "x");
        assert_eq!(shortcut_of(&manager, second), "");
        assert!(manager.windows().contains(second));
        assert_eq!(manager.engine().bindings().len(), 1);
    }

    #[test]
    fn test_vanished_window_skipped() {
        let display = Arc::new(DryRunDisplay::new());
        let ghost = display.open_ghost_window();
        let id = display.open_window("Firefox", "Start page");
        let mut manager = manager(&display);
        manager.start().unwrap();

        assert!(!manager.windows().contains(ghost));
        assert_eq!(shortcut_of(&manager, id), "f");
    }

    #[test]
    fn test_failed_window_does_not_stop_list_update() {
        let display = Arc::new(DryRunDisplay::new());
        let kept = display.open_window("XTerm", "bash");
        let closed = display.open_window("Firefox", "Start page");
        let mut manager = manager(&display);
        manager.start().unwrap();

        let broken = display.open_window("Gimp", "image");
        display.break_window(broken);
        let fine = display.open_window("Emacs", "*scratch*");
        display.close_window(closed);
        manager.handle_event(WindowEvent::ListChanged.into()).unwrap();

        assert!(!manager.windows().contains(broken));
        assert!(!manager.windows().contains(closed));
        assert_eq!(shortcut_of(&manager, kept), "x");
        assert_eq!(shortcut_of(&manager, fine), "e");
        assert_eq!(manager.engine().bindings().len(), 2);
    }

    #[test]
    fn test_exhausted_window_stays_untitled() {
        let display = Arc::new(DryRunDisplay::new());
        for c in 'a'..='z' {
            display.occupy_key(&c.to_string());
        }
        let id = display.open_window("XTerm", "bash");
        let mut manager = manager(&display);
        manager.start().unwrap();

        assert!(manager.windows().contains(id));
        assert_eq!(shortcut_of(&manager, id), "");
        assert_eq!(display.title(id).unwrap(), "bash");
        assert_eq!(manager.assign_shortcut(id).unwrap(), Assignment::Exhausted);
    }

    #[test]
    fn test_invalid_prefix_key() {
        let display = Arc::new(DryRunDisplay::new());
        let id = display.open_window("XTerm", "bash");
        let mut config = Config::default();
        config.settings.prefix = "Super+F1".to_string();
        let mut manager = manager_with(config, &display);
        manager.start().unwrap();

        assert_eq!(
            manager.assign_shortcut(id).unwrap(),
            Assignment::Invalid(InvalidKind::InvalidKey)
        );
        assert_eq!(display.grab_count(), 0);
    }

    #[test]
    fn test_rename_is_idempotent() {
        let display = Arc::new(DryRunDisplay::new());
        let id = display.open_window("Firefox", "Start page");
        let mut manager = manager(&display);
        manager.start().unwrap();
        assert_eq!(display.title(id).unwrap(), "Start page   /f/");

        // Уведомление о нашем собственном переименовании
        manager.handle_event(WindowEvent::NameChanged(id).into()).unwrap();
        assert_eq!(display.title(id).unwrap(), "Start page   /f/");

        // Приложение сменило заголовок
        display.rename_window(id, "Rust docs");
        manager.handle_event(WindowEvent::NameChanged(id).into()).unwrap();
        assert_eq!(display.title(id).unwrap(), "Rust docs   /f/");
        assert_eq!(manager.windows().get(id).unwrap().name, "Rust docs");
    }

    #[test]
    fn test_leftover_decoration_is_stripped() {
        let display = Arc::new(DryRunDisplay::new());
        let id = display.open_window("Firefox", "Start page   /q/");
        let mut manager = manager(&display);
        manager.start().unwrap();

        assert_eq!(manager.windows().get(id).unwrap().name, "Start page");
        assert_eq!(display.title(id).unwrap(), "Start page   /f/");
    }

    #[test]
    fn test_title_format_none() {
        let display = Arc::new(DryRunDisplay::new());
        let id = display.open_window("Firefox", "Start page");
        let mut config = Config::default();
        config.settings.title_format = "None".to_string();
        let mut manager = manager_with(config, &display);
        manager.start().unwrap();

        assert_eq!(shortcut_of(&manager, id), "f");
        assert_eq!(display.title(id).unwrap(), "Start page");
    }

    #[test]
    fn test_rules_and_history() {
        let display = Arc::new(DryRunDisplay::new());
        let id = display.open_window("Gnome-terminal", "bash");
        let mut config = Config::default();
        config.rules.push(RuleConfig {
            property: RuleProperty::Class,
            pattern: "gnome-(.*)".to_string(),
            awn: "$1".to_string(),
        });
        let rules = Rules::compile(&config.rules).unwrap();
        let mut history = History::new(15);
        history.update("terminal", 'm');
        let engine = KeybindingEngine::new(display.clone());
        let mut manager = WindowManager::new(Arc::new(config), engine, rules, history).unwrap();
        manager.start().unwrap();

        let window = manager.windows().get(id).unwrap();
        assert_eq!(window.awn, "terminal");
        assert_eq!(window.shortcut, Shortcut::base_only('m'));
    }

    #[test]
    fn test_group_by_wm_hints() {
        let display = Arc::new(DryRunDisplay::new());
        let leader = display.open_window("Gimp", "image");
        let toolbox = display.open_grouped_window("Gimp-toolbox", "Toolbox", leader);
        let dock = display.open_grouped_window("Gimp-dock", "Layers", leader);
        let other = display.open_window("Gimp", "other image");
        let mut config = Config::default();
        config.settings.group_windows_by = GroupBy::Group;
        let mut manager = manager_with(config, &display);
        manager.start().unwrap();

        // Сам лидер без WM_HINTS: отдельная группа
        assert_eq!(shortcut_of(&manager, leader), "g");
        assert_eq!(shortcut_of(&manager, toolbox), "i");
        assert_eq!(shortcut_of(&manager, dock), "iu");
        assert_eq!(shortcut_of(&manager, other), "m");
    }

    #[test]
    fn test_key_press_activates_window() {
        let display = Arc::new(DryRunDisplay::new());
        let id = display.open_window("Firefox", "Start page");
        let mut config = Config::default();
        config.settings.desktop_action = DesktopAction::MoveWindow;
        let mut manager = manager_with(config, &display);
        manager.start().unwrap();

        let f = display.keycode("f").unwrap();
        manager.handle_event(KeyEvent::press(f, ModMask::MOD4).into()).unwrap();
        manager.handle_event(KeyEvent::release(f, ModMask::NONE).into()).unwrap();

        assert_eq!(display.activations(), vec![id]);
        assert_eq!(display.last_desktop_action(), Some(DesktopAction::MoveWindow));
        assert!(!display.is_keyboard_grabbed());
    }

    #[test]
    fn test_shutdown_releases_grabs() {
        let display = Arc::new(DryRunDisplay::new());
        display.open_window("XTerm", "bash");
        display.open_window("Firefox", "Start page");
        let mut manager = manager(&display);
        manager.start().unwrap();
        assert_eq!(display.grab_count(), 2);

        manager.shutdown().unwrap();
        assert_eq!(display.grab_count(), 0);
    }
}
