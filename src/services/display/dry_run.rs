use crate::config::DesktopAction;
use crate::error::{Result, XatkError};
use crate::events::{DisplayEvent, Keycode, ModMask, WindowEvent, WindowId, WindowInfo};
use crate::mappings::KeyNameToKeysym;
use crate::xatk_error;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::info;

use super::r#trait::{DisplayServer, EventSourceTrait};

// Модификаторы эмулируемой клавиатуры
const MODIFIER_KEYS: &[(&str, u8, ModMask)] = &[
    ("Shift_L", 200, ModMask::SHIFT),
    ("Control_L", 201, ModMask::CONTROL),
    ("Alt_L", 202, ModMask::MOD1),
    ("Super_L", 203, ModMask::MOD4),
];

#[derive(Debug, Default)]
struct DryRunState {
    windows: BTreeMap<WindowId, WindowInfo>,
    grabs: BTreeSet<(u8, u16)>,
    // Клавиши, захваченные «другой программой»
    foreign_grabs: HashSet<u8>,
    keyboard_grabbed: bool,
    held: HashSet<Keycode>,
    activations: Vec<(WindowId, DesktopAction)>,
    listened: HashSet<WindowId>,
    // Имена клавиш с подменённым кодом; None - клавиши нет
    key_overrides: HashMap<String, Option<Keycode>>,
    // Окна в _NET_CLIENT_LIST, закрытые до чтения свойств
    ghosts: BTreeSet<WindowId>,
    // Окна, чтение свойств которых завершается ошибкой
    broken: HashSet<WindowId>,
    next_window: u32,
}

impl DryRunState {
    fn allocate_window(&mut self) -> WindowId {
        self.next_window += 1;
        WindowId(0x0100_0000 + self.next_window)
    }
}

/// X сервер в памяти: для dry-run режима и тестов
#[derive(Debug, Default)]
pub struct DryRunDisplay {
    state: Mutex<DryRunState>,
}

impl DryRunDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demo_windows() -> Self {
        let display = Self::new();
        display.open_window("XTerm", "bash");
        display.open_window("XTerm", "htop");
        display.open_window("Firefox", "Mozilla Firefox");
        display
    }

    /// Открыть окно, вернуть его id
    pub fn open_window(&self, class: &str, title: &str) -> WindowId {
        let mut state = self.state.lock();
        let id = state.allocate_window();
        state.windows.insert(id, WindowInfo::new(id, title.to_string()).with_class(class.to_string()));
        id
    }

    pub fn close_window(&self, window: WindowId) {
        let mut state = self.state.lock();
        state.windows.remove(&window);
        state.listened.remove(&window);
    }
}

// Управление эмулируемым сервером из тестов
#[cfg(test)]
impl DryRunDisplay {
    /// Окно, которое попадает в список окон, но закрывается раньше, чем прочитаны его свойства
    pub fn open_ghost_window(&self) -> WindowId {
        let mut state = self.state.lock();
        let id = state.allocate_window();
        state.ghosts.insert(id);
        id
    }

    /// Чтение свойств окна будет завершаться ошибкой
    pub fn break_window(&self, window: WindowId) {
        self.state.lock().broken.insert(window);
    }

    /// Убрать клавишу с эмулируемой клавиатуры
    pub fn remove_key(&self, key_name: &str) {
        self.state.lock().key_overrides.insert(key_name.to_string(), None);
    }

    /// Клавиша `key_name` получает код клавиши `other`
    pub fn alias_key(&self, key_name: &str, other: &str) {
        let code = self.keycode(other);
        self.state.lock().key_overrides.insert(key_name.to_string(), code);
    }

    /// Открыть окно с лидером группы из WM_HINTS
    pub fn open_grouped_window(&self, class: &str, title: &str, leader: WindowId) -> WindowId {
        let id = self.open_window(class, title);
        if let Some(info) = self.state.lock().windows.get_mut(&id) {
            info.group_leader = Some(leader);
        }
        id
    }

    /// Окно, которое программа сама переименовала бы
    pub fn rename_window(&self, window: WindowId, title: &str) {
        if let Some(info) = self.state.lock().windows.get_mut(&window) {
            info.title = title.to_string();
        }
    }

    pub fn title(&self, window: WindowId) -> Option<String> {
        self.state.lock().windows.get(&window).map(|info| info.title.clone())
    }

    /// Сделать клавишу занятой другой программой
    pub fn occupy_key(&self, key_name: &str) {
        if let Some(code) = self.keycode(key_name) {
            self.state.lock().foreign_grabs.insert(code.value());
        }
    }

    pub fn is_grabbed(&self, keycode: Keycode, modmask: ModMask) -> bool {
        self.state.lock().grabs.contains(&(keycode.value(), modmask.bits()))
    }

    pub fn grab_count(&self) -> usize {
        self.state.lock().grabs.len()
    }

    pub fn is_keyboard_grabbed(&self) -> bool {
        self.state.lock().keyboard_grabbed
    }

    pub fn is_listened(&self, window: WindowId) -> bool {
        self.state.lock().listened.contains(&window)
    }

    /// Физически нажать или отпустить клавишу
    pub fn set_held(&self, keycode: Keycode, held: bool) {
        let mut state = self.state.lock();
        if held {
            state.held.insert(keycode);
        } else {
            state.held.remove(&keycode);
        }
    }

    pub fn activations(&self) -> Vec<WindowId> {
        self.state.lock().activations.iter().map(|(id, _)| *id).collect()
    }

    pub fn last_desktop_action(&self) -> Option<DesktopAction> {
        self.state.lock().activations.last().map(|(_, action)| *action)
    }
}

impl DisplayServer for DryRunDisplay {
    fn grab_key(&self, keycode: Keycode, modmask: ModMask) -> Result<()> {
        let mut state = self.state.lock();
        if state.foreign_grabs.contains(&keycode.value()) {
            return Err(xatk_error!(grab_conflict, "{} {}", modmask, keycode));
        }
        state.grabs.insert((keycode.value(), modmask.bits()));
        Ok(())
    }

    fn ungrab_key(&self, keycode: Keycode, modmask: ModMask) -> Result<()> {
        self.state.lock().grabs.remove(&(keycode.value(), modmask.bits()));
        Ok(())
    }

    fn grab_keyboard(&self) -> Result<()> {
        self.state.lock().keyboard_grabbed = true;
        Ok(())
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.state.lock().keyboard_grabbed = false;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    /// Печатные ASCII символы получают код `keysym - 0x18`, модификаторы 200+
    fn keycode(&self, key_name: &str) -> Option<Keycode> {
        if let Some(&code) = self.state.lock().key_overrides.get(key_name) {
            return code;
        }
        if let Some(&(_, code, _)) = MODIFIER_KEYS.iter().find(|(name, _, _)| *name == key_name) {
            return Some(Keycode(code));
        }
        let keysym = KeyNameToKeysym::translate(key_name).ok()?;
        let ch = char::from_u32(keysym)?.to_ascii_lowercase();
        match ch {
            ' '..='~' => Some(Keycode(ch as u8 - 0x18)),
            _ => None,
        }
    }

    fn modifier_mask(&self, keycode: Keycode) -> ModMask {
        MODIFIER_KEYS
            .iter()
            .find(|&&(_, code, _)| code == keycode.value())
            .map(|&(_, _, mask)| mask)
            .unwrap_or(ModMask::NONE)
    }

    fn is_key_held(&self, keycode: Keycode) -> Result<bool> {
        Ok(self.state.lock().held.contains(&keycode))
    }

    fn key_names(&self) -> Vec<String> {
        (0x21u32..=0x7e)
            .filter(|c| !(0x41..=0x5a).contains(c))
            .filter_map(KeyNameToKeysym::reverse_translate)
            .map(str::to_string)
            .collect()
    }

    fn window_list(&self) -> Result<Vec<WindowId>> {
        let state = self.state.lock();
        Ok(state.windows.keys().chain(state.ghosts.iter()).copied().collect())
    }

    fn window_info(&self, window: WindowId) -> Result<WindowInfo> {
        let state = self.state.lock();
        if state.broken.contains(&window) {
            return Err(xatk_error!(internal, "Свойства окна {} не читаются", window));
        }
        match state.windows.get(&window) {
            Some(info) => Ok(info.clone()),
            None => XatkError::vanished_window(window),
        }
    }

    fn window_name(&self, window: WindowId) -> Result<String> {
        Ok(self.window_info(window)?.title)
    }

    fn set_window_name(&self, window: WindowId, name: &str) -> Result<()> {
        match self.state.lock().windows.get_mut(&window) {
            Some(info) => {
                info.title = name.to_string();
                Ok(())
            }
            None => XatkError::vanished_window(window),
        }
    }

    fn listen_window_name(&self, window: WindowId) -> Result<()> {
        self.state.lock().listened.insert(window);
        Ok(())
    }

    fn activate_window(&self, window: WindowId, action: DesktopAction, _time: u32) -> Result<()> {
        let mut state = self.state.lock();
        if !state.windows.contains_key(&window) {
            return XatkError::vanished_window(window);
        }
        info!("Dry-run: активация окна {} ({:?})", window, action);
        state.activations.push((window, action));
        Ok(())
    }
}

/// Периодически открывает и закрывает эмулируемые окна
pub struct DryRunEventSource {
    display: Arc<DryRunDisplay>,
}

impl DryRunEventSource {
    pub fn new(display: Arc<DryRunDisplay>) -> Self {
        Self { display }
    }
}

#[async_trait::async_trait]
impl EventSourceTrait for DryRunEventSource {
    async fn run(self: Box<Self>, tx: mpsc::Sender<DisplayEvent>) -> Result<()> {
        info!("Dry-run режим - X сервер работает в режиме эмуляции");

        let fake_windows = [
            ("XTerm", "vim - dry_run"),
            ("Gimp", "GNU Image Manipulation Program"),
            ("Emacs", "*scratch*"),
            ("XTerm", "top - dry_run"),
        ];
        let mut opened = Vec::new();
        let mut interval = interval(Duration::from_secs(10));
        let mut step = 0usize;

        loop {
            interval.tick().await;

            if opened.len() < fake_windows.len() {
                let (class, title) = fake_windows[step % fake_windows.len()];
                let id = self.display.open_window(class, title);
                info!("Dry-run: эмулируем открытие окна {} ({})", title, id);
                opened.push(id);
            } else {
                let id = opened.remove(0);
                info!("Dry-run: эмулируем закрытие окна {}", id);
                self.display.close_window(id);
            }
            step += 1;

            if tx.send(WindowEvent::ListChanged.into()).await.is_err() {
                return Err(xatk_error!(internal, "Получатель событий dry-run закрыт"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keycodes() {
        let display = DryRunDisplay::new();
        assert_eq!(display.keycode("a"), Some(Keycode(0x61 - 0x18)));
        assert_eq!(display.keycode("A"), display.keycode("a"));
        assert_eq!(display.keycode("semicolon"), display.keycode(";"));
        assert_eq!(display.keycode("Super_L"), Some(Keycode(203)));
        assert_eq!(display.keycode("F1"), None);
        assert_eq!(display.modifier_mask(Keycode(203)), ModMask::MOD4);
        assert_eq!(display.modifier_mask(Keycode(201)), ModMask::CONTROL);
        assert!(display.modifier_mask(Keycode(0x61 - 0x18)).is_empty());
    }

    #[test]
    fn test_key_overrides() {
        let display = DryRunDisplay::new();
        display.remove_key("x");
        display.alias_key("c", "v");
        assert_eq!(display.keycode("x"), None);
        assert_eq!(display.keycode("c"), display.keycode("v"));
        assert!(display.keycode("z").is_some());
    }

    #[test]
    fn test_ghost_window_vanishes() {
        let display = DryRunDisplay::new();
        let ghost = display.open_ghost_window();
        assert_eq!(display.window_list().unwrap(), vec![ghost]);
        assert!(matches!(display.window_info(ghost), Err(XatkError::VanishedWindow(_))));
    }

    #[test]
    fn test_foreign_grab_conflict() {
        let display = DryRunDisplay::new();
        display.occupy_key("x");
        let x = display.keycode("x").unwrap();

        let err = display.grab_key(x, ModMask::MOD4).unwrap_err();
        assert!(err.forbids_base());
        assert_eq!(display.grab_count(), 0);
    }

    #[test]
    fn test_windows() {
        let display = DryRunDisplay::new();
        let id = display.open_window("XTerm", "bash");
        assert_eq!(display.window_list().unwrap(), vec![id]);

        display.set_window_name(id, "bash   /x/").unwrap();
        assert_eq!(display.window_name(id).unwrap(), "bash   /x/");

        display.close_window(id);
        assert!(matches!(
            display.window_info(id),
            Err(XatkError::VanishedWindow(w)) if w == id
        ));
    }

    #[test]
    fn test_key_names_are_lowercase_printables() {
        let names = DryRunDisplay::new().key_names();
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"slash".to_string()));
        assert!(!names.iter().any(|n| n == "A"));
    }
}
