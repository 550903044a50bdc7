use crate::config::DesktopAction;
use crate::error::{Result, XatkError};
use crate::events::{
    DisplayEvent, KeyEvent, Keycode, Keysym, ModMask, WindowEvent, WindowId, WindowInfo,
};
use crate::mappings::KeyNameToKeysym;
use crate::xatk_error;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ClientMessageEvent, ConnectionExt as _, EventMask,
    GetPropertyReply, GrabMode, GrabStatus, PropMode, Window,
};
use x11rb::protocol::{ErrorKind, Event};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::r#trait::{DisplayServer, EventSourceTrait};

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        _NET_CLIENT_LIST,
        _NET_WM_NAME,
        _NET_ACTIVE_WINDOW,
        _NET_CURRENT_DESKTOP,
        _NET_WM_DESKTOP,
        UTF8_STRING,
    }
}

// Флаг WindowGroupHint в WM_HINTS и индекс поля window_group
const WINDOW_GROUP_HINT: u32 = 1 << 6;
const WINDOW_GROUP_INDEX: usize = 8;
// Источник запроса _NET_ACTIVE_WINDOW / _NET_WM_DESKTOP: пейджер
const SOURCE_PAGER: u32 = 2;

/// Раскладка клавиатуры X сервера
#[derive(Debug, Default)]
struct Keymap {
    keysym_to_keycode: HashMap<Keysym, Keycode>,
    keycode_to_keysym: BTreeMap<Keycode, Keysym>,
    modifiers: HashMap<Keycode, ModMask>,
}

impl Keymap {
    fn load(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let mapping = conn.get_keyboard_mapping(min, max - min + 1)?.reply()?;
        let per_keycode = mapping.keysyms_per_keycode as usize;

        let mut keymap = Keymap::default();
        if per_keycode == 0 {
            return Ok(keymap);
        }

        // Сначала первый столбец всех клавиш: keysym без Shift важнее
        for column in 0..per_keycode {
            for (i, keysyms) in mapping.keysyms.chunks(per_keycode).enumerate() {
                let keysym = keysyms[column];
                if keysym == 0 {
                    continue;
                }
                let keycode = Keycode(min.saturating_add(i as u8));
                keymap.keysym_to_keycode.entry(keysym).or_insert(keycode);
                if column == 0 {
                    keymap.keycode_to_keysym.insert(keycode, keysym);
                }
            }
        }

        // Восемь модификаторов подряд, по keycodes_per_modifier кодов на каждый
        let modifiers = conn.get_modifier_mapping()?.reply()?;
        let per_modifier = (modifiers.keycodes.len() / 8).max(1);
        keymap.modifiers = modifiers
            .keycodes
            .iter()
            .enumerate()
            .filter(|&(_, &code)| code != 0)
            .map(|(i, &code)| (Keycode(code), ModMask(1 << (i / per_modifier))))
            .collect();

        debug!(
            "Загружена раскладка: {} keysym, {} модификаторов",
            keymap.keysym_to_keycode.len(),
            keymap.modifiers.len()
        );
        Ok(keymap)
    }
}

pub struct X11Display {
    conn: Arc<RustConnection>,
    root: Window,
    atoms: Atoms,
    keymap: RwLock<Keymap>,
}

impl X11Display {
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = RustConnection::connect(display)?;
        let root = conn.setup().roots[screen_num].root;
        let atoms = Atoms::new(&conn)?.reply()?;

        // События клавиш приходят через захваты, здесь нужен только _NET_CLIENT_LIST
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?
        .check()?;

        let keymap = Keymap::load(&conn)?;
        info!("Подключение к X серверу установлено (экран {})", screen_num);

        Ok(Self {
            conn: Arc::new(conn),
            root,
            atoms,
            keymap: RwLock::new(keymap),
        })
    }

    fn refresh_keymap(&self) -> Result<()> {
        let keymap = Keymap::load(&self.conn)?;
        *self.keymap.write() = keymap;
        info!("Раскладка клавиатуры обновлена");
        Ok(())
    }

    fn property<P, T>(&self, window: WindowId, property: P, type_: T) -> Result<GetPropertyReply>
    where
        P: Into<Atom>,
        T: Into<Atom>,
    {
        match self
            .conn
            .get_property(false, window.0, property, type_, 0, u32::MAX)?
            .reply()
        {
            Ok(reply) => Ok(reply),
            Err(ReplyError::X11Error(e)) if e.error_kind == ErrorKind::Window => {
                XatkError::vanished_window(window)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn cardinal(&self, window: WindowId, property: Atom) -> Result<Option<u32>> {
        let reply = self.property(window, property, AtomEnum::CARDINAL)?;
        Ok(reply.value32().and_then(|mut values| values.next()))
    }

    fn class(&self, window: WindowId) -> Result<String> {
        let reply = self.property(window, AtomEnum::WM_CLASS, AtomEnum::STRING)?;
        // "instance\0class\0"
        let class = reply
            .value
            .split(|&b| b == 0)
            .nth(1)
            .map(|class| String::from_utf8_lossy(class).into_owned())
            .unwrap_or_default();
        Ok(class)
    }

    fn group_leader(&self, window: WindowId) -> Result<Option<WindowId>> {
        let reply = self.property(window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS)?;
        let hints: Vec<u32> = match reply.value32() {
            Some(values) => values.collect(),
            None => return Ok(None),
        };
        match hints.get(WINDOW_GROUP_INDEX) {
            Some(&group) if hints[0] & WINDOW_GROUP_HINT != 0 && group != 0 => Ok(Some(WindowId(group))),
            _ => Ok(None),
        }
    }

    fn client_message(&self, window: WindowId, message: Atom, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent::new(32, window.0, message, data);
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )?;
        Ok(())
    }

    fn translate(&self, event: Event) -> Result<Option<DisplayEvent>> {
        let translated = match event {
            Event::KeyPress(ev) => Some(DisplayEvent::Key(KeyEvent {
                time: ev.time,
                ..KeyEvent::press(Keycode::new(ev.detail), ModMask(u16::from(ev.state)))
            })),
            Event::KeyRelease(ev) => Some(DisplayEvent::Key(KeyEvent {
                time: ev.time,
                ..KeyEvent::release(Keycode::new(ev.detail), ModMask(u16::from(ev.state)))
            })),
            Event::PropertyNotify(ev) if ev.atom == self.atoms._NET_CLIENT_LIST => {
                Some(WindowEvent::ListChanged.into())
            }
            Event::PropertyNotify(ev)
                if ev.atom == self.atoms._NET_WM_NAME || ev.atom == Atom::from(AtomEnum::WM_NAME) =>
            {
                Some(WindowEvent::NameChanged(WindowId(ev.window)).into())
            }
            Event::MappingNotify(_) => {
                self.refresh_keymap()?;
                None
            }
            Event::Error(e) => {
                // Асинхронные ошибки: обычно окно закрылось раньше, чем мы его переименовали
                debug!("Ошибка X сервера: {:?}", e);
                None
            }
            _ => None,
        };
        Ok(translated)
    }

    /// Блокирующий цикл чтения событий
    fn pump(&self, tx: &mpsc::Sender<DisplayEvent>) -> Result<()> {
        loop {
            let event = self
                .conn
                .wait_for_event()
                .map_err(|e| xatk_error!(connection_lost, "{}", e))?;

            if let Some(event) = self.translate(event)? {
                if tx.blocking_send(event).is_err() {
                    debug!("Получатель событий закрыт, цикл X11 остановлен");
                    return Ok(());
                }
            }
        }
    }
}

impl DisplayServer for X11Display {
    fn grab_key(&self, keycode: Keycode, modmask: ModMask) -> Result<()> {
        for (i, variant) in ModMask::LOCK_VARIANTS.iter().enumerate() {
            let mods = modmask | *variant;
            let result = self
                .conn
                .grab_key(true, self.root, mods.into(), keycode.value(), GrabMode::ASYNC, GrabMode::ASYNC)?
                .check();
            match result {
                Ok(()) => {}
                Err(ReplyError::X11Error(e)) if e.error_kind == ErrorKind::Access => {
                    for done in &ModMask::LOCK_VARIANTS[..i] {
                        self.conn
                            .ungrab_key(keycode.value(), self.root, (modmask | *done).into())?;
                    }
                    return Err(xatk_error!(grab_conflict, "{} {}", modmask, keycode));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn ungrab_key(&self, keycode: Keycode, modmask: ModMask) -> Result<()> {
        for variant in ModMask::LOCK_VARIANTS {
            self.conn
                .ungrab_key(keycode.value(), self.root, (modmask | variant).into())?;
        }
        Ok(())
    }

    fn grab_keyboard(&self) -> Result<()> {
        let reply = self
            .conn
            .grab_keyboard(true, self.root, x11rb::CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        if reply.status != GrabStatus::SUCCESS {
            warn!("Не удалось захватить клавиатуру: {:?}", reply.status);
        }
        Ok(())
    }

    fn ungrab_keyboard(&self) -> Result<()> {
        self.conn.ungrab_keyboard(x11rb::CURRENT_TIME)?;
        self.conn.flush()?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.conn.get_input_focus()?.reply()?;
        Ok(())
    }

    fn keycode(&self, key_name: &str) -> Option<Keycode> {
        let keysym = KeyNameToKeysym::translate(key_name).ok()?;
        self.keymap.read().keysym_to_keycode.get(&keysym).copied()
    }

    fn modifier_mask(&self, keycode: Keycode) -> ModMask {
        self.keymap.read().modifiers.get(&keycode).copied().unwrap_or(ModMask::NONE)
    }

    fn is_key_held(&self, keycode: Keycode) -> Result<bool> {
        let keys = self.conn.query_keymap()?.reply()?.keys;
        let code = keycode.value() as usize;
        Ok(keys[code / 8] & (1 << (code % 8)) != 0)
    }

    fn key_names(&self) -> Vec<String> {
        let keymap = self.keymap.read();
        keymap
            .keycode_to_keysym
            .iter()
            .filter(|(code, _)| !keymap.modifiers.contains_key(*code))
            .filter_map(|(_, &keysym)| KeyNameToKeysym::reverse_translate(keysym))
            .map(str::to_string)
            .collect()
    }

    fn window_list(&self) -> Result<Vec<WindowId>> {
        let reply = self.property(WindowId(self.root), self.atoms._NET_CLIENT_LIST, AtomEnum::WINDOW)?;
        Ok(reply
            .value32()
            .map(|ids| ids.map(WindowId).collect())
            .unwrap_or_default())
    }

    fn window_info(&self, window: WindowId) -> Result<WindowInfo> {
        let mut info = WindowInfo::new(window, self.window_name(window)?).with_class(self.class(window)?);
        if let Some(leader) = self.group_leader(window)? {
            info = info.with_group_leader(leader);
        }
        Ok(info)
    }

    fn window_name(&self, window: WindowId) -> Result<String> {
        let reply = self.property(window, self.atoms._NET_WM_NAME, self.atoms.UTF8_STRING)?;
        if !reply.value.is_empty() {
            return Ok(String::from_utf8_lossy(&reply.value).into_owned());
        }
        let reply = self.property(window, AtomEnum::WM_NAME, AtomEnum::ANY)?;
        Ok(String::from_utf8_lossy(&reply.value).into_owned())
    }

    fn set_window_name(&self, window: WindowId, name: &str) -> Result<()> {
        self.conn.change_property8(
            PropMode::REPLACE,
            window.0,
            self.atoms._NET_WM_NAME,
            self.atoms.UTF8_STRING,
            name.as_bytes(),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn listen_window_name(&self, window: WindowId) -> Result<()> {
        self.conn.change_window_attributes(
            window.0,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        Ok(())
    }

    fn activate_window(&self, window: WindowId, action: DesktopAction, time: u32) -> Result<()> {
        let root = WindowId(self.root);
        match action {
            DesktopAction::SwitchDesktop => {
                if let Some(desktop) = self.cardinal(window, self.atoms._NET_WM_DESKTOP)? {
                    self.client_message(root, self.atoms._NET_CURRENT_DESKTOP, [desktop, time, 0, 0, 0])?;
                }
            }
            DesktopAction::MoveWindow => {
                if let Some(desktop) = self.cardinal(root, self.atoms._NET_CURRENT_DESKTOP)? {
                    self.client_message(window, self.atoms._NET_WM_DESKTOP, [desktop, SOURCE_PAGER, 0, 0, 0])?;
                }
            }
            DesktopAction::None => {}
        }
        self.client_message(window, self.atoms._NET_ACTIVE_WINDOW, [SOURCE_PAGER, time, 0, 0, 0])?;
        self.conn.flush()?;
        Ok(())
    }
}

/// Читает события X сервера в отдельном блокирующем потоке
pub struct X11EventSource {
    display: Arc<X11Display>,
}

impl X11EventSource {
    pub fn new(display: Arc<X11Display>) -> Self {
        Self { display }
    }
}

#[async_trait::async_trait]
impl EventSourceTrait for X11EventSource {
    async fn run(self: Box<Self>, tx: mpsc::Sender<DisplayEvent>) -> Result<()> {
        let display = self.display;
        tokio::task::spawn_blocking(move || display.pump(&tx))
            .await
            .map_err(|e| xatk_error!(internal, "Цикл событий X11 аварийно завершён: {}", e))?
    }
}
