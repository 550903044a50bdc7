use crate::config::DesktopAction;
use crate::error::Result;
use crate::events::{DisplayEvent, Keycode, ModMask, WindowId, WindowInfo};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Сеанс работы с X сервером: захват клавиш и свойства окон.
///
/// Все методы синхронные и вызываются только из главной задачи.
pub trait DisplayServer: Send + Sync {
    /// Захватить клавишу с модификаторами во всех вариантах NumLock/CapsLock.
    /// Клавиша, уже захваченная другой программой, даёт `GrabConflict`.
    fn grab_key(&self, keycode: Keycode, modmask: ModMask) -> Result<()>;
    fn ungrab_key(&self, keycode: Keycode, modmask: ModMask) -> Result<()>;

    /// Захватить всю клавиатуру
    fn grab_keyboard(&self) -> Result<()>;
    fn ungrab_keyboard(&self) -> Result<()>;

    /// Дождаться обработки всех отправленных запросов
    fn sync(&self) -> Result<()>;

    /// Код клавиши по её имени на текущей клавиатуре
    fn keycode(&self, key_name: &str) -> Option<Keycode>;
    /// Биты модификатора, за который отвечает клавиша; пусто для обычных клавиш
    fn modifier_mask(&self, keycode: Keycode) -> ModMask;
    /// Клавиша физически нажата сейчас
    fn is_key_held(&self, keycode: Keycode) -> Result<bool>;
    /// Имена всех не-модификаторных клавиш клавиатуры
    fn key_names(&self) -> Vec<String>;

    fn window_list(&self) -> Result<Vec<WindowId>>;
    /// Исчезнувшее окно даёт `VanishedWindow`
    fn window_info(&self, window: WindowId) -> Result<WindowInfo>;
    fn window_name(&self, window: WindowId) -> Result<String>;
    fn set_window_name(&self, window: WindowId, name: &str) -> Result<()>;
    /// Подписаться на изменения заголовка окна
    fn listen_window_name(&self, window: WindowId) -> Result<()>;
    /// Активировать окно; `time` - время последнего события клавиатуры
    fn activate_window(&self, window: WindowId, action: DesktopAction, time: u32) -> Result<()>;
}

/// Источник событий X сервера
#[async_trait::async_trait]
pub trait EventSourceTrait {
    /// Передавать события в `tx`, пока соединение живо
    async fn run(self: Box<Self>, tx: mpsc::Sender<DisplayEvent>) -> Result<()>;
}

/// Factory function to create the display session and its event source based on the dry_run flag
pub fn create_display(
    display: Option<&str>,
    dry_run: bool,
) -> Result<(Arc<dyn DisplayServer>, Box<dyn EventSourceTrait + Send>)> {
    if dry_run {
        let display = Arc::new(super::dry_run::DryRunDisplay::with_demo_windows());
        let source = super::dry_run::DryRunEventSource::new(display.clone());
        Ok((display, Box::new(source)))
    } else {
        let display = Arc::new(super::x11::X11Display::connect(display)?);
        let source = super::x11::X11EventSource::new(display.clone());
        Ok((display, Box::new(source)))
    }
}
