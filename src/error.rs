use crate::events::WindowId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XatkError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Не удалось подключиться к X серверу: {0}")]
    X11Connect(#[from] x11rb::errors::ConnectError),

    #[error("Ошибка соединения с X сервером: {0}")]
    X11Connection(#[from] x11rb::errors::ConnectionError),

    #[error("Ошибка ответа X сервера: {0}")]
    X11Reply(#[from] x11rb::errors::ReplyError),

    /// Символ клавиши не существует на этой клавиатуре (или в сочетании нет клавиш)
    #[error("Сочетание '{keybinding}': {}", describe_key(.key))]
    InvalidKey {
        keybinding: String,
        key: Option<String>,
    },

    /// Циклическое сочетание, у которого две последние клавиши совпадают
    #[error("Циклическое сочетание '{0}' недопустимо")]
    DegenerateCyclic(String),

    /// Клавиша уже захвачена другим клиентом X сервера
    #[error("Не удалось захватить {0}: клавиша уже захвачена другой программой")]
    GrabConflict(String),

    #[error("Сочетание '{binding}' конфликтует с '{existing}'")]
    Collision { binding: String, existing: String },

    #[error("Окно {0} исчезло")]
    VanishedWindow(WindowId),

    #[error("Соединение с X сервером потеряно: {0}")]
    ConnectionLost(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl XatkError {
    pub fn vanished_window<T>(window: WindowId) -> Result<T> {
        Err(XatkError::VanishedWindow(window))
    }

    /// Ошибки, после которых базовую клавишу стоит исключить и попробовать другую
    pub fn forbids_base(&self) -> bool {
        matches!(self, XatkError::GrabConflict(_) | XatkError::DegenerateCyclic(_))
    }

    /// Соединение с X сервером потеряно, продолжать работу нельзя
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            XatkError::X11Connect(_)
                | XatkError::X11Connection(_)
                | XatkError::ConnectionLost(_)
                | XatkError::X11Reply(x11rb::errors::ReplyError::ConnectionError(_))
        )
    }
}

fn describe_key(key: &Option<String>) -> String {
    match key {
        Some(key) => format!("неверное имя клавиши или модификатора: '{}'", key),
        None => "нет клавиш".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, XatkError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! xatk_error {
    (grab_conflict, $($arg:tt)*) => {
        $crate::error::XatkError::GrabConflict(format!($($arg)*))
    };
    (connection_lost, $($arg:tt)*) => {
        $crate::error::XatkError::ConnectionLost(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::XatkError::Internal(format!($($arg)*))
    };
}
