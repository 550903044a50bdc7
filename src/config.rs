use crate::mappings::{KeyNameToKeysym, ModifierAlias};
use crate::shortcuts::{LayoutKind, Rules};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub keyboard_layout: LayoutKind,
    /// Модификаторы и клавиши перед ярлыком, через '+'
    pub prefix: String,
    pub group_windows_by: GroupBy,
    /// `%t` - заголовок окна, `%s` - ярлык; "None" отключает оформление
    pub title_format: String,
    pub desktop_action: DesktopAction,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// 0 отключает историю
    pub length: usize,
    /// Относительный путь считается от каталога файла конфигурации
    pub path: PathBuf,
}

/// Как объединять окна в группы с общей базовой клавишей
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum GroupBy {
    #[default]
    #[serde(rename = "AWN")]
    Awn,
    /// Группа из WM_HINTS
    Group,
    None,
}

/// Что делать, если активируемое окно на другом рабочем столе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum DesktopAction {
    #[default]
    SwitchDesktop,
    MoveWindow,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleProperty {
    Class,
    Title,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    pub property: RuleProperty,
    /// Регулярное выражение без учёта регистра, совпадает с начала строки
    pub pattern: String,
    /// Замена, допускает `$1`
    pub awn: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            keyboard_layout: LayoutKind::Qwerty,
            prefix: "Super".to_string(),
            group_windows_by: GroupBy::Awn,
            title_format: "%t   /%s/".to_string(),
            desktop_action: DesktopAction::SwitchDesktop,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            length: 15,
            path: PathBuf::from("xatk-history.toml"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            settings: SettingsConfig::default(),
            history: HistoryConfig::default(),
            rules: Vec::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("XATK_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    /// Загрузить конфигурацию, создав файл с настройками по умолчанию, если его нет
    pub fn load_or_create<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            Self::write_default(config_path)?;
            info!("Создан файл конфигурации по умолчанию: {:?}", config_path);
        }
        Self::load(config_path)
    }

    pub fn write_default(config_path: &Path) -> Result<()> {
        if let Some(dir) = config_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Не удалось создать каталог {:?}", dir))?;
        }
        fs::write(config_path, Self::default_toml()?)
            .with_context(|| format!("Не удалось записать {:?}", config_path))
    }

    /// Конфигурация по умолчанию в виде TOML
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Не удалось сериализовать конфигурацию")
    }

    /// Символы префикса, например `["Super"]` или `["Control", "Alt", "a"]`
    pub fn prefix_symbols(&self) -> Vec<String> {
        self.settings
            .prefix
            .split('+')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Шаблон заголовка, если оформление включено
    pub fn title_format(&self) -> Option<&str> {
        match self.settings.title_format.as_str() {
            "None" => None,
            format => Some(format),
        }
    }

    pub fn history_path(&self, config_path: &Path) -> PathBuf {
        if self.history.path.is_absolute() {
            return self.history.path.clone();
        }
        match config_path.parent() {
            Some(dir) => dir.join(&self.history.path),
            None => self.history.path.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        // Префикс: модификаторы, затем (необязательно) клавиши
        let mut keys_started = false;
        for symbol in self.prefix_symbols() {
            if ModifierAlias::translate(&symbol).is_some() && !keys_started {
                continue;
            }
            keys_started = true;
            if let Err(e) = KeyNameToKeysym::translate(&symbol) {
                anyhow::bail!("Неверный префикс '{}': {}", self.settings.prefix, e);
            }
        }

        if let Some(format) = self.title_format() {
            if format.matches("%t").count() != 1 || format.matches("%s").count() > 1 {
                anyhow::bail!(
                    "title_format должен содержать ровно один %t и не больше одного %s: {}",
                    format
                );
            }
        }

        if self.history.path.as_os_str().is_empty() {
            anyhow::bail!("Путь к файлу истории не может быть пустым");
        }

        Rules::compile(&self.rules)?;

        Ok(())
    }
}
