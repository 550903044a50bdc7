use crate::error::Result;
use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// История базовых клавиш: AWN -> клавиша, от старых к новым.
///
/// Нужна, чтобы ярлыки не «переезжали» между окнами от сеанса к сеансу.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: IndexMap<String, char>,
    capacity: usize,
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    entry: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryEntry {
    awn: String,
    key: String,
}

impl History {
    /// История только в памяти
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity,
            path: None,
        }
    }

    /// Загрузить историю из файла; отсутствующий файл означает пустую историю
    pub fn load<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        let mut history = Self {
            entries: IndexMap::new(),
            capacity,
            path: Some(path.to_path_buf()),
        };

        if capacity == 0 {
            info!("История отключена (length = 0)");
            return Ok(history);
        }
        if !path.exists() {
            debug!("Файл истории {:?} не найден, начинаем с пустой истории", path);
            return Ok(history);
        }

        let content = fs::read_to_string(path)?;
        let file: HistoryFile = toml::from_str(&content)
            .with_context(|| format!("Не удалось разобрать файл истории {:?}", path))?;

        for entry in file.entry {
            let mut chars = entry.key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_lowercase() => {
                    history.entries.shift_remove(&entry.awn);
                    history.entries.insert(entry.awn, c);
                }
                _ => warn!(
                    "Клавиша в истории должна быть латинской буквой: '{}', пропущено",
                    entry.key
                ),
            }
        }
        history.truncate();

        info!("Загружена история: {}", history);
        Ok(history)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, awn: &str) -> Option<char> {
        self.entries.get(awn).copied()
    }

    /// Все базовые клавиши, запомненные в истории
    pub fn keys(&self) -> impl Iterator<Item = char> + '_ {
        self.entries.values().copied()
    }

    /// Запомнить (или освежить) базовую клавишу для AWN
    pub fn update(&mut self, awn: &str, base: char) {
        if awn.is_empty() {
            return;
        }
        self.entries.shift_remove(awn);
        self.entries.insert(awn.to_string(), base);
        self.truncate();
    }

    /// Оставить только `capacity` последних записей
    fn truncate(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    /// Атомарно записать историю на диск (временный файл + rename)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if self.capacity == 0 {
            return Ok(());
        }

        let file = HistoryFile {
            entry: self
                .entries
                .iter()
                .map(|(awn, key)| HistoryEntry {
                    awn: awn.clone(),
                    key: key.to_string(),
                })
                .collect(),
        };
        let content = toml::to_string(&file)
            .with_context(|| "Не удалось сериализовать историю")?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".xatk~");
        let temp_path = PathBuf::from(temp_name);

        let write_result = (|| -> std::io::Result<()> {
            let mut temp = fs::File::create(&temp_path)?;
            temp.write_all(content.as_bytes())?;
            temp.sync_all()?;
            fs::rename(&temp_path, path)
        })();
        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!("История записана: {}", self);
        Ok(())
    }
}

impl std::fmt::Display for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let items: Vec<String> = self
            .entries
            .iter()
            .map(|(awn, key)| format!("{}={}", awn, key))
            .collect();
        write!(f, "[{}]", items.join(", "))
    }
}
