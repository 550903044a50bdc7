use crate::shortcuts::Shortcut;
use anyhow::{Context, Result};
use regex::Regex;

/// Шаблон заголовка окна: `%t` - исходный заголовок, `%s` - ярлык
#[derive(Debug, Clone)]
pub struct TitleFormat {
    start: String,
    end: String,
    // Распознаёт оформление с любым ярлыком
    pattern: Regex,
}

impl TitleFormat {
    pub fn new(format: &str) -> Result<Self> {
        let (start, end) = format
            .split_once("%t")
            .with_context(|| format!("В шаблоне заголовка нет %t: {}", format))?;

        let escape = |edge: &str| {
            edge.split("%s")
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"(?P<shortcut>\S{1,2})")
        };
        let pattern = Regex::new(&format!("^{}(?P<name>.*){}$", escape(start), escape(end)))
            .with_context(|| format!("Неверный шаблон заголовка: {}", format))?;

        Ok(Self {
            start: start.to_string(),
            end: end.to_string(),
            pattern,
        })
    }

    fn edges(&self, shortcut: &Shortcut) -> (String, String) {
        let shortcut = shortcut.to_string();
        (self.start.replace("%s", &shortcut), self.end.replace("%s", &shortcut))
    }

    pub fn decorate(&self, name: &str, shortcut: &Shortcut) -> String {
        let (start, end) = self.edges(shortcut);
        format!("{}{}{}", start, name, end)
    }

    /// Снять оформление с известным ярлыком
    pub fn strip(&self, title: &str, shortcut: &Shortcut) -> Option<String> {
        let (start, end) = self.edges(shortcut);
        if title.len() < start.len() + end.len() {
            return None;
        }
        title
            .strip_prefix(start.as_str())
            .and_then(|rest| rest.strip_suffix(end.as_str()))
            .map(str::to_string)
    }

    /// Распознать оформление с любым ярлыком, например оставшееся от прошлого запуска
    pub fn parse(&self, title: &str) -> Option<(String, Shortcut)> {
        let captures = self.pattern.captures(title)?;
        let name = captures.name("name")?.as_str().to_string();
        let shortcut = match captures.name("shortcut") {
            Some(m) => Shortcut::parse(m.as_str())?,
            None => Shortcut::none(),
        };
        Some((name, shortcut))
    }
}
