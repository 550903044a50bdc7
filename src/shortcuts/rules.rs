use crate::config::{RuleConfig, RuleProperty};
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct Rule {
    property: RuleProperty,
    regex: Regex,
    awn: String,
}

/// Правила превращения класса или заголовка окна в AWN
#[derive(Debug, Clone, Default)]
pub struct Rules {
    rules: Vec<Rule>,
}

impl Rules {
    pub fn compile(configs: &[RuleConfig]) -> Result<Self> {
        let mut rules = Vec::with_capacity(configs.len());
        for (i, config) in configs.iter().enumerate() {
            let regex = RegexBuilder::new(&config.pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Неверное регулярное выражение в правиле #{}: {}", i + 1, config.pattern))?;
            rules.push(Rule {
                property: config.property,
                regex,
                awn: config.awn.clone(),
            });
        }
        info!("Загружено правил: {}", rules.len());
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Первое правило, совпавшее с началом свойства, заменяет самое левое вхождение;
    /// без совпадений AWN равен классу окна
    pub fn awn(&self, class: &str, title: &str) -> String {
        for (i, rule) in self.rules.iter().enumerate() {
            let subject = match rule.property {
                RuleProperty::Class => class,
                RuleProperty::Title => title,
            };
            if rule.regex.find(subject).is_some_and(|m| m.start() == 0) {
                let awn = rule.regex.replacen(subject, 1, rule.awn.as_str()).into_owned();
                debug!("Правило #{} превратило '{}' в '{}'", i + 1, subject, awn);
                return awn.to_lowercase();
            }
        }
        class.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(property: RuleProperty, pattern: &str, awn: &str) -> RuleConfig {
        RuleConfig {
            property,
            pattern: pattern.to_string(),
            awn: awn.to_string(),
        }
    }

    #[test]
    fn test_no_rules_uses_class() {
        let rules = Rules::default();
        assert_eq!(rules.awn("XTerm", "bash"), "xterm");
    }

    #[test]
    fn test_class_backreference() {
        let rules = Rules::compile(&[rule(RuleProperty::Class, "gnome-(.*)", "$1")]).unwrap();
        assert_eq!(rules.awn("Gnome-terminal", "bash"), "terminal");
        // Совпадение не с начала строки не считается
        assert_eq!(rules.awn("my-gnome-terminal", "bash"), "my-gnome-terminal");
    }

    #[test]
    fn test_title_rule_and_order() {
        let rules = Rules::compile(&[
            rule(RuleProperty::Title, ".*firefox$", "firefox"),
            rule(RuleProperty::Class, "ice(cat|weasel|dove)", "$1"),
        ])
        .unwrap();

        assert_eq!(rules.awn("Navigator", "Mozilla FIREFOX"), "firefox");
        assert_eq!(rules.awn("IceWeasel", "Start page"), "weasel");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_only_first_occurrence_replaced() {
        let rules = Rules::compile(&[rule(RuleProperty::Class, "a", "b")]).unwrap();
        assert_eq!(rules.awn("aaa", ""), "baa");
    }

    #[test]
    fn test_invalid_regex() {
        assert!(Rules::compile(&[rule(RuleProperty::Class, "(", "x")]).is_err());
    }
}
