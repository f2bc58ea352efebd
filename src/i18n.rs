//! UI string catalogs and the supported languages.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::Error;

static EN: Lazy<Value> = Lazy::new(|| parse_catalog("en", include_str!("../resources/locales/en.json")));
static FR: Lazy<Value> = Lazy::new(|| parse_catalog("fr", include_str!("../resources/locales/fr.json")));
static AR: Lazy<Value> = Lazy::new(|| parse_catalog("ar", include_str!("../resources/locales/ar.json")));

fn parse_catalog(code: &str, json: &str) -> Value {
    serde_json::from_str(json).unwrap_or_else(|e| {
        warn!(language = code, error = %e, "Failed to parse string catalog");
        Value::Null
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Ar,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Fr, Language::Ar];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Ar => "ar",
        }
    }

    /// Accepts `fr`, `FR` or a regional tag such as `fr-CA`.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        let base = code.split(['-', '_']).next().unwrap_or_default();
        Self::ALL.into_iter().find(|language| language.code() == base)
    }

    pub fn direction(self) -> Direction {
        match self {
            Language::Ar => Direction::Rtl,
            Language::En | Language::Fr => Direction::Ltr,
        }
    }

    pub fn label_key(self) -> String {
        format!("languages.{}", self.code())
    }

    fn catalog(self) -> &'static Value {
        match self {
            Language::En => &*EN,
            Language::Fr => &*FR,
            Language::Ar => &*AR,
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| Error::UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }

    /// Prefix that makes terminals lay a line out right to left.
    pub fn mark(self) -> &'static str {
        match self {
            Direction::Ltr => "",
            Direction::Rtl => "\u{200F}",
        }
    }
}

/// Looks up UI strings for the active language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    language: Language,
}

impl Catalog {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn direction(&self) -> Direction {
        self.language.direction()
    }

    pub fn set_language(&mut self, language: Language) {
        if language != self.language {
            debug!(
                language = %language,
                dir = language.direction().as_str(),
                "Language changed"
            );
        }
        self.language = language;
    }

    /// Resolves a dotted key such as `buttons.next`, falling back to English
    /// and finally to the key itself.
    pub fn t(&self, key: &str) -> String {
        lookup(self.language.catalog(), key)
            .or_else(|| lookup(Language::En.catalog(), key))
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// Like [`Catalog::t`], replacing `{{name}}` placeholders.
    pub fn t_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        args.iter().fold(self.t(key), |text, (name, value)| {
            text.replace(&format!("{{{{{name}}}}}"), value)
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

fn lookup<'a>(catalog: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(catalog, |node, part| node.get(part))?
        .as_str()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_catalogs_parse() {
        for language in Language::ALL {
            assert!(language.catalog().is_object(), "{language} catalog");
        }
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("fr"), Some(Language::Fr));
        assert_eq!(Language::from_code(" AR "), Some(Language::Ar));
        assert_eq!(Language::from_code("en-US"), Some(Language::En));
        assert_eq!(Language::from_code("de"), None);
        assert!(matches!(
            "xx".parse::<Language>(),
            Err(Error::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_direction() {
        assert_eq!(Language::Ar.direction(), Direction::Rtl);
        assert_eq!(Language::Fr.direction(), Direction::Ltr);
        assert_eq!(Direction::Ltr.mark(), "");
        assert_eq!(Direction::Rtl.mark(), "\u{200F}");
    }

    #[test]
    fn test_lookup() {
        let catalog = Catalog::new(Language::Fr);
        assert_eq!(catalog.t("buttons.next"), "Suivant");
        assert_eq!(catalog.t("missing.key"), "missing.key");
        assert_eq!(catalog.t("buttons"), "buttons");
        assert_eq!(
            Catalog::new(Language::En).t(&Language::Ar.label_key()),
            "العربية"
        );
    }

    #[test]
    fn test_interpolation() {
        let catalog = Catalog::new(Language::En);
        assert_eq!(
            catalog.t_with("question.progress", &[("current", "3"), ("total", "15")]),
            "Question 3 of 15"
        );
    }

    #[test]
    fn test_every_english_key_is_translated() {
        fn keys(prefix: &str, value: &Value, out: &mut Vec<String>) {
            match value {
                Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        keys(&key, v, out);
                    }
                }
                _ => out.push(prefix.to_string()),
            }
        }
        let mut english = Vec::new();
        keys("", Language::En.catalog(), &mut english);
        for language in [Language::Fr, Language::Ar] {
            for key in &english {
                assert!(
                    lookup(language.catalog(), key).is_some(),
                    "{language} is missing {key}"
                );
            }
        }
    }
}
